use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::state::series::NormalizedSeries;

pub const DEFAULT_WINDOW_DAYS: u32 = 7;
/// Longest accepted window, about ten years.
pub const MAX_WINDOW_DAYS: u32 = 3660;

/// How the trailing window is anchored on the latest sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowAlignment {
    /// Whole calendar days: midnight of the first day through the last
    /// microsecond of the latest sample's day.
    #[default]
    CalendarAligned,
    /// Exactly `days - 1` days back from the latest sample, times untouched.
    RawTrailing,
}

impl WindowAlignment {
    pub fn label(&self) -> &'static str {
        match self {
            WindowAlignment::CalendarAligned => "calendar-aligned",
            WindowAlignment::RawTrailing => "raw trailing",
        }
    }
}

/// Inclusive analysis bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl AnalysisWindow {
    /// Bounds for a window of `days` ending at `latest`. `days` is at least 1.
    /// `None` when the bounds fall outside the representable date range.
    pub fn anchored(latest: NaiveDateTime, days: u32, alignment: WindowAlignment) -> Option<Self> {
        let back = Duration::days(i64::from(days.max(1)) - 1);
        match alignment {
            WindowAlignment::CalendarAligned => {
                let midnight = latest.date().and_time(NaiveTime::default());
                Some(Self {
                    start: midnight.checked_sub_signed(back)?,
                    end: midnight
                        .checked_add_signed(Duration::days(1))?
                        .checked_sub_signed(Duration::microseconds(1))?,
                })
            }
            WindowAlignment::RawTrailing => Some(Self {
                start: latest.checked_sub_signed(back)?,
                end: latest,
            }),
        }
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.start <= ts && ts <= self.end
    }
}

/// A window together with the readings that fall inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSelection {
    pub window: AnalysisWindow,
    pub series: NormalizedSeries,
}

/// Anchor a window on the latest reading and keep the readings inside it.
/// An empty input or an empty result is `EmptyWindow`.
pub fn select_window(
    series: &NormalizedSeries,
    days: u32,
    alignment: WindowAlignment,
) -> Result<WindowSelection, ReportError> {
    let latest = series
        .last_timestamp()
        .ok_or(ReportError::EmptyWindow { window: None })?;

    let window = AnalysisWindow::anchored(latest, days, alignment).ok_or_else(|| {
        ReportError::Config(format!("a {days}-day window before {latest} is out of range"))
    })?;
    let filtered = series.between(window.start, window.end);
    if filtered.is_empty() {
        return Err(ReportError::EmptyWindow {
            window: Some(window),
        });
    }

    Ok(WindowSelection {
        window,
        series: filtered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::series::Reading;
    use chrono::NaiveDate;

    fn ts(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn series(points: &[(NaiveDateTime, f64)]) -> NormalizedSeries {
        NormalizedSeries::from_unsorted(
            points
                .iter()
                .map(|&(timestamp, glucose_mmol)| Reading { timestamp, glucose_mmol })
                .collect(),
        )
    }

    #[test]
    fn calendar_window_snaps_to_midnight() {
        let w = AnalysisWindow::anchored(ts(10, 14, 32), 7, WindowAlignment::CalendarAligned)
            .unwrap();
        assert_eq!(w.start, ts(4, 0, 0));
        assert_eq!(
            w.end,
            NaiveDate::from_ymd_opt(2024, 1, 10)
                .unwrap()
                .and_hms_micro_opt(23, 59, 59, 999_999)
                .unwrap()
        );
    }

    #[test]
    fn raw_trailing_keeps_time_of_day() {
        let w = AnalysisWindow::anchored(ts(10, 14, 32), 7, WindowAlignment::RawTrailing).unwrap();
        assert_eq!(w.start, ts(4, 14, 32));
        assert_eq!(w.end, ts(10, 14, 32));
    }

    #[test]
    fn single_day_window() {
        let w = AnalysisWindow::anchored(ts(10, 14, 32), 1, WindowAlignment::CalendarAligned)
            .unwrap();
        assert_eq!(w.start, ts(10, 0, 0));
        let w = AnalysisWindow::anchored(ts(10, 14, 32), 1, WindowAlignment::RawTrailing).unwrap();
        assert_eq!(w.start, w.end);
    }

    #[test]
    fn filter_is_a_subset_within_bounds() {
        let input = series(&[
            (ts(1, 8, 0), 4.0),
            (ts(3, 23, 59), 5.0),
            (ts(4, 0, 0), 6.0),
            (ts(7, 12, 0), 7.0),
            (ts(10, 14, 32), 8.0),
        ]);
        for alignment in [WindowAlignment::CalendarAligned, WindowAlignment::RawTrailing] {
            let sel = select_window(&input, 7, alignment).unwrap();
            for r in sel.series.readings() {
                assert!(sel.window.contains(r.timestamp));
                assert!(input.readings().contains(r));
            }
            let outside = input
                .readings()
                .iter()
                .filter(|r| !sel.window.contains(r.timestamp))
                .count();
            assert_eq!(outside + sel.series.len(), input.len());
        }

        let calendar = select_window(&input, 7, WindowAlignment::CalendarAligned).unwrap();
        assert_eq!(calendar.series.values(), vec![6.0, 7.0, 8.0]);
        let trailing = select_window(&input, 7, WindowAlignment::RawTrailing).unwrap();
        assert_eq!(trailing.series.values(), vec![7.0, 8.0]);
    }

    #[test]
    fn out_of_range_window_is_rejected_not_panicking() {
        for alignment in [WindowAlignment::CalendarAligned, WindowAlignment::RawTrailing] {
            assert_eq!(AnalysisWindow::anchored(ts(10, 14, 32), u32::MAX, alignment), None);
        }
        let max = NaiveDateTime::MAX;
        assert_eq!(AnalysisWindow::anchored(max, 1, WindowAlignment::CalendarAligned), None);

        let input = NormalizedSeries::from_unsorted(vec![Reading {
            timestamp: ts(10, 14, 32),
            glucose_mmol: 6.0,
        }]);
        let err = select_window(&input, u32::MAX, WindowAlignment::default()).unwrap_err();
        assert!(matches!(err, ReportError::Config(_)));
    }

    #[test]
    fn empty_series_is_empty_window() {
        let err = select_window(&NormalizedSeries::default(), 7, WindowAlignment::default())
            .unwrap_err();
        assert!(matches!(err, ReportError::EmptyWindow { window: None }));
    }
}
