use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::processing::statistics::{mean, SeriesStats};
use crate::processing::window::AnalysisWindow;
use crate::state::series::NormalizedSeries;

/// Mean glucose for one clock hour. `mean_mmol` is `None` for an hour with
/// no samples so the trend line breaks instead of dropping to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourlyPoint {
    pub hour_start: NaiveDateTime,
    pub mean_mmol: Option<f64>,
}

impl HourlyPoint {
    pub fn is_gap(&self) -> bool {
        self.mean_mmol.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyStat {
    pub date: NaiveDate,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Truncate to the start of the hour.
pub fn floor_hour(ts: NaiveDateTime) -> NaiveDateTime {
    ts.date().and_time(chrono::NaiveTime::default()) + Duration::hours(i64::from(ts.hour()))
}

/// Hour slots covering the window: from the hour containing `start` up to
/// and including the hour containing `end`.
pub fn hour_slots(window: &AnalysisWindow) -> Vec<NaiveDateTime> {
    let first = floor_hour(window.start);
    let last = floor_hour(window.end);
    let n = (last - first).num_hours().max(0) as usize + 1;
    (0..n).map(|i| first + Duration::hours(i as i64)).collect()
}

/// Hourly means over the whole window, one point per slot, gaps kept.
/// Samples outside the window are ignored.
pub fn hourly_series(window: &AnalysisWindow, series: &NormalizedSeries) -> Vec<HourlyPoint> {
    let slots = hour_slots(window);
    let Some(&first) = slots.first() else {
        return Vec::new();
    };

    let mut sums = vec![0.0f64; slots.len()];
    let mut counts = vec![0usize; slots.len()];
    for r in series.readings().iter().filter(|r| window.contains(r.timestamp)) {
        let idx = (floor_hour(r.timestamp) - first).num_hours();
        if let Ok(idx) = usize::try_from(idx) {
            if idx < slots.len() {
                sums[idx] += r.glucose_mmol;
                counts[idx] += 1;
            }
        }
    }

    slots
        .into_iter()
        .zip(sums.into_iter().zip(counts))
        .map(|(hour_start, (sum, count))| HourlyPoint {
            hour_start,
            mean_mmol: (count > 0).then(|| sum / count as f64),
        })
        .collect()
}

/// Mean of every raw reading in the window.
pub fn weekly_average(series: &NormalizedSeries) -> Option<f64> {
    mean(&series.values())
}

/// Per-date min/max/mean for each date with at least one reading, ascending.
pub fn daily_stats(series: &NormalizedSeries) -> Vec<DailyStat> {
    let mut by_date: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for r in series.readings() {
        by_date.entry(r.timestamp.date()).or_default().push(r.glucose_mmol);
    }

    by_date
        .into_iter()
        .filter_map(|(date, values)| {
            SeriesStats::compute(&values).map(|s| DailyStat {
                date,
                count: s.count,
                min: s.min,
                max: s.max,
                mean: s.mean,
            })
        })
        .collect()
}
