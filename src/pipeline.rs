use tracing::info;

use crate::config::AnalysisConfig;
use crate::data::datetime::format_timestamp;
use crate::data::loader::LoadedData;
use crate::data::normalize::{normalize, parse_records};
use crate::data::schema::resolve_columns;
use crate::error::ReportError;
use crate::processing::aggregate::{daily_stats, hourly_series, weekly_average};
use crate::processing::statistics::SeriesStats;
use crate::processing::window::select_window;
use crate::state::report_data::ReportData;

/// Run the statistics pipeline over loaded columns: bind columns, normalize,
/// select the window and aggregate.
pub fn analyze(data: &LoadedData, cfg: &AnalysisConfig) -> Result<ReportData, ReportError> {
    let binding = resolve_columns(&data.columns)?;
    info!(
        time = %binding.time_name,
        measurement = %binding.value_name,
        rows = data.row_count,
        "resolved columns"
    );

    let records = parse_records(data, &binding)?;
    let normalized = normalize(records);

    let selection = select_window(&normalized.series, cfg.window_days, cfg.alignment)?;
    let window = selection.window;
    info!(
        "Analysis Period: {} to {} ({}, {} readings)",
        format_timestamp(&window.start),
        format_timestamp(&window.end),
        cfg.alignment.label(),
        selection.series.len()
    );

    let series = selection.series;
    let values = series.values();
    let (weekly_average, summary) = weekly_average(&series)
        .zip(SeriesStats::compute(&values))
        .ok_or(ReportError::EmptyWindow {
            window: Some(window),
        })?;
    info!("Weekly Average Calculated: {weekly_average:.2} mmol/L");

    let hourly = hourly_series(&window, &series);
    let gaps = hourly.iter().filter(|p| p.is_gap()).count();
    if gaps > 0 {
        info!("{gaps} of {} hourly slots have no readings", hourly.len());
    }

    Ok(ReportData {
        window,
        alignment: cfg.alignment,
        hourly_series: hourly,
        weekly_average,
        daily_stats: daily_stats(&series),
        summary,
        removed_invalid: normalized.removed_invalid,
        raw_window_series: series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::window::WindowAlignment;
    use chrono::NaiveDate;

    fn loaded(header: &[&str], rows: &[&[&str]]) -> LoadedData {
        let header: Vec<String> = header.iter().map(|s| s.to_string()).collect();
        let rows: Vec<Vec<String>> = rows
            .iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect();
        LoadedData::from_rows(&header, &rows)
    }

    #[test]
    fn three_row_scenario() {
        let data = loaded(
            &[" Time ", "Measurement", "Notes"],
            &[
                &["2024-01-01T08:00", "90", ""],
                &["2024-01-01T09:00", "Out of range", "sensor"],
                &["2024-01-01T10:00", "180", ""],
            ],
        );
        let report = analyze(&data, &AnalysisConfig::default()).unwrap();

        assert_eq!(report.removed_invalid, 1);
        assert_eq!(report.raw_window_series.values(), vec![5.0, 10.0]);
        assert_eq!(report.weekly_average, 7.5);
        assert_eq!(report.daily_stats.len(), 1);
        let day = report.daily_stats[0];
        assert_eq!((day.min, day.max, day.mean), (5.0, 10.0, 7.5));

        let nine = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let slot = report.hourly_series.iter().find(|p| p.hour_start == nine).unwrap();
        assert!(slot.is_gap());
        assert_eq!(report.hourly_series.len(), 7 * 24);

        assert_eq!(
            report.report_file_name().unwrap(),
            "Glucose_Report_01-01-2024_to_01-01-2024.png"
        );
        assert_eq!(report.summary.count, 2);
    }

    #[test]
    fn file_name_uses_raw_reading_bounds_not_window() {
        let data = loaded(
            &["Device Timestamp", "Measurement"],
            &[
                &["2024-01-01 23:00", "100"],
                &["2024-01-06 07:15", "110"],
                &["2024-01-10 14:32", "120"],
            ],
        );
        let report = analyze(&data, &AnalysisConfig::default()).unwrap();
        assert_eq!(
            report.window.start,
            NaiveDate::from_ymd_opt(2024, 1, 4).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
        assert_eq!(
            report.report_file_name().unwrap(),
            "Glucose_Report_06-01-2024_to_10-01-2024.png"
        );
    }

    #[test]
    fn month_first_export_spanning_day_twelve_keeps_every_day() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let rows: Vec<Vec<String>> = (0..5 * 96)
            .map(|i| {
                let ts = start + chrono::Duration::minutes(15 * i);
                vec![ts.format("%m-%d-%Y %H:%M").to_string(), "108".to_string()]
            })
            .collect();
        let header = vec!["Time".to_string(), "Measurement".to_string()];
        let report = analyze(&LoadedData::from_rows(&header, &rows), &AnalysisConfig::default())
            .unwrap();

        assert_eq!(report.window.end.date(), NaiveDate::from_ymd_opt(2024, 1, 14).unwrap());
        assert_eq!(report.raw_window_series.len(), 5 * 96);
        let days: Vec<_> = report.daily_stats.iter().map(|d| d.date.to_string()).collect();
        assert_eq!(days, ["2024-01-10", "2024-01-11", "2024-01-12", "2024-01-13", "2024-01-14"]);
    }

    #[test]
    fn raw_trailing_policy_is_honoured() {
        let data = loaded(
            &["Time", "Measurement"],
            &[
                &["2024-01-04 10:00", "90"],
                &["2024-01-04 15:00", "90"],
                &["2024-01-10 14:32", "90"],
            ],
        );
        let cfg = AnalysisConfig {
            window_days: 7,
            alignment: WindowAlignment::RawTrailing,
        };
        let report = analyze(&data, &cfg).unwrap();
        assert_eq!(report.raw_window_series.len(), 2);
        assert_eq!(report.alignment, WindowAlignment::RawTrailing);
    }

    #[test]
    fn only_invalid_measurements_is_empty_window() {
        let data = loaded(
            &["Time", "Measurement"],
            &[&["2024-01-01 08:00", "Out of range"], &["2024-01-01 09:00", "LO"]],
        );
        let err = analyze(&data, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, ReportError::EmptyWindow { .. }));
        assert!(err.is_non_fatal());
    }

    #[test]
    fn header_only_input_is_empty_window() {
        let data = loaded(&["Time", "Measurement"], &[]);
        let err = analyze(&data, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, ReportError::EmptyWindow { window: None }));
    }

    #[test]
    fn missing_column_stops_before_parsing() {
        let data = loaded(&["Time", "Glucose"], &[&["garbage", "90"]]);
        let err = analyze(&data, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, ReportError::Schema { .. }));
        assert!(!err.is_non_fatal());
    }
}
