use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::processing::aggregate::{DailyStat, HourlyPoint};
use crate::processing::statistics::SeriesStats;
use crate::processing::window::{AnalysisWindow, WindowAlignment};
use crate::state::series::NormalizedSeries;

pub const REPORT_PREFIX: &str = "Glucose_Report";

/// Everything the renderer and exporters consume from one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    pub window: AnalysisWindow,
    pub alignment: WindowAlignment,
    pub hourly_series: Vec<HourlyPoint>,
    pub weekly_average: f64,
    pub daily_stats: Vec<DailyStat>,
    pub summary: SeriesStats,
    pub removed_invalid: usize,
    pub raw_window_series: NormalizedSeries,
}

impl ReportData {
    /// Earliest raw reading in the window.
    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.raw_window_series.first_timestamp()
    }

    /// Latest raw reading in the window.
    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.raw_window_series.last_timestamp()
    }

    /// `Glucose_Report_<dd-mm-yyyy>_to_<dd-mm-yyyy>.png`, named after the
    /// actual first and last readings rather than the window bounds.
    pub fn report_file_name(&self) -> Option<String> {
        let first = self.first_timestamp()?;
        let last = self.last_timestamp()?;
        Some(format!(
            "{REPORT_PREFIX}_{}_to_{}.png",
            first.format("%d-%m-%Y"),
            last.format("%d-%m-%Y")
        ))
    }

    /// Write the whole contract as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        let io_error = |source: std::io::Error| ReportError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(io_error)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|e| io_error(e.into()))?;
        writer.flush().map_err(io_error)
    }
}
