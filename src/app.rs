use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::ReportConfig;
use crate::data::datetime::format_timestamp;
use crate::data::{discovery, loader};
use crate::error::ReportError;
use crate::pipeline;
use crate::render::report::render_report;
use crate::state::report_data::ReportData;

/// What one run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub input: PathBuf,
    pub report: ReportData,
    /// `None` when rendering is disabled.
    pub image: Option<PathBuf>,
}

/// One batch run: find the input, compute the statistics, write outputs.
pub struct ReportApp {
    pub config: ReportConfig,
}

impl ReportApp {
    pub fn new(config: ReportConfig) -> Result<Self, ReportError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn run(&self) -> Result<RunOutcome, ReportError> {
        let input = discovery::find_input(self.config.input.as_deref(), &self.config.input_dir)?;
        info!("--> Processing file: {}", input.display());

        let loaded = loader::load_file(&input)?;
        let report = pipeline::analyze(&loaded, &self.config.analysis)?;
        info!("\n{}", report.summary.report("Window summary (mmol/L)"));

        if let Some(path) = &self.config.summary_json {
            report.write_json(path)?;
            info!("Summary written to {}", path.display());
        }
        if let Some(path) = &self.config.hourly_csv {
            export_hourly_csv(&report, path)?;
            info!("Hourly series written to {}", path.display());
        }

        let image = if self.config.render {
            Some(self.render(&report)?)
        } else {
            None
        };

        Ok(RunOutcome {
            input,
            report,
            image,
        })
    }

    fn render(&self, report: &ReportData) -> Result<PathBuf, ReportError> {
        let name = report
            .report_file_name()
            .ok_or(ReportError::EmptyWindow {
                window: Some(report.window),
            })?;
        let path = self.config.output_dir.join(name);
        std::fs::create_dir_all(&self.config.output_dir).map_err(|source| ReportError::Io {
            path: self.config.output_dir.clone(),
            source,
        })?;

        match render_report(report, &self.config.style, &path) {
            Ok(()) => {
                info!(
                    theme = self.config.style.theme.label(),
                    "--> Report generated successfully: {}",
                    path.display()
                );
                Ok(path)
            }
            Err(err) => {
                warn!(
                    "statistics for {} to {} were computed but the image could not be drawn",
                    format_timestamp(&report.window.start),
                    format_timestamp(&report.window.end)
                );
                Err(err)
            }
        }
    }
}

/// Write the hourly series as `hour_start,mean_mmol`, leaving gaps empty.
pub fn export_hourly_csv(report: &ReportData, path: &Path) -> Result<(), ReportError> {
    let io_error = |source: std::io::Error| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(|e| io_error(e.into()))?;
    writer
        .write_record(["hour_start", "mean_mmol"])
        .map_err(|e| io_error(e.into()))?;
    for point in &report.hourly_series {
        let value = point
            .mean_mmol
            .map(|v| format!("{v:.3}"))
            .unwrap_or_default();
        writer
            .write_record([point.hour_start.format("%Y-%m-%d %H:%M:%S").to_string(), value])
            .map_err(|e| io_error(e.into()))?;
    }
    writer.flush().map_err(io_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;
    use std::fs;

    const SAMPLE: &str = "\
Glucose export,,
Device,Device Timestamp,Measurement
Sensor,2024-01-01 08:00,90
Sensor,2024-01-01 09:00,Out of range
Sensor,2024-01-01 10:00,180
";

    fn config_in(dir: &Path) -> ReportConfig {
        ReportConfig {
            input_dir: dir.to_path_buf(),
            output_dir: dir.join("out"),
            render: false,
            ..ReportConfig::default()
        }
    }

    #[test]
    fn end_to_end_without_rendering() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("export.csv"), SAMPLE).unwrap();
        let summary = dir.path().join("summary.json");
        let hourly = dir.path().join("hourly.csv");

        let mut cfg = config_in(dir.path());
        cfg.summary_json = Some(summary.clone());
        cfg.hourly_csv = Some(hourly.clone());
        let outcome = ReportApp::new(cfg).unwrap().run().unwrap();

        assert_eq!(outcome.input.file_name().unwrap(), "export.csv");
        assert!(outcome.image.is_none());
        assert_eq!(outcome.report.removed_invalid, 1);
        assert_eq!(outcome.report.weekly_average, 7.5);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(summary).unwrap()).unwrap();
        assert_eq!(json["weekly_average"], 7.5);
        assert_eq!(json["daily_stats"][0]["date"], "2024-01-01");
        assert_eq!(json["raw_window_series"].as_array().unwrap().len(), 2);

        let csv_text = fs::read_to_string(hourly).unwrap();
        assert!(csv_text.starts_with("hour_start,mean_mmol\n"));
        assert!(csv_text.contains("2024-01-01 08:00:00,5.000\n"));
        assert!(csv_text.contains("2024-01-01 09:00:00,\n"));
        assert_eq!(csv_text.lines().count(), 1 + 7 * 24);
    }

    #[test]
    fn empty_directory_reports_no_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReportApp::new(config_in(dir.path())).unwrap().run().unwrap_err();
        assert!(matches!(err, ReportError::NoInput(_)));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn empty_file_produces_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("empty.csv"), "").unwrap();
        let mut cfg = config_in(dir.path());
        cfg.render = true;
        let err = ReportApp::new(cfg).unwrap().run().unwrap_err();
        assert!(err.is_non_fatal());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let mut cfg = ReportConfig::default();
        cfg.analysis.window_days = 0;
        assert!(matches!(ReportApp::new(cfg), Err(ReportError::Config(_))));
    }

    #[test]
    fn renders_png_named_after_reading_span() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("export.csv"), SAMPLE).unwrap();
        let mut cfg = config_in(dir.path());
        cfg.render = true;
        cfg.style.width = 900;
        cfg.style.height = 900;

        match ReportApp::new(cfg).unwrap().run() {
            Ok(outcome) => {
                let png = outcome.image.unwrap();
                assert_eq!(
                    png.file_name().unwrap(),
                    "Glucose_Report_01-01-2024_to_01-01-2024.png"
                );
                let decoded = image::open(&png).unwrap();
                assert_eq!(decoded.dimensions(), (900, 900));
            }
            // Headless machines without system fonts cannot draw text.
            Err(ReportError::Render(msg)) => eprintln!("skipping render check: {msg}"),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}
