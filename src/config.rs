use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::processing::window::{WindowAlignment, DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS};
use crate::state::theme::ReportStyle;

/// Parameters of the statistics pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub window_days: u32,
    pub alignment: WindowAlignment,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            alignment: WindowAlignment::default(),
        }
    }
}

/// Full run configuration. Loaded from JSON when a config file is given,
/// then overridden field by field from the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub input: Option<PathBuf>,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub analysis: AnalysisConfig,
    pub style: ReportStyle,
    pub render: bool,
    pub summary_json: Option<PathBuf>,
    pub hourly_csv: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            input: None,
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            analysis: AnalysisConfig::default(),
            style: ReportStyle::default(),
            render: true,
            summary_json: None,
            hourly_csv: None,
        }
    }
}

impl ReportConfig {
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ReportError::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| ReportError::Config(format!("cannot parse {}: {e}", path.display())))
    }

    pub fn validate(&self) -> Result<(), ReportError> {
        let days = self.analysis.window_days;
        if days == 0 {
            return Err(ReportError::Config(
                "window length must be at least 1 day".to_string(),
            ));
        }
        if days > MAX_WINDOW_DAYS {
            return Err(ReportError::Config(format!(
                "window length of {days} days exceeds the {MAX_WINDOW_DAYS}-day maximum"
            )));
        }
        self.style.validate().map_err(ReportError::Config)
    }
}
