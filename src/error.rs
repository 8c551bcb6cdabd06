use std::path::PathBuf;

use thiserror::Error;

use crate::processing::window::AnalysisWindow;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("no input: {0}")]
    NoInput(String),
    #[error("required column(s) not found: {}", .missing.join(", "))]
    Schema { missing: Vec<&'static str> },
    #[error("cannot parse timestamp '{value}' (data row {row})")]
    Parse { value: String, row: usize },
    #[error("no data found for the analysis period{}", describe_period(.window))]
    EmptyWindow { window: Option<AnalysisWindow> },
    #[error("failed to load {path:?}: {reason}")]
    Load { path: PathBuf, reason: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("report rendering failed: {0}")]
    Render(String),
    #[error("failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReportError {
    /// Kinds that end the run with a message but without a failure status.
    pub fn is_non_fatal(&self) -> bool {
        matches!(self, ReportError::NoInput(_) | ReportError::EmptyWindow { .. })
    }
}

fn describe_period(window: &Option<AnalysisWindow>) -> String {
    match window {
        Some(w) => format!(" {} to {}", w.start, w.end),
        None => String::new(),
    }
}
