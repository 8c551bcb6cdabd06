use std::path::{Path, PathBuf};

use glob::glob;
use tracing::debug;

use crate::error::ReportError;

/// Patterns tried in order; CSV exports take precedence over workbooks.
const INPUT_PATTERNS: &[&str] = &["*.csv", "*.xlsx", "*.xls"];

/// Pick the input file: the explicit path when given, otherwise the first
/// matching file (sorted by name) in `dir`.
pub fn find_input(explicit: Option<&Path>, dir: &Path) -> Result<PathBuf, ReportError> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(ReportError::NoInput(format!("{} does not exist", path.display())))
        };
    }

    for pattern in INPUT_PATTERNS {
        let full = dir.join(pattern);
        let full = full.to_string_lossy();
        let mut matches: Vec<PathBuf> = glob(&full)
            .map_err(|e| ReportError::Config(format!("bad input pattern {full}: {e}")))?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();
        matches.sort();
        debug!(pattern = %full, candidates = matches.len(), "scanned for input");
        if let Some(first) = matches.into_iter().next() {
            return Ok(first);
        }
    }

    Err(ReportError::NoInput(format!(
        "no CSV or Excel file found in {}",
        dir.display()
    )))
}
