use crate::error::ReportError;

pub const TIME_PATTERN: &str = "Time";
pub const MEASUREMENT_PATTERN: &str = "Measurement";

/// Which loaded columns carry the timestamp and the glucose measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnBinding {
    pub time_idx: usize,
    pub value_idx: usize,
    pub time_name: String,
    pub value_name: String,
}

/// Bind the timestamp and measurement columns by substring match on the
/// trimmed column names. Matching is case-sensitive and the first match wins.
pub fn resolve_columns(columns: &[String]) -> Result<ColumnBinding, ReportError> {
    let trimmed: Vec<&str> = columns.iter().map(|c| c.trim()).collect();

    let time_idx = trimmed.iter().position(|c| c.contains(TIME_PATTERN));
    let value_idx = trimmed.iter().position(|c| c.contains(MEASUREMENT_PATTERN));

    match (time_idx, value_idx) {
        (Some(time_idx), Some(value_idx)) => Ok(ColumnBinding {
            time_idx,
            value_idx,
            time_name: trimmed[time_idx].to_string(),
            value_name: trimmed[value_idx].to_string(),
        }),
        (time_idx, value_idx) => {
            let mut missing = Vec::new();
            if time_idx.is_none() {
                missing.push(TIME_PATTERN);
            }
            if value_idx.is_none() {
                missing.push(MEASUREMENT_PATTERN);
            }
            Err(ReportError::Schema { missing })
        }
    }
}
