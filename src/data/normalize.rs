use tracing::{debug, warn};

use crate::data::datetime::{detect_date_format, parse_timestamp};
use crate::data::loader::{column_to_f64, LoadedData};
use crate::data::schema::ColumnBinding;
use crate::error::ReportError;
use crate::state::series::{MeasurementRecord, NormalizedSeries, Reading, MGDL_PER_MMOL};

/// Output of the normalizer: the clean series plus how many rows were
/// dropped for carrying an invalid measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub series: NormalizedSeries,
    pub removed_invalid: usize,
}

/// Parse the bound columns into records.
///
/// Every timestamp must parse; the first one that does not aborts with its
/// value and 1-based data row. Measurements never abort: unusable cells
/// become `raw_value: None`.
pub fn parse_records(
    data: &LoadedData,
    binding: &ColumnBinding,
) -> Result<Vec<MeasurementRecord>, ReportError> {
    let times = data.column(binding.time_idx);
    let values = column_to_f64(data.column(binding.value_idx));

    let format = detect_date_format(times);
    debug!(column = %binding.time_name, ?format, "detected timestamp format");

    times
        .iter()
        .zip(values)
        .enumerate()
        .map(|(row, (raw_time, raw_value))| -> Result<MeasurementRecord, ReportError> {
            let timestamp = parse_timestamp(raw_time, format).ok_or_else(|| ReportError::Parse {
                value: raw_time.clone(),
                row: row + 1,
            })?;
            Ok(MeasurementRecord {
                timestamp,
                raw_value,
            })
        })
        .collect()
}

/// Sort, drop invalid measurements and convert mg/dL to mmol/L.
pub fn normalize(mut records: Vec<MeasurementRecord>) -> Normalized {
    // Stable: equal timestamps keep input order.
    records.sort_by_key(|r| r.timestamp);

    let (valid, removed_invalid) = drop_invalid(records);
    if removed_invalid > 0 {
        warn!("removed {removed_invalid} invalid measurement(s) (e.g., 'Out of range')");
    }

    let readings = valid
        .into_iter()
        .map(|(timestamp, value)| Reading {
            timestamp,
            glucose_mmol: value / MGDL_PER_MMOL,
        })
        .collect();

    Normalized {
        series: NormalizedSeries::from_sorted(readings),
        removed_invalid,
    }
}

/// Keep records with a finite measurement, returning them alongside the
/// number removed. Applying this to its own output removes nothing.
pub fn drop_invalid(
    records: impl IntoIterator<Item = MeasurementRecord>,
) -> (Vec<(chrono::NaiveDateTime, f64)>, usize) {
    let mut removed = 0usize;
    let valid = records
        .into_iter()
        .filter_map(|r| match r.raw_value.filter(|v| v.is_finite()) {
            Some(v) => Some((r.timestamp, v)),
            None => {
                removed += 1;
                None
            }
        })
        .collect();
    (valid, removed)
}
