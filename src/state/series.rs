use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Source unit to canonical unit divisor (mg/dL -> mmol/L).
pub const MGDL_PER_MMOL: f64 = 18.0;

/// One parsed input row before invalid measurements are dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementRecord {
    pub timestamp: NaiveDateTime,
    /// Measurement in mg/dL; `None` when the cell was not a finite number.
    pub raw_value: Option<f64>,
}

/// A single glucose sample in the canonical unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    pub glucose_mmol: f64,
}

/// Readings ordered by timestamp (duplicates allowed), all values finite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedSeries {
    readings: Vec<Reading>,
}

impl NormalizedSeries {
    /// Wraps readings that are already ordered.
    pub(crate) fn from_sorted(readings: Vec<Reading>) -> Self {
        debug_assert!(readings.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        debug_assert!(readings.iter().all(|r| r.glucose_mmol.is_finite()));
        Self { readings }
    }

    /// Stable-sorts by timestamp and drops non-finite values.
    #[cfg(test)]
    pub(crate) fn from_unsorted(mut readings: Vec<Reading>) -> Self {
        readings.retain(|r| r.glucose_mmol.is_finite());
        readings.sort_by_key(|r| r.timestamp);
        Self { readings }
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.readings.first().map(|r| r.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.readings.last().map(|r| r.timestamp)
    }

    pub fn values(&self) -> Vec<f64> {
        self.readings.iter().map(|r| r.glucose_mmol).collect()
    }

    /// Readings with `start <= timestamp <= end`, order preserved.
    pub fn between(&self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        let lo = self.readings.partition_point(|r| r.timestamp < start);
        let hi = self.readings.partition_point(|r| r.timestamp <= end);
        let slice: &[Reading] = if lo < hi { &self.readings[lo..hi] } else { &[] };
        Self {
            readings: slice.to_vec(),
        }
    }
}
