use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Sentinel value returned by `detect_date_format` when the column contains
/// RFC 3339 / ISO 8601 timestamps with an offset (e.g. `2024-01-10T14:32:00+01:00`).
pub const RFC3339_FORMAT: &str = "__rfc3339__";

/// Layouts that carry a UTC offset. The offset is parsed and then discarded.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

/// Naive layouts, most specific first. Where day and month order are
/// ambiguous the month-first layout is listed first and wins ties.
pub const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m-%d-%Y %H:%M:%S",
    "%m-%d-%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%d/%m/%Y %I:%M %p",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
];

/// How many leading non-empty values are scored before the whole column is
/// checked against the winner.
const DETECTION_SAMPLE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldOrder {
    MonthFirst,
    DayFirst,
}

/// Day/month order of a layout that leads with one of them. Year-first and
/// offset layouts are unambiguous and return `None`.
fn field_order(format: &str) -> Option<FieldOrder> {
    if format.starts_with("%Y") || format == RFC3339_FORMAT {
        return None;
    }
    match (format.find("%m"), format.find("%d")) {
        (Some(m), Some(d)) if m < d => Some(FieldOrder::MonthFirst),
        (Some(_), Some(_)) => Some(FieldOrder::DayFirst),
        _ => None,
    }
}

/// A fallback layout may not swap day and month relative to the column format.
fn compatible(preferred: Option<&str>, candidate: &str) -> bool {
    match (preferred.and_then(field_order), field_order(candidate)) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

fn best_format(sample: &[&str]) -> Option<&'static str> {
    if sample.is_empty() {
        return None;
    }

    let offset_valid = sample
        .iter()
        .filter(|s| parse_with_offset(s).is_some())
        .count();
    let mut best_score = offset_valid as f64 / sample.len() as f64;
    let mut best_format = (offset_valid > 0).then_some(RFC3339_FORMAT);

    for &fmt in DATE_FORMATS {
        let valid = sample
            .iter()
            .filter(|s| parse_naive(s, fmt).is_some())
            .count();

        let score = valid as f64 / sample.len() as f64;
        if score > best_score {
            best_score = score;
            best_format = Some(fmt);
        }
    }

    best_format
}

/// Detect the most likely date format of a column.
///
/// The first 100 non-empty values are scored against every layout. If the
/// winner then fails on a later value (an ambiguous day/month sample that
/// turns out to be the other order), the whole column is scored instead, so
/// a single column is never read with both orders.
pub fn detect_date_format(values: &[String]) -> Option<&'static str> {
    let column: Vec<&str> = values
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    let sampled = best_format(&column[..column.len().min(DETECTION_SAMPLE)])?;
    if column.len() <= DETECTION_SAMPLE
        || column.iter().all(|v| parse_timestamp(v, Some(sampled)).is_some())
    {
        return Some(sampled);
    }
    best_format(&column)
}

/// Parse a value with the detected column format, falling back to the other
/// supported layouts that keep the same day/month order, so mixed columns
/// still resolve.
pub fn parse_timestamp(value: &str, preferred: Option<&str>) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let preferred_hit = match preferred {
        Some(RFC3339_FORMAT) => parse_with_offset(value),
        Some(fmt) => parse_naive(value, fmt),
        None => None,
    };

    preferred_hit
        .or_else(|| parse_with_offset(value))
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .copied()
                .filter(|&fmt| compatible(preferred, fmt))
                .find_map(|fmt| parse_naive(value, fmt))
        })
}

/// Offset-bearing timestamps keep their wall-clock reading; the offset is
/// dropped rather than applied.
fn parse_with_offset(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.naive_local())
}

fn parse_naive(value: &str, format: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
        Some(dt)
    } else if let Ok(d) = NaiveDate::parse_from_str(value, format) {
        d.and_hms_opt(0, 0, 0)
    } else {
        None
    }
}

/// Format a timestamp for diagnostics, showing microseconds only when present.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    if ts.and_utc().timestamp_subsec_micros() == 0 {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}
