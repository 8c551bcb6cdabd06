use std::collections::HashMap;

use crate::data::datetime::parse_timestamp;

/// How many leading rows are inspected when looking for the header.
pub const HEADER_SCAN_ROWS: usize = 50;

/// Decode raw file bytes as UTF-8, falling back to Latin-1 where every byte
/// maps to the same Unicode code point. A leading BOM is removed.
pub fn decode_text(content: Vec<u8>) -> String {
    let text = match String::from_utf8(content) {
        Ok(text) => text,
        Err(err) => err.into_bytes().iter().map(|&b| b as char).collect(),
    };
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// Detect the 0-based index of the header row among the leading rows.
///
/// Device exports often prepend metadata lines (patient name, export date)
/// before the real header. The header is the last row, scanning from the
/// top `HEADER_SCAN_ROWS`, that has the most common width and consists only
/// of non-empty, non-numeric, non-date cells. Falls back to row 0.
pub fn detect_header_row(rows: &[Vec<String>]) -> usize {
    let scanned = &rows[..rows.len().min(HEADER_SCAN_ROWS)];
    if scanned.is_empty() {
        return 0;
    }

    let mut counts: HashMap<usize, usize> = HashMap::new();
    for row in scanned {
        *counts.entry(row.len()).or_insert(0) += 1;
    }
    // Ties go to the wider row so a short preamble cannot win.
    let most_common = counts
        .into_iter()
        .max_by_key(|&(len, c)| (c, len))
        .map(|(len, _)| len)
        .unwrap_or(0);

    // Data rows may be all text ("Out of range"), so only rows above the
    // first number/date-bearing row are header candidates.
    let first_data_like = scanned
        .iter()
        .position(|row| row.len() == most_common && row.iter().any(|c| is_value_like(c)))
        .unwrap_or(scanned.len());

    (0..first_data_like)
        .rev()
        .find(|&i| is_header_like(&scanned[i], most_common))
        .unwrap_or(0)
}

fn is_header_like(row: &[String], width: usize) -> bool {
    row.len() == width
        && row.iter().any(|c| !c.trim().is_empty())
        && row.iter().all(|c| !is_value_like(c))
}

fn is_value_like(cell: &str) -> bool {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return false;
    }
    trimmed.parse::<f64>().is_ok() || is_date_like(trimmed)
}

fn is_date_like(s: &str) -> bool {
    let has_separators = s.contains('/') || s.contains(':') || s.contains('-');
    let lower = s.to_lowercase();
    let has_date_words = lower.ends_with("am") || lower.ends_with("pm");

    if !has_separators && !has_date_words {
        return false;
    }
    parse_timestamp(s, None).is_some()
}
