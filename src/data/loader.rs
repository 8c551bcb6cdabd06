use std::path::Path;

use tracing::debug;

use crate::data::parser;
use crate::error::ReportError;

/// Result of loading a data file: column names and column data as strings
#[derive(Debug, Clone, Default)]
pub struct LoadedData {
    pub columns: Vec<String>,
    pub column_data: Vec<Vec<String>>, // column-major: column_data[col_idx][row_idx]
    pub row_count: usize,
}

impl LoadedData {
    /// Build column-major data from a header row and the rows below it.
    /// Short rows are padded with empty cells; extra cells are ignored.
    pub fn from_rows(header: &[String], data_rows: &[Vec<String>]) -> Self {
        let columns: Vec<String> = header.to_vec();
        let num_cols = columns.len();
        let mut column_data: Vec<Vec<String>> = vec![Vec::with_capacity(data_rows.len()); num_cols];

        for row in data_rows {
            for (col_idx, col_data) in column_data.iter_mut().enumerate() {
                col_data.push(row.get(col_idx).cloned().unwrap_or_default());
            }
        }

        Self {
            columns,
            column_data,
            row_count: data_rows.len(),
        }
    }

    pub fn column(&self, idx: usize) -> &[String] {
        self.column_data.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Load a CSV or Excel file and return the column names and raw string data.
///
/// The file is read in one call and released before parsing starts. An empty
/// file is reported as missing input rather than a load failure.
pub fn load_file(path: &Path) -> Result<LoadedData, ReportError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let rows = match ext.as_str() {
        "csv" | "txt" => read_csv_rows(path)?,
        "xls" | "xlsx" | "xlsm" | "ods" => read_excel_rows(path)?,
        _ => {
            return Err(load_error(path, format!("unsupported file format: .{ext}")));
        }
    };

    if rows.is_empty() {
        return Err(ReportError::NoInput(format!("{} is empty", path.display())));
    }

    let header_row = parser::detect_header_row(&rows);
    debug!(header_row, total_rows = rows.len(), "detected header row");

    Ok(LoadedData::from_rows(&rows[header_row], &rows[header_row + 1..]))
}

/// Parse CSV text into raw rows. Blank lines are skipped; malformed records
/// are skipped rather than aborting the load.
pub fn parse_csv_text(text: &str) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut all_rows: Vec<Vec<String>> = Vec::new();
    for result in reader.records() {
        match result {
            Ok(record) => {
                let row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
                if row.iter().any(|c| !c.trim().is_empty()) {
                    all_rows.push(row);
                }
            }
            Err(err) => debug!("skipping malformed CSV record: {err}"),
        }
    }
    all_rows
}

fn read_csv_rows(path: &Path) -> Result<Vec<Vec<String>>, ReportError> {
    let content =
        std::fs::read(path).map_err(|e| load_error(path, format!("cannot read file: {e}")))?;
    Ok(parse_csv_text(&parser::decode_text(content)))
}

fn read_excel_rows(path: &Path) -> Result<Vec<Vec<String>>, ReportError> {
    use calamine::{open_workbook_auto, Data, Reader};

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| load_error(path, format!("cannot open workbook: {e}")))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| load_error(path, "no sheets found".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| load_error(path, format!("cannot read sheet '{sheet_name}': {e}")))?;

    let rows = range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::Empty => String::new(),
                    Data::String(s) => s.clone(),
                    Data::Float(f) => f.to_string(),
                    Data::Int(i) => i.to_string(),
                    Data::Bool(b) => b.to_string(),
                    Data::DateTime(dt) => dt
                        .as_datetime()
                        .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| dt.to_string()),
                    Data::DateTimeIso(s) => s.clone(),
                    Data::DurationIso(s) => s.clone(),
                    Data::Error(e) => format!("{e:?}"),
                })
                .collect::<Vec<String>>()
        })
        .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
        .collect();

    Ok(rows)
}

fn load_error(path: &Path, reason: String) -> ReportError {
    ReportError::Load {
        path: path.to_path_buf(),
        reason,
    }
}

/// Coerce a measurement column to numbers. Cells that are not finite
/// numbers (sentinels like "Out of range", blanks, NaN) become `None`.
pub fn column_to_f64(data: &[String]) -> Vec<Option<f64>> {
    data.iter()
        .map(|s| s.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_csv_into_columns() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "Device,Time ,Measurement").unwrap();
        writeln!(file, "A,2024-01-01 08:00,90").unwrap();
        writeln!(file, "A,2024-01-01 09:00,Out of range").unwrap();
        writeln!(file, "A,2024-01-01 10:00").unwrap();

        let loaded = load_file(file.path()).unwrap();
        assert_eq!(loaded.columns, vec!["Device", "Time ", "Measurement"]);
        assert_eq!(loaded.row_count, 3);
        assert_eq!(loaded.column(2), &["90", "Out of range", ""]);
        assert!(loaded.column(7).is_empty());
    }

    #[test]
    fn empty_file_is_no_input() {
        let file = NamedTempFile::with_suffix(".csv").unwrap();
        let err = load_file(file.path()).unwrap_err();
        assert!(matches!(err, ReportError::NoInput(_)));
    }

    #[test]
    fn header_only_file_loads_zero_rows() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "Time,Measurement").unwrap();
        let loaded = load_file(file.path()).unwrap();
        assert_eq!(loaded.row_count, 0);
        assert_eq!(loaded.column_data.len(), 2);
    }

    #[test]
    fn loads_workbook_with_date_cells() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/glucose_export.xlsx");
        let loaded = load_file(&path).unwrap();

        assert_eq!(loaded.columns, vec!["Device", "Device Timestamp", "Measurement"]);
        assert_eq!(loaded.row_count, 3);
        assert_eq!(
            loaded.column(1),
            &["2024-01-10 06:00:00", "2024-01-10 12:00:00", "2024-01-11 18:00:00"]
        );
        assert_eq!(column_to_f64(loaded.column(2)), vec![Some(90.0), None, Some(180.0)]);
    }

    #[test]
    fn unsupported_extension_is_load_error() {
        let file = NamedTempFile::with_suffix(".json").unwrap();
        let err = load_file(file.path()).unwrap_err();
        assert!(matches!(err, ReportError::Load { .. }));
    }

    #[test]
    fn coercion_marks_sentinels_invalid() {
        let data: Vec<String> = ["90", " 180.5 ", "Out of range", "", "NaN", "inf"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            column_to_f64(&data),
            vec![Some(90.0), Some(180.5), None, None, None, None]
        );
    }
}
