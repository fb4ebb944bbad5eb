//! Tabular data loading
//!
//! A `Dataset` is parsed once from uploaded CSV bytes and then shared read-only
//! by the session. Cells are kept as text; numeric views are produced on demand
//! for the estimator.

use serde::Serialize;
use std::collections::HashMap;
use std::io::Read;

/// Default number of rows shown in a preview (matches a `head()` call).
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Errors that can occur while loading or reading a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetError {
    /// No header row was found
    Empty,
    /// CSV content could not be parsed
    Parse(String),
    /// Underlying reader failed
    Io(String),
    /// Column name not present in the header
    ColumnNotFound(String),
    /// A cell could not be interpreted as a number
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },
    /// A cell was empty
    MissingValue { column: String, row: usize },
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::Empty => write!(f, "No columns to parse from file"),
            DatasetError::Parse(msg) => write!(f, "CSV parse error: {}", msg),
            DatasetError::Io(msg) => write!(f, "I/O error: {}", msg),
            DatasetError::ColumnNotFound(name) => write!(f, "Column not found: {}", name),
            DatasetError::NonNumeric { column, row, value } => write!(
                f,
                "Column '{}' row {} is not numeric: '{}'",
                column, row, value
            ),
            DatasetError::MissingValue { column, row } => {
                write!(f, "Column '{}' row {} is missing a value", column, row)
            }
        }
    }
}

impl std::error::Error for DatasetError {}

impl From<csv::Error> for DatasetError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            DatasetError::Io(err.to_string())
        } else {
            DatasetError::Parse(err.to_string())
        }
    }
}

/// In-memory table with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// First rows of a dataset, ready to be serialized for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetPreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Total number of rows in the dataset (not just the preview)
    pub row_count: usize,
}

impl Dataset {
    /// Parses CSV content with a header row.
    ///
    /// Every record must have as many fields as the header; ragged input is a
    /// parse error. Repeated header names are suffixed `.1`, `.2`, ... so that
    /// column lookups stay unambiguous.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(DatasetError::Empty);
        }
        let columns = dedup_column_names(headers.iter().map(|h| h.trim().to_string()));

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        log::info!(
            "Loaded dataset with {} columns and {} rows",
            columns.len(),
            rows.len()
        );

        Ok(Dataset { columns, rows })
    }

    /// Parses CSV content held in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DatasetError> {
        Self::from_reader(bytes)
    }

    /// Column names in file order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns the first `n` rows.
    pub fn preview(&self, n: usize) -> DatasetPreview {
        DatasetPreview {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
            row_count: self.rows.len(),
        }
    }

    /// Reads a column as floating point values.
    ///
    /// Boolean literals map to 1.0 / 0.0 so binary treatments can be used
    /// directly. Rows are reported 0-indexed, excluding the header.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>, DatasetError> {
        let index = self
            .column_index(name)
            .ok_or_else(|| DatasetError::ColumnNotFound(name.to_string()))?;

        self.rows
            .iter()
            .enumerate()
            .map(|(row, record)| {
                let raw = record[index].trim();
                if raw.is_empty() {
                    return Err(DatasetError::MissingValue {
                        column: name.to_string(),
                        row,
                    });
                }
                parse_cell(raw).ok_or_else(|| DatasetError::NonNumeric {
                    column: name.to_string(),
                    row,
                    value: raw.to_string(),
                })
            })
            .collect()
    }
}

fn parse_cell(raw: &str) -> Option<f64> {
    match raw {
        "true" | "True" | "TRUE" => Some(1.0),
        "false" | "False" | "FALSE" => Some(0.0),
        _ => raw.parse::<f64>().ok().filter(|v| !v.is_nan()),
    }
}

fn dedup_column_names<I: Iterator<Item = String>>(names: I) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut columns: Vec<String> = Vec::new();

    for name in names {
        let mut candidate = name.clone();
        while columns.contains(&candidate) {
            let counter = seen.entry(name.clone()).or_insert(0);
            *counter += 1;
            candidate = format!("{}.{}", name, counter);
        }
        columns.push(candidate);
    }

    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "A,B,C\n1,2,3\n4,5,6\n7,8,9\n";

    #[test]
    fn test_load_columns_and_rows() {
        let data = Dataset::from_bytes(SAMPLE.as_bytes()).unwrap();
        assert_eq!(data.columns(), &["A", "B", "C"]);
        assert_eq!(data.row_count(), 3);
    }

    #[test]
    fn test_header_whitespace_trimmed() {
        let data = Dataset::from_bytes(b" x , y\n1,2\n").unwrap();
        assert_eq!(data.columns(), &["x", "y"]);
    }

    #[test]
    fn test_ragged_rows_are_parse_errors() {
        let result = Dataset::from_bytes(b"A,B\n1,2\n3\n");
        assert!(matches!(result, Err(DatasetError::Parse(_))));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(Dataset::from_bytes(b"").unwrap_err(), DatasetError::Empty);
    }

    #[test]
    fn test_duplicate_headers_are_suffixed() {
        let data = Dataset::from_bytes(b"A,A,B,A\n1,2,3,4\n").unwrap();
        assert_eq!(data.columns(), &["A", "A.1", "B", "A.2"]);
    }

    #[test]
    fn test_preview_limits_rows() {
        let data = Dataset::from_bytes(SAMPLE.as_bytes()).unwrap();
        let preview = data.preview(2);
        assert_eq!(preview.rows.len(), 2);
        assert_eq!(preview.row_count, 3);
        assert_eq!(preview.rows[1], vec!["4", "5", "6"]);
    }

    #[test]
    fn test_numeric_column() {
        let data = Dataset::from_bytes(SAMPLE.as_bytes()).unwrap();
        assert_eq!(data.numeric_column("B").unwrap(), vec![2.0, 5.0, 8.0]);
    }

    #[test]
    fn test_numeric_column_booleans() {
        let data = Dataset::from_bytes(b"t,y\nTrue,1.5\nfalse,2\n").unwrap();
        assert_eq!(data.numeric_column("t").unwrap(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_numeric_column_errors() {
        let data = Dataset::from_bytes(b"a,b\nx,1\n2,\n").unwrap();

        assert_eq!(
            data.numeric_column("a").unwrap_err(),
            DatasetError::NonNumeric {
                column: "a".to_string(),
                row: 0,
                value: "x".to_string(),
            }
        );
        assert_eq!(
            data.numeric_column("b").unwrap_err(),
            DatasetError::MissingValue {
                column: "b".to_string(),
                row: 1,
            }
        );
        assert_eq!(
            data.numeric_column("zzz").unwrap_err(),
            DatasetError::ColumnNotFound("zzz".to_string())
        );
    }
}
