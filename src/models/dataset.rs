//! Uploaded tabular datasets
//!
//! Cells are kept as raw strings until a pipeline asks for a numeric
//! matrix, the same way a CSV reader hands back untyped records.

use serde::Serialize;
use thiserror::Error;

/// Name of the training target column
pub const LABEL_COLUMN: &str = "label";

#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    #[error("failed to parse CSV: {0}")]
    Parse(String),

    #[error("dataset has no header row")]
    MissingHeader,

    #[error("dataset has no data rows")]
    Empty,

    #[error("dataset must contain a 'label' column")]
    MissingLabelColumn,

    #[error("missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("non-numeric value '{value}' in column '{column}' at row {row}")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("label '{value}' at row {row} is not an integer class")]
    InvalidLabel { row: usize, value: String },
}

impl From<csv::Error> for DatasetError {
    fn from(err: csv::Error) -> Self {
        DatasetError::Parse(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// First rows of a dataset for display
#[derive(Debug, Clone, Serialize)]
pub struct DatasetPreview {
    pub rows: usize,
    pub columns: Vec<String>,
    pub preview: Vec<Vec<String>>,
}

impl Dataset {
    /// Parse a comma-delimited file with a header row
    pub fn from_csv_bytes(data: &[u8]) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Fields)
            .from_reader(data);

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if columns.iter().all(|c| c.is_empty()) {
            return Err(DatasetError::MissingHeader);
        }

        let rows = reader
            .records()
            .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()?;

        if rows.is_empty() {
            return Err(DatasetError::Empty);
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Reject datasets that cannot be trained on
    pub fn require_label(&self) -> Result<(), DatasetError> {
        if self.has_column(LABEL_COLUMN) {
            Ok(())
        } else {
            Err(DatasetError::MissingLabelColumn)
        }
    }

    /// Every column except `label`, in file order
    pub fn feature_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.as_str() != LABEL_COLUMN)
            .cloned()
            .collect()
    }

    pub fn head(&self, n: usize) -> DatasetPreview {
        DatasetPreview {
            rows: self.rows.len(),
            columns: self.columns.clone(),
            preview: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Numeric matrix of the named columns, in the order given
    pub fn select(&self, names: &[String]) -> Result<Vec<Vec<f64>>, DatasetError> {
        let missing: Vec<String> = names
            .iter()
            .filter(|n| !self.has_column(n))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(DatasetError::MissingColumns(missing));
        }

        let indices: Vec<usize> = names
            .iter()
            .filter_map(|n| self.column_index(n))
            .collect();

        self.rows
            .iter()
            .enumerate()
            .map(|(row_idx, row)| {
                indices
                    .iter()
                    .zip(names)
                    .map(|(&col_idx, name)| {
                        let value = row.get(col_idx).map(String::as_str).unwrap_or("");
                        value.parse::<f64>().map_err(|_| DatasetError::NonNumeric {
                            column: name.clone(),
                            row: row_idx + 1,
                            value: value.to_string(),
                        })
                    })
                    .collect()
            })
            .collect()
    }

    /// Integer class of every row's `label`
    pub fn labels(&self) -> Result<Vec<i64>, DatasetError> {
        let idx = self
            .column_index(LABEL_COLUMN)
            .ok_or(DatasetError::MissingLabelColumn)?;

        self.rows
            .iter()
            .enumerate()
            .map(|(row_idx, row)| {
                let value = row.get(idx).map(String::as_str).unwrap_or("");
                parse_class(value).ok_or_else(|| DatasetError::InvalidLabel {
                    row: row_idx + 1,
                    value: value.to_string(),
                })
            })
            .collect()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Accepts "1" as well as "1.0"
fn parse_class(value: &str) -> Option<i64> {
    if let Ok(v) = value.parse::<i64>() {
        return Some(v);
    }
    let v = value.parse::<f64>().ok()?;
    (v.is_finite() && v.fract() == 0.0).then_some(v as i64)
}
