//! In-memory well dataset
//!
//! Parses the uploaded text file into rows of numeric samples. Row `i` is
//! line `i` of the file, which is the same index space the clustering service
//! uses for `expected_graph`, `farthest_graph` and `closest_graph`.
//!
//! Lines that cannot be parsed stay in the dataset as absent rows so that the
//! indices of the rows after them do not shift.

use thiserror::Error;
use tracing::{debug, warn};

/// A dataset line that is not a comma-separated list of numbers
#[derive(Debug, Clone, PartialEq, Error)]
#[error("row {row}: field {field} is not numeric: {value:?}")]
pub struct MalformedInputError {
    pub row: usize,
    pub field: usize,
    pub value: String,
}

/// Immutable view over the parsed rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: Vec<Option<Vec<f64>>>,
}

impl Dataset {
    /// Parse raw text into a dataset
    ///
    /// Accepts `\n` and `\r\n` line endings. A trailing newline does not add
    /// an empty row; any other empty or non-numeric line becomes an absent row.
    pub fn parse(raw: &str) -> Self {
        let rows: Vec<Option<Vec<f64>>> = raw
            .lines()
            .enumerate()
            .map(|(row, line)| match parse_row(row, line) {
                Ok(samples) => Some(samples),
                Err(e) => {
                    warn!(error = %e, "Treating malformed dataset row as absent");
                    None
                }
            })
            .collect();

        debug!(rows = rows.len(), "Parsed dataset");
        Self { rows }
    }

    /// Parse uploaded file bytes (invalid UTF-8 is replaced, not rejected)
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::parse(&String::from_utf8_lossy(bytes))
    }

    /// Number of rows, including absent ones
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Samples of row `index`, or `None` if it is past the end or malformed
    pub fn row_at(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index)?.as_deref()
    }

    /// Indices of rows that failed to parse
    pub fn malformed_rows(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.is_none())
            .map(|(index, _)| index)
            .collect()
    }
}

/// Parse one line of comma-separated samples
pub fn parse_row(row: usize, line: &str) -> Result<Vec<f64>, MalformedInputError> {
    line.split(',')
        .enumerate()
        .map(|(field, raw)| {
            let value = raw.trim();
            value.parse::<f64>().map_err(|_| MalformedInputError {
                row,
                field,
                value: value.to_string(),
            })
        })
        .collect()
}
