// 📥 Raw Cells - What the spreadsheet decoder hands us
//
// A decoded remittance file is a row-major matrix of cells, header row
// already stripped. Cells carry no typing beyond text / number / absent.

use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

// ============================================================================
// CELL VALUE
// ============================================================================

/// One raw spreadsheet cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Missing / null cell
    Empty,
    /// Numeric cell as produced by the decoder
    Number(f64),
    /// Text cell, untrimmed
    Text(String),
}

impl CellValue {
    /// Convert a decoded JSON value into a cell
    ///
    /// Booleans and nested values have no cell meaning of their own, so they
    /// are kept as their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Empty,
            Value::String(s) => CellValue::Text(s.clone()),
            Value::Number(n) => match n.as_f64() {
                Some(f) => CellValue::Number(f),
                None => CellValue::Text(n.to_string()),
            },
            other => CellValue::Text(other.to_string()),
        }
    }

    /// True for absent cells and whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(CellValue::from_json(&value))
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

/// One decoded row, addressed by column index
pub type RawRow = Vec<CellValue>;

/// True when every cell of the row is blank
pub fn is_blank_row(row: &[CellValue]) -> bool {
    row.iter().all(CellValue::is_blank)
}

// ============================================================================
// MATRIX LOADING
// ============================================================================

/// Build a matrix from a decoded JSON document
///
/// The document must be an array of arrays. `null` means the decoder
/// produced nothing, which is a structural failure for the whole batch.
pub fn matrix_from_json(value: &Value) -> PipelineResult<Vec<RawRow>> {
    let rows = match value {
        Value::Null => {
            return Err(PipelineError::InvalidInput("matrix is absent".to_string()));
        }
        Value::Array(rows) => rows,
        other => {
            return Err(PipelineError::InvalidInput(format!(
                "expected an array of rows, got {}",
                json_kind(other)
            )));
        }
    };

    rows.iter()
        .enumerate()
        .map(|(idx, row)| match row {
            Value::Array(cells) => Ok(cells.iter().map(CellValue::from_json).collect()),
            other => Err(PipelineError::InvalidInput(format!(
                "row {} is {}, expected an array of cells",
                idx,
                json_kind(other)
            ))),
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// TESTS
// ============================================================================
