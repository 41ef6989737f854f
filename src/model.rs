//! Persisted entities
//!
//! Ownership runs one way: a `Category` owns its `File`s and a `File` owns its
//! `Cell`s. Rows only carry the id of their owner; traversal happens through
//! explicit joins in the repository layer.

use serde::Serialize;

/// A named grouping that owns uploaded files.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub region: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One uploaded spreadsheet, stored verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub binary_data: Vec<u8>,
}

/// One scalar value extracted from a spreadsheet.
///
/// Exactly one of `str_value` / `float_value` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub id: i64,
    pub file_id: i64,
    pub str_value: Option<String>,
    pub float_value: Option<f64>,
}

/// Value of a cell about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub enum NewCell {
    Number(f64),
    Text(String),
}

impl NewCell {
    /// Split into the `(str_value, float_value)` column pair.
    pub fn columns(&self) -> (Option<&str>, Option<f64>) {
        match self {
            NewCell::Number(n) => (None, Some(*n)),
            NewCell::Text(s) => (Some(s.as_str()), None),
        }
    }
}

/// Row totals across the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub categories: usize,
    pub files: usize,
    pub cells: usize,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Categories: {}", self.categories)?;
        writeln!(f, "  Files: {}", self.files)?;
        writeln!(f, "  Cells: {}", self.cells)
    }
}
