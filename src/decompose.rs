//! Workbook decomposition
//!
//! Flattens every sheet of a workbook into the scalar values it holds, in
//! row-major then column order. Blank cells, whitespace-only strings and NaN
//! never leave this module; everything else is tagged as a number, a piece of
//! text, or a value the store has no column for.

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};

use crate::Result;

/// A non-empty scalar read from a sheet
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Integer or floating point cell, widened to f64
    Number(f64),
    /// Non-blank string, kept verbatim
    Text(String),
    /// Boolean, date/time, duration or error cell. Counted, not stored.
    Unsupported { kind: &'static str, display: String },
}

/// The values of one sheet, in sheet order
#[derive(Debug, Clone, PartialEq)]
pub struct SheetCells {
    pub name: String,
    pub values: Vec<CellValue>,
}

impl SheetCells {
    /// Values the store cannot hold
    pub fn unsupported(&self) -> impl Iterator<Item = &CellValue> {
        self.values
            .iter()
            .filter(|v| matches!(v, CellValue::Unsupported { .. }))
    }
}

/// Parse `bytes` as a workbook (xlsx, xlsm, xlsb, xls or ods) and return the
/// values of every sheet in file order.
///
/// No row is treated as a header: the first row of a sheet is returned as
/// values like every other row. Loaders that take the first row as column
/// names (pandas' `read_excel` default) would drop it.
///
/// Fails with `Error::Parse` when the bytes are not a readable workbook or a
/// sheet cannot be read.
pub fn decompose(bytes: &[u8]) -> Result<Vec<SheetCells>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let sheet_names = workbook.sheet_names();

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for name in sheet_names {
        let range = workbook.worksheet_range(&name)?;
        let values: Vec<CellValue> = range
            .rows()
            .flat_map(|row| row.iter())
            .filter_map(classify)
            .collect();

        tracing::debug!("Sheet {:?}: {} value(s)", name, values.len());
        sheets.push(SheetCells { name, values });
    }

    Ok(sheets)
}

/// Tag a raw cell; `None` for anything that counts as empty.
pub fn classify(data: &Data) -> Option<CellValue> {
    match data {
        Data::Empty => None,
        Data::Float(f) if f.is_nan() => None,
        Data::Float(f) => Some(CellValue::Number(*f)),
        Data::Int(i) => Some(CellValue::Number(*i as f64)),
        Data::String(s) if s.trim().is_empty() => None,
        Data::String(s) => Some(CellValue::Text(s.clone())),
        Data::Bool(_) => Some(unsupported("bool", data)),
        Data::DateTime(_) | Data::DateTimeIso(_) => Some(unsupported("datetime", data)),
        Data::DurationIso(_) => Some(unsupported("duration", data)),
        Data::Error(_) => Some(unsupported("error", data)),
    }
}

fn unsupported(kind: &'static str, data: &Data) -> CellValue {
    CellValue::Unsupported {
        kind,
        display: data.to_string(),
    }
}
