//! Upload ingestion
//!
//! One upload goes through: content type check, category lookup, empty check,
//! workbook parse, then a single IMMEDIATE transaction that writes the `File`
//! row followed by every `Cell` row. Any failure before the commit leaves the
//! store untouched.

use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;

use crate::decompose::{self, CellValue};
use crate::model::{Category, NewCell};
use crate::storage::{CategoryRepository, CellRepository, FileRepository};
use crate::{Error, Result};

/// MIME types accepted for spreadsheet uploads
pub const ACCEPTED_CONTENT_TYPES: &[&str] = &[
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
    "application/octet-stream",
];

/// Stored file name when the client sends none
pub const DEFAULT_FILENAME: &str = "upload.xlsx";

/// An uploaded file as received from the client
#[derive(Debug, Clone)]
pub struct Upload {
    pub category_name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub contents: Vec<u8>,
}

/// Outcome of a successful ingestion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub filename: String,
    pub sheets: Vec<String>,
    pub float_values: usize,
    pub str_values: usize,
    /// Values dropped for lack of a column (booleans, dates, errors)
    #[serde(skip)]
    pub other_values: usize,
    #[serde(skip)]
    pub file_id: i64,
}

/// Check a content type against [`ACCEPTED_CONTENT_TYPES`], ignoring parameters
pub fn check_content_type(content_type: Option<&str>) -> Result<()> {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(str::trim)
        .unwrap_or("");

    if ACCEPTED_CONTENT_TYPES
        .iter()
        .any(|accepted| accepted.eq_ignore_ascii_case(essence))
    {
        Ok(())
    } else {
        Err(Error::UnsupportedMediaType(
            content_type.unwrap_or("unknown").to_string(),
        ))
    }
}

/// Create a category unless one with the same name exists
pub fn create_category(
    conn: &mut Connection,
    name: &str,
    region: &str,
    kind: &str,
) -> Result<Category> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let categories = CategoryRepository::new(&tx);
    if categories.get(name)?.is_some() {
        return Err(Error::CategoryExists(name.to_string()));
    }
    let category = categories.create(name, region, kind)?;
    tx.commit()?;

    tracing::info!("Created category {:?} (id {})", category.name, category.id);
    Ok(category)
}

/// Ingest one upload as a single unit of work
pub fn ingest(conn: &mut Connection, upload: &Upload) -> Result<IngestReport> {
    check_content_type(upload.content_type.as_deref())?;

    let category = CategoryRepository::new(conn)
        .get(&upload.category_name)?
        .ok_or_else(|| Error::CategoryNotFound(upload.category_name.clone()))?;

    if upload.contents.is_empty() {
        return Err(Error::EmptyFile);
    }

    let sheets = decompose::decompose(&upload.contents)?;

    let filename = upload
        .filename
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_FILENAME)
        .to_string();

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let file_id = FileRepository::new(&tx).create(category.id, &filename, &upload.contents)?;

    let cells = CellRepository::new(&tx);
    let mut report = IngestReport {
        filename,
        sheets: Vec::with_capacity(sheets.len()),
        float_values: 0,
        str_values: 0,
        other_values: 0,
        file_id,
    };

    for sheet in sheets {
        let mut skipped = 0;
        for value in sheet.values {
            match value {
                CellValue::Number(n) => {
                    cells.create(file_id, &NewCell::Number(n))?;
                    report.float_values += 1;
                }
                CellValue::Text(s) => {
                    cells.create(file_id, &NewCell::Text(s))?;
                    report.str_values += 1;
                }
                CellValue::Unsupported { kind, display: shown } => {
                    tracing::debug!("Sheet {:?}: dropping {} value {:?}", sheet.name, kind, shown);
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            tracing::warn!(
                "Sheet {:?}: {} boolean/date/error value(s) not stored",
                sheet.name,
                skipped
            );
        }
        report.other_values += skipped;
        report.sheets.push(sheet.name);
    }

    tx.commit()?;

    tracing::info!(
        "Ingested {:?} into category {:?}: {} sheet(s), {} float, {} str, {} other",
        report.filename,
        category.name,
        report.sheets.len(),
        report.float_values,
        report.str_values,
        report.other_values
    );

    Ok(report)
}
