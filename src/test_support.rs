//! Shared helpers for unit tests

use rust_xlsxwriter::{Workbook, XlsxError};

use crate::storage::{ConnectionPool, PoolOptions};

/// Build an in-memory xlsx workbook
pub fn workbook_bytes(build: impl FnOnce(&mut Workbook) -> Result<(), XlsxError>) -> Vec<u8> {
    let mut workbook = Workbook::new();
    build(&mut workbook).unwrap();
    workbook.save_to_buffer().unwrap()
}

/// One sheet named `sheet1` holding `[42.5, "North", "   "]` on the first row
pub fn sales_workbook() -> Vec<u8> {
    workbook_bytes(|wb| {
        let sheet = wb.add_worksheet().set_name("sheet1")?;
        sheet.write_number(0, 0, 42.5)?;
        sheet.write_string(0, 1, "North")?;
        sheet.write_string(0, 2, "   ")?;
        Ok(())
    })
}

/// Pool over a fresh database in a temporary directory
pub fn temp_pool() -> (tempfile::TempDir, ConnectionPool) {
    let dir = tempfile::tempdir().unwrap();
    let pool =
        ConnectionPool::open(&dir.path().join("cells.db"), PoolOptions::default()).unwrap();
    (dir, pool)
}
