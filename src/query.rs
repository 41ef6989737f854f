//! Query operations over ingested cells
//!
//! Provides the read side:
//! - Typed sum: total of numeric cells across categories of one type
//! - Region search: regions whose cells contain a piece of text

use rusqlite::Connection;

use crate::Result;
use crate::storage::CategoryRepository;

/// Read-only queries over the cell store
pub struct QueryEngine<'a> {
    conn: &'a Connection,
}

impl<'a> QueryEngine<'a> {
    /// Create a new query engine
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Sum of all numeric cells in categories of type `kind`; 0.0 when none.
    pub fn sum_by_type(&self, kind: &str) -> Result<f64> {
        let total = CategoryRepository::new(self.conn).sum_by_type(kind)?;
        tracing::debug!("sum_by_type({:?}) = {}", kind, total);
        Ok(total)
    }

    /// Regions of categories with a string cell containing `term`.
    ///
    /// Case-insensitive and unanchored. The caller rejects empty terms.
    pub fn find_regions(&self, term: &str) -> Result<Vec<String>> {
        let regions = CategoryRepository::new(self.conn).find_regions_by_cell_substring(term)?;
        tracing::debug!("find_regions({:?}) matched {} region(s)", term, regions.len());
        Ok(regions)
    }
}
