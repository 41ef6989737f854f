//! Repositories over the cell store
//!
//! Each repository borrows a connection (or a `rusqlite::Transaction`, which
//! derefs to one) and never opens a transaction of its own: the caller owns
//! the unit of work.

use rusqlite::{Connection, OptionalExtension, params};

use crate::Result;
use crate::model::{Category, Cell, File, NewCell, StoreStats};

// ========== Category Operations ==========

pub struct CategoryRepository<'a> {
    conn: &'a Connection,
}

impl<'a> CategoryRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Get a category by its unique name
    pub fn get(&self, name: &str) -> Result<Option<Category>> {
        self.conn
            .query_row(
                "SELECT id, name, region, type FROM categories WHERE name = ?1",
                [name],
                row_to_category,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Insert a category. Uniqueness is checked by the caller; a duplicate that
    /// slips through surfaces as `Error::ConstraintViolation`.
    pub fn create(&self, name: &str, region: &str, kind: &str) -> Result<Category> {
        self.conn.execute(
            "INSERT INTO categories (name, region, type) VALUES (?1, ?2, ?3)",
            params![name, region, kind],
        )?;

        Ok(Category {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            region: region.to_string(),
            kind: kind.to_string(),
        })
    }

    /// Sum of every float cell owned by categories of the given type.
    /// `TOTAL` yields 0.0 over an empty set.
    pub fn sum_by_type(&self, kind: &str) -> Result<f64> {
        let total: f64 = self.conn.query_row(
            r#"
            SELECT TOTAL(cell.float_value)
            FROM cells AS cell
            JOIN files AS file ON cell.file_id = file.id
            JOIN categories AS category ON file.category_id = category.id
            WHERE category.type = ?1
              AND cell.float_value IS NOT NULL
            "#,
            [kind],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Distinct regions of categories owning a string cell that contains `term`,
    /// case-insensitively. Both sides are lowercased with `str::to_lowercase`, so
    /// non-ASCII letters fold too; matching goes through the trigram index.
    pub fn find_regions_by_cell_substring(&self, term: &str) -> Result<Vec<String>> {
        let pattern = format!("%{}%", term.to_lowercase());
        let mut stmt = self.conn.prepare(
            r#"
            SELECT DISTINCT category.region
            FROM categories AS category
            JOIN files AS file ON file.category_id = category.id
            JOIN cells AS cell ON cell.file_id = file.id
            WHERE cell.id IN (
                SELECT rowid FROM cells_str_trgm WHERE str_lower LIKE ?1
            )
            "#,
        )?;

        let regions = stmt
            .query_map([pattern], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(regions)
    }

    /// Count all categories
    pub fn count(&self) -> Result<usize> {
        count_rows(self.conn, "SELECT COUNT(*) FROM categories")
    }
}

fn row_to_category(row: &rusqlite::Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        region: row.get(2)?,
        kind: row.get(3)?,
    })
}

// ========== File Operations ==========

pub struct FileRepository<'a> {
    conn: &'a Connection,
}

impl<'a> FileRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Store an uploaded file verbatim and return its id
    pub fn create(&self, category_id: i64, name: &str, contents: &[u8]) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO files (category_id, name, binary_data) VALUES (?1, ?2, ?3)",
            params![category_id, name, contents],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get a file, including its raw bytes
    pub fn get(&self, id: i64) -> Result<Option<File>> {
        self.conn
            .query_row(
                "SELECT id, category_id, name, binary_data FROM files WHERE id = ?1",
                [id],
                |row| {
                    Ok(File {
                        id: row.get(0)?,
                        category_id: row.get(1)?,
                        name: row.get(2)?,
                        binary_data: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Ids of the files owned by a category, oldest first
    pub fn ids_for_category(&self, category_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM files WHERE category_id = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map([category_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    /// Count all files
    pub fn count(&self) -> Result<usize> {
        count_rows(self.conn, "SELECT COUNT(*) FROM files")
    }
}

// ========== Cell Operations ==========

pub struct CellRepository<'a> {
    conn: &'a Connection,
}

impl<'a> CellRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert one cell bound to a file and return its id
    pub fn create(&self, file_id: i64, value: &NewCell) -> Result<i64> {
        let (str_value, float_value) = value.columns();
        let str_lower = str_value.map(str::to_lowercase);
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO cells (file_id, str_value, str_lower, float_value) VALUES (?1, ?2, ?3, ?4)",
        )?;
        stmt.execute(params![file_id, str_value, str_lower, float_value])?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All cells of a file, in insertion order
    pub fn find_by_file(&self, file_id: i64) -> Result<Vec<Cell>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, file_id, str_value, float_value FROM cells WHERE file_id = ?1 ORDER BY id",
        )?;
        let cells = stmt
            .query_map([file_id], |row| {
                Ok(Cell {
                    id: row.get(0)?,
                    file_id: row.get(1)?,
                    str_value: row.get(2)?,
                    float_value: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cells)
    }

    /// `(float cells, string cells)` persisted for a file
    pub fn count_by_kind(&self, file_id: i64) -> Result<(usize, usize)> {
        let (floats, strings): (i64, i64) = self.conn.query_row(
            r#"
            SELECT COUNT(float_value), COUNT(str_value)
            FROM cells
            WHERE file_id = ?1
            "#,
            [file_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((floats as usize, strings as usize))
    }

    /// Count all cells
    pub fn count(&self) -> Result<usize> {
        count_rows(self.conn, "SELECT COUNT(*) FROM cells")
    }
}

/// Get row totals for every table
pub fn stats(conn: &Connection) -> Result<StoreStats> {
    Ok(StoreStats {
        categories: CategoryRepository::new(conn).count()?,
        files: FileRepository::new(conn).count()?,
        cells: CellRepository::new(conn).count()?,
    })
}

fn count_rows(conn: &Connection, sql: &str) -> Result<usize> {
    let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(count as usize)
}
