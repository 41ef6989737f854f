//! Fixed-size pool of SQLite connections
//!
//! The pool is built once at process start and handed to whoever needs a unit
//! of work. A connection is checked out with [`ConnectionPool::get`] and goes
//! back to the pool when the returned guard is dropped, whether the work
//! succeeded or not. Pooling itself is `r2d2`; this module owns the SQLite
//! pragmas and schema setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use super::schema;
use crate::{Error, Result};

/// A checked-out connection; goes back to the pool on drop.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Pool sizing and timeouts
#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    /// Number of connections opened up front
    pub size: usize,
    /// How long `get` waits for an idle connection
    pub acquire_timeout: Duration,
    /// How long SQLite retries a locked database before failing a statement
    pub busy_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            size: 4,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Shared handle to the pool; clones refer to the same connections.
#[derive(Clone)]
pub struct ConnectionPool {
    pool: r2d2::Pool<SqliteConnectionManager>,
    path: PathBuf,
}

impl ConnectionPool {
    /// Open `options.size` connections to the database file (created if missing)
    /// and make sure the schema exists.
    pub fn open(path: &Path, options: PoolOptions) -> Result<Self> {
        let size = u32::try_from(options.size.max(1)).unwrap_or(u32::MAX);
        let busy_timeout = options.busy_timeout;
        let manager = SqliteConnectionManager::file(path)
            .with_init(move |conn| configure_connection(conn, busy_timeout));

        let pool = r2d2::Pool::builder()
            .max_size(size)
            .min_idle(Some(size))
            .connection_timeout(options.acquire_timeout)
            .build(manager)?;

        initialize_schema(&*pool.get()?)?;
        tracing::debug!("Opened {} connection(s) to {}", size, path.display());

        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    /// Check out a connection, waiting up to the acquire timeout.
    pub fn get(&self) -> Result<PooledConnection> {
        self.pool.get().map_err(|e| {
            tracing::warn!("No database connection available: {}", e);
            Error::PoolTimeout(self.pool.connection_timeout())
        })
    }

    /// Database file backing the pool
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total number of connections
    pub fn size(&self) -> usize {
        self.pool.max_size() as usize
    }

    /// Connections currently checked in
    pub fn idle(&self) -> usize {
        self.pool.state().idle_connections as usize
    }
}

/// Per-connection pragmas, applied by the pool to every new connection.
fn configure_connection(conn: &mut Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.pragma_update(None, "foreign_keys", true)?;
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    tracing::trace!("journal_mode={}", mode);
    Ok(())
}

/// Initialize the database schema
fn initialize_schema(conn: &Connection) -> Result<()> {
    for stmt in schema::all_schema_statements() {
        conn.execute(stmt, [])?;
    }
    Ok(())
}
