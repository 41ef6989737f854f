//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - categories(id, name, region, type)
//! - files(id, category_id, name, binary_data)
//! - cells(id, file_id, str_value, float_value)
//! - cells_str_trgm: trigram FTS5 index over cells.str_value

pub mod pool;
pub mod repository;
pub mod schema;

pub use pool::{ConnectionPool, PoolOptions, PooledConnection};
pub use repository::{CategoryRepository, CellRepository, FileRepository, stats};
