//! Database schema definitions

/// SQL to create the categories table
pub const CREATE_CATEGORIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK (length(name) BETWEEN 1 AND 256),
    region TEXT NOT NULL CHECK (length(region) <= 256),
    type TEXT NOT NULL CHECK (length(type) <= 256)
)
"#;

/// SQL to create the files table
pub const CREATE_FILES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
    name TEXT NOT NULL CHECK (length(name) <= 256),
    binary_data BLOB NOT NULL
)
"#;

/// SQL to create the cells table
/// A cell holds a string or a float; the store rejects rows holding neither.
/// `str_lower` is `str_value` lowercased by the writer (full Unicode folding),
/// the column region search matches against.
pub const CREATE_CELLS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS cells (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    str_value TEXT CHECK (length(str_value) <= 32767),
    str_lower TEXT,
    float_value REAL,
    CONSTRAINT cells_value_not_null CHECK (str_value IS NOT NULL OR float_value IS NOT NULL),
    CONSTRAINT cells_lower_matches CHECK ((str_value IS NULL) = (str_lower IS NULL))
)
"#;

/// SQL to create the trigram index over `cells.str_lower`
/// External-content FTS5 table: it stores only the index, values stay in `cells`.
pub const CREATE_CELLS_TRIGRAM_INDEX: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS cells_str_trgm USING fts5(
    str_lower,
    content = 'cells',
    content_rowid = 'id',
    tokenize = 'trigram'
)
"#;

/// Keep the trigram index in step with `cells`
pub const CREATE_TRIGRAM_TRIGGERS: &[&str] = &[
    r#"
CREATE TRIGGER IF NOT EXISTS cells_str_trgm_ai AFTER INSERT ON cells
WHEN new.str_lower IS NOT NULL
BEGIN
    INSERT INTO cells_str_trgm (rowid, str_lower) VALUES (new.id, new.str_lower);
END
"#,
    r#"
CREATE TRIGGER IF NOT EXISTS cells_str_trgm_ad AFTER DELETE ON cells
WHEN old.str_lower IS NOT NULL
BEGIN
    INSERT INTO cells_str_trgm (cells_str_trgm, rowid, str_lower) VALUES ('delete', old.id, old.str_lower);
END
"#,
];

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_categories_name ON categories(name)",
    "CREATE INDEX IF NOT EXISTS idx_categories_type ON categories(type)",
    "CREATE INDEX IF NOT EXISTS idx_files_category_id ON files(category_id)",
    "CREATE INDEX IF NOT EXISTS idx_cells_file_id ON cells(file_id)",
    "CREATE INDEX IF NOT EXISTS idx_cells_float_value ON cells(float_value)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_CATEGORIES_TABLE,
        CREATE_FILES_TABLE,
        CREATE_CELLS_TABLE,
        CREATE_CELLS_TRIGRAM_INDEX,
    ];
    stmts.extend(CREATE_TRIGRAM_TRIGGERS.iter().copied());
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
