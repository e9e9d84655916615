/// SQL DDL for the quick-dial preference database.
///
/// `value` has no declared type so each row keeps the storage class it was
/// written with; `kind` records which typed accessor owns it.
pub const SCHEMA_VERSION: u32 = 1;

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS preferences (
    key TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    value NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
"#;

/// A write is only reported once it is on disk, hence `synchronous = FULL`.
pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = FULL;
"#;
