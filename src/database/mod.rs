use rusqlite::Connection;
use std::path::PathBuf;
use std::time::Duration;

const INIT_SQL: &str = include_str!("../../migrations/0001_init.sql");

/// Where the SQLite file lives and how long a connection waits for a lock.
///
/// There is no shared connection: every caller opens its own through [`open_connection`].
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub busy_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(path: impl Into<PathBuf>, busy_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            busy_timeout,
        }
    }
}

pub fn open_connection(db: &DatabaseConfig) -> rusqlite::Result<Connection> {
    let conn = Connection::open(&db.path)?;
    conn.busy_timeout(db.busy_timeout)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

/// Create the database file and tables if missing. Safe to run on every start.
pub fn run_migrations(db: &DatabaseConfig) -> anyhow::Result<()> {
    if let Some(parent) = db.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = open_connection(db)?;

    // WAL keeps readers off the writer's lock; only BEGIN IMMEDIATE contends.
    let journal_mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.execute_batch(INIT_SQL)?;

    let events: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
    tracing::info!(
        path = %db.path.display(),
        journal_mode = %journal_mode,
        events,
        "Database ready"
    );

    Ok(())
}
