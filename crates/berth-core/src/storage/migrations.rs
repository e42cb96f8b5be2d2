//! Forward-only schema migrations
//!
//! Scripts are applied in order. A script's version is its 1-based position
//! in the list; the highest applied version is recorded in `schema_info`.
//! Each script runs together with its version bump in one transaction, and
//! the first failure aborts startup. Already-applied scripts never re-run.

use std::fmt;
use std::time::Instant;

use rusqlite::{params, Connection};
use tracing::debug;

use crate::error::{DataError, DataResult};

/// Schema version after all built-in migrations
pub const SCHEMA_VERSION: i32 = 4;

/// A named migration script
///
/// The SQL text is only produced when the script is about to run.
#[derive(Clone, Copy)]
pub struct Migration {
    name: &'static str,
    sql: fn() -> &'static str,
}

impl Migration {
    pub const fn new(name: &'static str, sql: fn() -> &'static str) -> Self {
        Self { name, sql }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn sql(&self) -> &'static str {
        (self.sql)()
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration").field("name", &self.name).finish()
    }
}

/// The launcher's schema scripts, oldest first
pub fn builtin() -> Vec<Migration> {
    vec![
        Migration::new("0001_initial", || {
            include_str!("../../migrations/0001_initial.sql")
        }),
        Migration::new("0002_server_content", || {
            include_str!("../../migrations/0002_server_content.sql")
        }),
        Migration::new("0003_engine_installation", || {
            include_str!("../../migrations/0003_engine_installation.sql")
        }),
        Migration::new("0004_login_server", || {
            include_str!("../../migrations/0004_login_server.sql")
        }),
    ]
}

/// Get the recorded schema version, 0 for a fresh database
pub fn schema_version(conn: &Connection) -> rusqlite::Result<i32> {
    let table_exists = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_info'")?
        .exists([])?;
    if !table_exists {
        return Ok(0);
    }

    let mut stmt = conn.prepare("SELECT value FROM schema_info WHERE key = 'version'")?;
    let result: rusqlite::Result<String> = stmt.query_row([], |row| row.get(0));

    match result {
        Ok(version_str) => Ok(version_str.parse().unwrap_or(0)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e),
    }
}

/// Apply every script newer than the recorded version
///
/// Returns the number of scripts applied.
pub fn run_migrations<I>(conn: &mut Connection, scripts: I) -> DataResult<usize>
where
    I: IntoIterator<Item = Migration>,
{
    let started = Instant::now();
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_info (key TEXT PRIMARY KEY, value TEXT NOT NULL);",
    )?;
    let current = schema_version(conn)?;

    let mut applied = 0;
    for (index, script) in scripts.into_iter().enumerate() {
        let version = index as i32 + 1;
        if version <= current {
            continue;
        }

        apply_one(conn, &script, version).map_err(|source| DataError::MigrationFailed {
            script: script.name().to_string(),
            source,
        })?;
        debug!(script = script.name(), version, "Applied migration");
        applied += 1;
    }

    debug!(applied, elapsed = ?started.elapsed(), "Did migrations");
    Ok(applied)
}

fn apply_one(conn: &mut Connection, script: &Migration, version: i32) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(script.sql())?;
    tx.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?1)",
        params![version.to_string()],
    )?;
    tx.commit()
}
