//! Settings database handle
//!
//! A `Database` is just the location of the SQLite file. Connections are
//! opened where they are needed: once on the owner thread during startup
//! and once per flush on a blocking worker.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rusqlite::Connection;

use crate::error::{DataError, DataResult};
use crate::storage::command::DbCommand;

#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a connection, creating the file and its directory if needed
    pub fn open(&self) -> DataResult<Connection> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| DataError::ReadError {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        Ok(self.connect()?)
    }

    fn connect(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    /// Apply a batch of commands in one transaction
    ///
    /// Either every command lands or none do. Returns how long the final
    /// commit took.
    pub fn apply_batch(&self, batch: &[DbCommand]) -> rusqlite::Result<Duration> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        for cmd in batch {
            cmd.apply(&tx)?;
        }

        let started = Instant::now();
        tx.commit()?;
        Ok(started.elapsed())
    }
}

/// Whether the Config table has ever been written to
pub fn is_populated(conn: &Connection) -> rusqlite::Result<bool> {
    conn.query_row("SELECT COUNT(*) > 0 FROM Config", [], |row| row.get(0))
}
