//! Persistence commands
//!
//! A `DbCommand` is a plain-data description of one statement to run when
//! the queue flushes. It owns copies of everything it writes, so mutating
//! the in-memory element after enqueueing cannot change what reaches disk.

use rusqlite::{params, Connection};

use crate::collection::ChangeReason;
use crate::cvar::CVarValue;
use crate::models::{FavoriteServer, InstalledEngineVersion, InstalledServerContent, LoginInfo};
use crate::storage::tables;

/// Key of the marker row that makes a store count as populated
pub const POPULATED_KEY: &str = "Populated";

/// One queued write against the settings database
#[derive(Debug, Clone, PartialEq)]
pub enum DbCommand {
    /// Upsert a variable value
    SetConfig { key: String, value: CVarValue },
    /// Write the populated marker row
    MarkPopulated,
    Favorite(ChangeReason, FavoriteServer),
    Login(ChangeReason, LoginInfo),
    ServerContent(ChangeReason, InstalledServerContent),
    EngineInstallation(ChangeReason, InstalledEngineVersion),
}

impl DbCommand {
    /// Run the statement on `conn` (normally an open transaction)
    pub fn apply(&self, conn: &Connection) -> rusqlite::Result<()> {
        match self {
            DbCommand::SetConfig { key, value } => {
                conn.execute(
                    "INSERT OR REPLACE INTO Config (Key, Value) VALUES (?1, ?2)",
                    params![key, value],
                )?;
            }
            DbCommand::MarkPopulated => {
                conn.execute(
                    "INSERT OR REPLACE INTO Config (Key, Value) VALUES (?1, 1)",
                    params![POPULATED_KEY],
                )?;
            }
            DbCommand::Favorite(reason, row) => tables::write_favorite(conn, *reason, row)?,
            DbCommand::Login(reason, row) => tables::write_login(conn, *reason, row)?,
            DbCommand::ServerContent(reason, row) => {
                tables::write_server_content(conn, *reason, row)?
            }
            DbCommand::EngineInstallation(reason, row) => {
                tables::write_engine_installation(conn, *reason, row)?
            }
        }
        Ok(())
    }

    /// Short label for logging
    pub fn describe(&self) -> String {
        match self {
            DbCommand::SetConfig { key, .. } => format!("set {}", key),
            DbCommand::MarkPopulated => "mark populated".to_string(),
            DbCommand::Favorite(reason, row) => format!("{:?} favorite {}", reason, row.address),
            DbCommand::Login(reason, row) => format!("{:?} login {}", reason, row.user_id),
            DbCommand::ServerContent(reason, row) => {
                format!("{:?} server content {}", reason, row.fork_id)
            }
            DbCommand::EngineInstallation(reason, row) => {
                format!("{:?} engine {}", reason, row.version)
            }
        }
    }
}
