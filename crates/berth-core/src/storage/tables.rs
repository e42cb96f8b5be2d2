//! Row mapping for the keyed collection tables
//!
//! Each collection maps its change reasons 1:1 onto SQL verbs:
//! Add → INSERT, Update → UPDATE by key, Remove → DELETE by key.
//!
//! ## Tables
//!
//! - `FavoriteServer` - keyed by `Address`
//! - `Login` - keyed by `UserId` (hyphenated guid text)
//! - `ServerContent` - keyed by `ForkId`
//! - `EngineInstallation` - keyed by `Version`

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::collection::{ChangeReason, Record};
use crate::models::{FavoriteServer, InstalledEngineVersion, InstalledServerContent, LoginInfo, LoginToken};
use crate::storage::command::DbCommand;

impl Record for FavoriteServer {
    type Key = String;
    const COLLECTION: &'static str = "Favorite servers";

    fn key(&self) -> String {
        self.address.clone()
    }

    fn command(reason: ChangeReason, snapshot: Self) -> DbCommand {
        DbCommand::Favorite(reason, snapshot)
    }
}

impl Record for LoginInfo {
    type Key = Uuid;
    const COLLECTION: &'static str = "Logins";

    fn key(&self) -> Uuid {
        self.user_id
    }

    fn command(reason: ChangeReason, snapshot: Self) -> DbCommand {
        DbCommand::Login(reason, snapshot)
    }
}

impl Record for InstalledServerContent {
    type Key = String;
    const COLLECTION: &'static str = "Server content";

    fn key(&self) -> String {
        self.fork_id.clone()
    }

    fn command(reason: ChangeReason, snapshot: Self) -> DbCommand {
        DbCommand::ServerContent(reason, snapshot)
    }
}

impl Record for InstalledEngineVersion {
    type Key = String;
    const COLLECTION: &'static str = "Engine installations";

    fn key(&self) -> String {
        self.version.clone()
    }

    fn command(reason: ChangeReason, snapshot: Self) -> DbCommand {
        DbCommand::EngineInstallation(reason, snapshot)
    }
}

// ==================== Writes ====================

pub(crate) fn write_favorite(
    conn: &Connection,
    reason: ChangeReason,
    row: &FavoriteServer,
) -> rusqlite::Result<()> {
    match reason {
        ChangeReason::Add => conn.execute(
            "INSERT INTO FavoriteServer (Address, Name) VALUES (?1, ?2)",
            params![row.address, row.name],
        )?,
        ChangeReason::Update => conn.execute(
            "UPDATE FavoriteServer SET Name = ?2 WHERE Address = ?1",
            params![row.address, row.name],
        )?,
        ChangeReason::Remove => conn.execute(
            "DELETE FROM FavoriteServer WHERE Address = ?1",
            params![row.address],
        )?,
    };
    Ok(())
}

/// Expiry as RFC 3339 text, keeping every fractional digit
fn encode_expiry(expire_time: &DateTime<Utc>) -> String {
    expire_time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn decode_expiry(text: &str) -> chrono::ParseResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text).map(|t| t.with_timezone(&Utc))
}

pub(crate) fn write_login(
    conn: &Connection,
    reason: ChangeReason,
    row: &LoginInfo,
) -> rusqlite::Result<()> {
    let user_id = row.user_id.to_string();
    match reason {
        ChangeReason::Add => conn.execute(
            r#"
            INSERT INTO Login (UserId, UserName, Token, Expires, Server)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                user_id,
                row.username,
                row.token.token,
                encode_expiry(&row.token.expire_time),
                row.server,
            ],
        )?,
        ChangeReason::Update => conn.execute(
            r#"
            UPDATE Login SET UserName = ?2, Token = ?3, Expires = ?4, Server = ?5
            WHERE UserId = ?1
            "#,
            params![
                user_id,
                row.username,
                row.token.token,
                encode_expiry(&row.token.expire_time),
                row.server,
            ],
        )?,
        ChangeReason::Remove => {
            conn.execute("DELETE FROM Login WHERE UserId = ?1", params![user_id])?
        }
    };
    Ok(())
}

pub(crate) fn write_server_content(
    conn: &Connection,
    reason: ChangeReason,
    row: &InstalledServerContent,
) -> rusqlite::Result<()> {
    match reason {
        ChangeReason::Add => conn.execute(
            r#"
            INSERT INTO ServerContent (ForkId, CurrentVersion, CurrentHash, CurrentEngineVersion, DiskId)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                row.fork_id,
                row.current_version,
                row.current_hash,
                row.current_engine_version,
                row.disk_id,
            ],
        )?,
        ChangeReason::Update => conn.execute(
            r#"
            UPDATE ServerContent
            SET CurrentVersion = ?2, CurrentHash = ?3, CurrentEngineVersion = ?4, DiskId = ?5
            WHERE ForkId = ?1
            "#,
            params![
                row.fork_id,
                row.current_version,
                row.current_hash,
                row.current_engine_version,
                row.disk_id,
            ],
        )?,
        ChangeReason::Remove => conn.execute(
            "DELETE FROM ServerContent WHERE ForkId = ?1",
            params![row.fork_id],
        )?,
    };
    Ok(())
}

pub(crate) fn write_engine_installation(
    conn: &Connection,
    reason: ChangeReason,
    row: &InstalledEngineVersion,
) -> rusqlite::Result<()> {
    match reason {
        ChangeReason::Add => conn.execute(
            "INSERT INTO EngineInstallation (Version, Signature) VALUES (?1, ?2)",
            params![row.version, row.signature],
        )?,
        ChangeReason::Update => conn.execute(
            "UPDATE EngineInstallation SET Signature = ?2 WHERE Version = ?1",
            params![row.version, row.signature],
        )?,
        ChangeReason::Remove => conn.execute(
            "DELETE FROM EngineInstallation WHERE Version = ?1",
            params![row.version],
        )?,
    };
    Ok(())
}

// ==================== Loads ====================

pub fn load_favorites(conn: &Connection) -> rusqlite::Result<Vec<FavoriteServer>> {
    let mut stmt = conn.prepare("SELECT Address, Name FROM FavoriteServer")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(FavoriteServer {
                address: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn load_logins(conn: &Connection) -> rusqlite::Result<Vec<LoginInfo>> {
    let mut stmt = conn.prepare("SELECT UserId, UserName, Token, Expires, Server FROM Login")?;
    let rows = stmt
        .query_map([], |row| {
            let user_id: String = row.get(0)?;
            let user_id = Uuid::parse_str(&user_id).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
            })?;
            let expires: String = row.get(3)?;
            let expire_time = decode_expiry(&expires).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e))
            })?;

            Ok(LoginInfo {
                user_id,
                username: row.get(1)?,
                token: LoginToken {
                    token: row.get(2)?,
                    expire_time,
                },
                server: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn load_server_content(conn: &Connection) -> rusqlite::Result<Vec<InstalledServerContent>> {
    let mut stmt = conn.prepare(
        "SELECT ForkId, CurrentVersion, CurrentHash, CurrentEngineVersion, DiskId FROM ServerContent",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(InstalledServerContent {
                fork_id: row.get(0)?,
                current_version: row.get(1)?,
                current_hash: row.get(2)?,
                current_engine_version: row.get(3)?,
                disk_id: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn load_engine_installations(
    conn: &Connection,
) -> rusqlite::Result<Vec<InstalledEngineVersion>> {
    let mut stmt = conn.prepare("SELECT Version, Signature FROM EngineInstallation")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(InstalledEngineVersion {
                version: row.get(0)?,
                signature: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
