//! One-time import of the legacy `launcher_config.json`
//!
//! Before settings moved to SQLite they lived in a single JSON document.
//! When the database has never been populated, that document (if present)
//! is replayed through the normal mutation paths so it produces exactly the
//! commands a user making the same changes would. The populated marker is
//! queued in the same batch, so the import happens at most once per store.

use std::fs;
use std::io;
use std::path::Path;

use rusqlite::Connection;
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cvar::{cvars, CVarDef, CVarType};
use crate::error::{DataError, DataResult};
use crate::models::{FavoriteServer, InstalledEngineVersion, InstalledServerContent, LoginInfo};
use crate::storage::command::DbCommand;
use crate::storage::database::is_populated;
use crate::store::DataStore;

/// Parsed contents of the legacy config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacySnapshot {
    #[serde(default)]
    pub selected_login: Option<Uuid>,
    #[serde(default)]
    pub favorites: Option<Vec<FavoriteServer>>,
    #[serde(default)]
    pub server_content: Option<Vec<InstalledServerContent>>,
    #[serde(default)]
    pub engines: Option<Vec<InstalledEngineVersion>>,
    #[serde(default)]
    pub logins: Option<Vec<LoginInfo>>,
    #[serde(default = "default_next_installation_id")]
    pub next_installation_id: i32,
    #[serde(default)]
    pub fingerprint: Uuid,
    #[serde(default)]
    pub force_gles2: Option<bool>,
    #[serde(default)]
    pub dynamic_pgo: Option<bool>,
    #[serde(default)]
    pub dismissed_early_access_warning: Option<bool>,
    #[serde(default)]
    pub disable_signing: bool,
    #[serde(default)]
    pub log_client: bool,
    #[serde(default)]
    pub log_launcher: bool,
    #[serde(default)]
    pub multi_accounts: bool,
}

fn default_next_installation_id() -> i32 {
    1
}

impl LegacySnapshot {
    /// Read the snapshot at `path`, or `None` if there is no file
    pub fn read(path: &Path) -> DataResult<Option<Self>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(DataError::ReadError {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let snapshot = serde_json::from_str(&text).map_err(|source| DataError::LegacyParse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(snapshot))
    }
}

/// What `import_if_empty` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The store already had data; nothing was imported
    AlreadyPopulated,
    /// The store was empty and there was no legacy file
    NoLegacyFile,
    /// The legacy file was replayed into the store
    Imported(ImportCounts),
}

/// Number of elements imported per collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportCounts {
    pub favorites: usize,
    pub logins: usize,
    pub server_content: usize,
    pub engines: usize,
}

/// Import the legacy snapshot if the store has never been populated
///
/// Queues the populated marker whenever the store was empty, so an empty
/// store with no legacy file is also only initialized once. Nothing is
/// written until the caller commits.
pub fn import_if_empty(
    conn: &Connection,
    store: &mut DataStore,
    legacy_path: &Path,
) -> DataResult<ImportOutcome> {
    if is_populated(conn)? {
        return Ok(ImportOutcome::AlreadyPopulated);
    }

    let outcome = match LegacySnapshot::read(legacy_path)? {
        Some(snapshot) => {
            let counts = import_snapshot(store, snapshot)?;
            info!(?counts, path = ?legacy_path, "Imported legacy launcher config");
            ImportOutcome::Imported(counts)
        }
        None => {
            debug!(path = ?legacy_path, "No legacy launcher config to import");
            ImportOutcome::NoLegacyFile
        }
    };

    store.enqueue(DbCommand::MarkPopulated);
    Ok(outcome)
}

/// Replay a snapshot through the store's mutation paths
pub fn import_snapshot(store: &mut DataStore, snapshot: LegacySnapshot) -> DataResult<ImportCounts> {
    let mut counts = ImportCounts::default();

    for favorite in snapshot.favorites.unwrap_or_default() {
        counts.favorites += added(store.favorites_mut().add(favorite))?;
    }
    for login in snapshot.logins.unwrap_or_default() {
        counts.logins += added(store.add_login(login))?;
    }
    for engine in snapshot.engines.unwrap_or_default() {
        counts.engines += added(store.engine_installations_mut().add(engine))?;
    }
    for content in snapshot.server_content.unwrap_or_default() {
        counts.server_content += added(store.server_content_mut().add(content))?;
    }

    set_if_registered(
        store,
        &cvars::COMPAT_MODE,
        snapshot
            .force_gles2
            .unwrap_or_else(|| cvars::COMPAT_MODE.default_value()),
    )?;
    set_if_registered(store, &cvars::FINGERPRINT, snapshot.fingerprint)?;
    set_if_registered(
        store,
        &cvars::DYNAMIC_PGO,
        snapshot
            .dynamic_pgo
            .unwrap_or_else(|| cvars::DYNAMIC_PGO.default_value()),
    )?;
    set_if_registered(store, &cvars::DISABLE_SIGNING, snapshot.disable_signing)?;
    set_if_registered(store, &cvars::LOG_CLIENT, snapshot.log_client)?;
    set_if_registered(store, &cvars::LOG_LAUNCHER, snapshot.log_launcher)?;
    set_if_registered(store, &cvars::MULTI_ACCOUNTS, snapshot.multi_accounts)?;
    set_if_registered(
        store,
        &cvars::HAS_DISMISSED_EARLY_ACCESS_WARNING,
        snapshot.dismissed_early_access_warning.unwrap_or(false),
    )?;
    set_if_registered(
        store,
        &cvars::NEXT_INSTALLATION_ID,
        snapshot.next_installation_id,
    )?;

    if let Some(user_id) = snapshot.selected_login {
        match set_if_registered(store, &cvars::SELECTED_LOGIN, user_id) {
            Err(DataError::DanglingSelectionReference { .. }) => {
                warn!(%user_id, "Legacy config selects a login it does not contain")
            }
            other => other?,
        }
    }

    Ok(counts)
}

/// Count a successful add; skip duplicates in the legacy file
fn added(result: DataResult<()>) -> DataResult<usize> {
    match result {
        Ok(()) => Ok(1),
        Err(DataError::DuplicateKey { collection, key }) => {
            warn!(collection, key = %key, "Skipping duplicate entry in legacy config");
            Ok(0)
        }
        Err(e) => Err(e),
    }
}

fn set_if_registered<T: CVarType>(
    store: &mut DataStore,
    def: &CVarDef<T>,
    value: T,
) -> DataResult<()> {
    if !store.registry().contains(def.name()) {
        debug!(name = def.name(), "Variable not registered, skipping legacy value");
        return Ok(());
    }
    store.set(def, value)?;
    Ok(())
}
