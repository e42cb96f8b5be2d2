//! Unified settings interface
//!
//! The `DataStore` owns the variable registry, the four keyed collections
//! and the persistence queue, and coordinates startup:
//!
//! 1. Migrations bring `settings.db` up to the current schema
//! 2. An empty store imports the legacy `launcher_config.json` once;
//!    a populated one is loaded into memory
//! 3. A fingerprint is generated if none exists yet
//! 4. Everything queued so far is committed
//!
//! ## Threading
//!
//! A `DataStore` is `!Send`. It lives on the thread that created it and all
//! mutation happens there. Only flushes run elsewhere, on the tokio runtime
//! passed to [`DataStore::open`].
//!
//! ## Usage
//!
//! ```ignore
//! let runtime = tokio::runtime::Runtime::new()?;
//! let mut store = DataStore::open(Config::load()?, runtime.handle().clone())?;
//!
//! store.favorites_mut().add(FavoriteServer::new("game.example:1212", "A"))?;
//! store.set(&cvars::LOG_CLIENT, true)?;
//! store.commit();
//!
//! store.close();
//! ```

use rusqlite::Connection;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::collection::KeyedCollection;
use crate::config::Config;
use crate::cvar::{cvars, CVarDef, CVarType, CVarValue};
use crate::error::{DataError, DataResult};
use crate::legacy::{import_if_empty, ImportOutcome};
use crate::models::{FavoriteServer, InstalledEngineVersion, InstalledServerContent, LoginInfo};
use crate::registry::{CVarEntry, CVarRegistry};
use crate::storage::command::DbCommand;
use crate::storage::database::Database;
use crate::storage::migrations::{builtin, run_migrations};
use crate::storage::queue::{FlushStats, PersistenceQueue};
use crate::storage::tables;

/// Launcher settings: variables, collections and their persistence
pub struct DataStore {
    config: Config,
    registry: CVarRegistry,
    favorites: KeyedCollection<FavoriteServer>,
    logins: KeyedCollection<LoginInfo>,
    server_content: KeyedCollection<InstalledServerContent>,
    engine_installations: KeyedCollection<InstalledEngineVersion>,
    queue: PersistenceQueue,
}

impl DataStore {
    /// Open the store with every built-in variable registered
    pub fn open(config: Config, runtime: Handle) -> DataResult<Self> {
        Self::open_with_registry(config, CVarRegistry::with_builtin()?, runtime)
    }

    /// Open the store with a caller-built registry
    ///
    /// The registry is closed here; nothing can be registered afterwards.
    pub fn open_with_registry(
        config: Config,
        mut registry: CVarRegistry,
        runtime: Handle,
    ) -> DataResult<Self> {
        let database = Database::new(config.settings_db_path());
        let mut conn = database.open()?;

        let applied = run_migrations(&mut conn, builtin())?;
        debug!(applied, path = ?database.path(), "Settings schema up to date");

        registry.close();
        let sink = registry.sink().clone();
        let legacy_path = config.legacy_config_path();

        let mut store = Self {
            config,
            favorites: KeyedCollection::new(sink.clone()),
            logins: KeyedCollection::new(sink.clone()),
            server_content: KeyedCollection::new(sink.clone()),
            engine_installations: KeyedCollection::new(sink.clone()),
            queue: PersistenceQueue::new(database, sink, runtime),
            registry,
        };

        match import_if_empty(&conn, &mut store, &legacy_path)? {
            ImportOutcome::AlreadyPopulated => store.load(&conn)?,
            outcome => debug!(?outcome, "Initialized empty settings store"),
        }

        store.ensure_fingerprint()?;
        store.commit();

        info!(
            favorites = store.favorites.len(),
            logins = store.logins.len(),
            "Settings store ready"
        );
        Ok(store)
    }

    /// Read stored rows into memory without queueing anything
    fn load(&mut self, conn: &Connection) -> DataResult<()> {
        self.registry.load(conn)?;
        self.favorites.load(tables::load_favorites(conn)?);
        self.logins.load(tables::load_logins(conn)?);
        self.server_content.load(tables::load_server_content(conn)?);
        self.engine_installations
            .load(tables::load_engine_installations(conn)?);

        if self.registry.contains(cvars::SELECTED_LOGIN.name()) {
            let selected = self.registry.get(&cvars::SELECTED_LOGIN)?;
            if !selected.is_nil() && !self.logins.contains_key(&selected) {
                warn!(user_id = %selected, "Stored selection refers to a missing login, clearing it");
                self.registry.set(&cvars::SELECTED_LOGIN, Uuid::nil())?;
            }
        }
        Ok(())
    }

    /// Replace a zero fingerprint with a fresh random one
    fn ensure_fingerprint(&mut self) -> DataResult<()> {
        if !self.registry.contains(cvars::FINGERPRINT.name()) {
            return Ok(());
        }
        if self.registry.get(&cvars::FINGERPRINT)?.is_nil() {
            let fingerprint = Uuid::new_v4();
            self.registry.set(&cvars::FINGERPRINT, fingerprint)?;
            info!(%fingerprint, "Generated installation fingerprint");
        }
        Ok(())
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // ==================== Variables ====================

    pub fn registry(&self) -> &CVarRegistry {
        &self.registry
    }

    pub fn get<T: CVarType>(&self, def: &CVarDef<T>) -> DataResult<T> {
        self.registry.get(def)
    }

    /// Observable handle to a variable
    pub fn entry<T: CVarType>(&self, def: &CVarDef<T>) -> DataResult<CVarEntry<'_, T>> {
        self.registry.entry(def)
    }

    /// Set a variable, returning whether the value changed
    ///
    /// Setting the selected login to an id we hold no login for fails with
    /// `DanglingSelectionReference` and changes nothing.
    pub fn set<T: CVarType>(&mut self, def: &CVarDef<T>, value: T) -> DataResult<bool> {
        let value = value.into_value();
        self.check_selection(def.name(), &value)?;
        self.registry.set_value(def.name(), value)
    }

    /// Set a variable by name from text, parsed as its declared type
    pub fn set_from_str(&mut self, name: &str, input: &str) -> DataResult<bool> {
        let value = self.registry.parse_value(name, input)?;
        self.check_selection(name, &value)?;
        self.registry.set_value(name, value)
    }

    pub fn value_by_name(&self, name: &str) -> Option<&CVarValue> {
        self.registry.value_by_name(name)
    }

    fn check_selection(&self, name: &str, value: &CVarValue) -> DataResult<()> {
        if name != cvars::SELECTED_LOGIN.name() {
            return Ok(());
        }
        match value {
            CVarValue::Guid(id) if !id.is_nil() && !self.logins.contains_key(id) => {
                Err(DataError::DanglingSelectionReference { user_id: *id })
            }
            _ => Ok(()),
        }
    }

    pub fn fingerprint(&self) -> DataResult<Uuid> {
        self.registry.get(&cvars::FINGERPRINT)
    }

    /// The selected login, if any
    pub fn selected_login_id(&self) -> Option<Uuid> {
        self.registry
            .get(&cvars::SELECTED_LOGIN)
            .ok()
            .filter(|id| !id.is_nil())
    }

    /// Select a login (or clear the selection) and commit
    pub fn set_selected_login_id(&mut self, user_id: Option<Uuid>) -> DataResult<()> {
        self.set(&cvars::SELECTED_LOGIN, user_id.unwrap_or_default())?;
        self.commit();
        Ok(())
    }

    /// Whether more than one login may be used; always true in debug builds
    pub fn actually_multi_accounts(&self) -> bool {
        cfg!(debug_assertions) || self.get(&cvars::MULTI_ACCOUNTS).unwrap_or(false)
    }

    /// Allocate the next installation id and commit the new counter
    ///
    /// Fails with `InstallationIdsExhausted` at `i32::MAX`; the counter is left as is.
    pub fn next_installation_id(&mut self) -> DataResult<i32> {
        let current = self.registry.get(&cvars::NEXT_INSTALLATION_ID)?;
        let id = current
            .checked_add(1)
            .ok_or(DataError::InstallationIdsExhausted { current })?;
        self.registry.set(&cvars::NEXT_INSTALLATION_ID, id)?;
        self.commit();
        Ok(id)
    }

    // ==================== Collections ====================

    pub fn favorites(&self) -> &KeyedCollection<FavoriteServer> {
        &self.favorites
    }

    pub fn favorites_mut(&mut self) -> &mut KeyedCollection<FavoriteServer> {
        &mut self.favorites
    }

    pub fn server_content(&self) -> &KeyedCollection<InstalledServerContent> {
        &self.server_content
    }

    pub fn server_content_mut(&mut self) -> &mut KeyedCollection<InstalledServerContent> {
        &mut self.server_content
    }

    pub fn engine_installations(&self) -> &KeyedCollection<InstalledEngineVersion> {
        &self.engine_installations
    }

    pub fn engine_installations_mut(&mut self) -> &mut KeyedCollection<InstalledEngineVersion> {
        &mut self.engine_installations
    }

    /// Logins are read-only here; mutate through the store so the selection stays valid
    pub fn logins(&self) -> &KeyedCollection<LoginInfo> {
        &self.logins
    }

    pub fn add_login(&mut self, login: LoginInfo) -> DataResult<()> {
        self.logins.add(login)
    }

    pub fn add_or_update_login(&mut self, login: LoginInfo) -> crate::collection::ChangeReason {
        self.logins.add_or_update(login)
    }

    /// Edit a stored login in place, e.g. to refresh its token
    pub fn modify_login(&mut self, user_id: &Uuid, f: impl FnOnce(&mut LoginInfo)) -> DataResult<bool> {
        self.logins.modify(user_id, f)
    }

    /// Remove a login, clearing the selection if it pointed at it
    pub fn remove_login(&mut self, user_id: &Uuid) -> DataResult<Option<LoginInfo>> {
        let removed = self.logins.remove_by_key(user_id);
        if removed.is_some() && self.selected_login_id() == Some(*user_id) {
            self.set_selected_login_id(None)?;
        }
        Ok(removed)
    }

    // ==================== Persistence ====================

    /// Flush everything queued so far in the background
    pub fn commit(&mut self) {
        self.queue.commit();
    }

    /// Commit and wait for every flush to reach disk
    ///
    /// Returns the final flush counters. Must not be called from inside the
    /// runtime that flushes, which must be a multi-thread runtime.
    pub fn close(mut self) -> FlushStats {
        self.queue.drain_and_wait();
        let stats = self.queue.stats();
        debug!(?stats, "Settings store closed");
        stats
    }

    pub fn flush_stats(&self) -> FlushStats {
        self.queue.stats()
    }

    /// Commands waiting for the next commit
    pub fn pending_commands(&self) -> usize {
        self.queue.pending()
    }

    pub(crate) fn enqueue(&self, cmd: DbCommand) {
        self.queue.enqueue(cmd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{Change, ChangeReason};
    use crate::models::LoginToken;
    use chrono::{TimeZone, Utc};
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;
    use tokio::runtime::Runtime;

    fn open(temp_dir: &TempDir, rt: &Runtime) -> DataStore {
        DataStore::open(Config::with_data_dir(temp_dir.path()), rt.handle().clone()).unwrap()
    }

    fn login(name: &str) -> LoginInfo {
        let expires = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        LoginInfo::new(Uuid::new_v4(), name, LoginToken::new("secret", expires))
    }

    fn favorite_rows(temp_dir: &TempDir) -> Vec<FavoriteServer> {
        let conn = Connection::open(temp_dir.path().join("settings.db")).unwrap();
        tables::load_favorites(&conn).unwrap()
    }

    #[test]
    fn test_first_open_marks_populated_and_sets_fingerprint() {
        let temp_dir = TempDir::new().unwrap();
        let rt = Runtime::new().unwrap();

        let store = open(&temp_dir, &rt);
        let fingerprint = store.fingerprint().unwrap();
        assert!(!fingerprint.is_nil());
        assert_eq!(store.pending_commands(), 0);
        store.close();

        let conn = Connection::open(temp_dir.path().join("settings.db")).unwrap();
        assert!(crate::storage::database::is_populated(&conn).unwrap());
    }

    #[test]
    fn test_collections_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let rt = Runtime::new().unwrap();

        let mut store = open(&temp_dir, &rt);
        let urist = login("urist");
        store.favorites_mut().add(FavoriteServer::new("a:1", "A")).unwrap();
        store.favorites_mut().add(FavoriteServer::new("b:1", "B")).unwrap();
        store.favorites_mut().remove_by_key(&"a:1".to_string());
        store.favorites_mut().add_or_update(FavoriteServer::new("c:1", "C"));
        store.add_login(urist.clone()).unwrap();
        store
            .engine_installations_mut()
            .add(InstalledEngineVersion::new("0.20.1", "deadbeef"))
            .unwrap();
        store
            .server_content_mut()
            .add(InstalledServerContent {
                fork_id: "wizden".to_string(),
                current_version: "abc".to_string(),
                current_hash: None,
                current_engine_version: "0.20.1".to_string(),
                disk_id: 3,
            })
            .unwrap();
        store.commit();

        let favorites: Vec<_> = store.favorites().iter().cloned().collect();
        store.close();

        let store = open(&temp_dir, &rt);
        let reloaded: Vec<_> = store.favorites().iter().cloned().collect();
        assert_eq!(reloaded, favorites);
        assert_eq!(store.logins().lookup(&urist.user_id), Some(&urist));
        assert_eq!(store.engine_installations().len(), 1);
        assert_eq!(
            store.server_content().lookup(&"wizden".to_string()).unwrap().disk_id,
            3
        );
        store.close();
    }

    #[test]
    fn test_set_get_and_noop_set() {
        let temp_dir = TempDir::new().unwrap();
        let rt = Runtime::new().unwrap();
        let mut store = open(&temp_dir, &rt);

        assert!(store.set(&cvars::LOG_CLIENT, true).unwrap());
        assert!(store.get(&cvars::LOG_CLIENT).unwrap());
        assert_eq!(store.pending_commands(), 1);

        assert!(!store.set(&cvars::LOG_CLIENT, true).unwrap());
        assert_eq!(store.pending_commands(), 1);
        store.close();

        let store = open(&temp_dir, &rt);
        assert!(store.get(&cvars::LOG_CLIENT).unwrap());
        store.close();
    }

    #[test]
    fn test_set_from_str() {
        let temp_dir = TempDir::new().unwrap();
        let rt = Runtime::new().unwrap();
        let mut store = open(&temp_dir, &rt);

        assert!(store.set_from_str("NextInstallationId", "41").unwrap());
        assert_eq!(store.value_by_name("NextInstallationId"), Some(&CVarValue::Int(41)));
        assert!(matches!(
            store.set_from_str("MultiAccounts", "maybe"),
            Err(DataError::InvalidValue { .. })
        ));
        assert!(matches!(
            store.set_from_str("SelectedLogin", &Uuid::new_v4().to_string()),
            Err(DataError::DanglingSelectionReference { .. })
        ));
        store.close();
    }

    #[test]
    fn test_removing_selected_login_clears_selection() {
        let temp_dir = TempDir::new().unwrap();
        let rt = Runtime::new().unwrap();
        let mut store = open(&temp_dir, &rt);

        let urist = login("urist");
        let other = login("other");
        store.add_login(urist.clone()).unwrap();
        store.add_login(other.clone()).unwrap();
        store.set_selected_login_id(Some(urist.user_id)).unwrap();

        store.remove_login(&other.user_id).unwrap();
        assert_eq!(store.selected_login_id(), Some(urist.user_id));

        store.remove_login(&urist.user_id).unwrap();
        assert_eq!(store.selected_login_id(), None);
        store.close();

        let store = open(&temp_dir, &rt);
        assert_eq!(store.selected_login_id(), None);
        assert!(store.logins().is_empty());
        store.close();
    }

    #[test]
    fn test_dangling_selection_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let rt = Runtime::new().unwrap();
        let mut store = open(&temp_dir, &rt);

        let urist = login("urist");
        store.add_login(urist.clone()).unwrap();
        store.set_selected_login_id(Some(urist.user_id)).unwrap();

        let err = store.set_selected_login_id(Some(Uuid::new_v4())).unwrap_err();
        assert!(matches!(err, DataError::DanglingSelectionReference { .. }));
        assert_eq!(store.selected_login_id(), Some(urist.user_id));
        store.close();
    }

    #[test]
    fn test_overlapping_commits_keep_one_writer() {
        let temp_dir = TempDir::new().unwrap();
        let rt = Runtime::new().unwrap();
        let mut store = open(&temp_dir, &rt);

        for i in 0..40 {
            store
                .favorites_mut()
                .add(FavoriteServer::new(format!("server{}:1212", i), "x"))
                .unwrap();
            store.commit();
        }
        let stats = store.close();
        assert_eq!(stats.peak_concurrent_flushes, 1);
        assert_eq!(stats.failed_batches, 0);
        assert!(stats.committed_batches >= 40);

        assert_eq!(favorite_rows(&temp_dir).len(), 40);
    }

    #[test]
    fn test_fingerprint_only_registry() {
        let temp_dir = TempDir::new().unwrap();
        let rt = Runtime::new().unwrap();
        let config = Config::with_data_dir(temp_dir.path());

        let mut registry = CVarRegistry::new();
        registry.register(cvars::FINGERPRINT).unwrap();
        let store =
            DataStore::open_with_registry(config.clone(), registry, rt.handle().clone()).unwrap();
        let fingerprint = store.fingerprint().unwrap();
        assert!(!fingerprint.is_nil());
        assert!(store.selected_login_id().is_none());
        store.close();

        let mut registry = CVarRegistry::new();
        registry.register(cvars::FINGERPRINT).unwrap();
        let store = DataStore::open_with_registry(config, registry, rt.handle().clone()).unwrap();
        assert_eq!(store.fingerprint().unwrap(), fingerprint);
        assert_eq!(store.pending_commands(), 0);
        store.close();
    }

    #[test]
    fn test_update_favorite_keeps_one_row() {
        let temp_dir = TempDir::new().unwrap();
        let rt = Runtime::new().unwrap();
        let mut store = open(&temp_dir, &rt);

        store
            .favorites_mut()
            .add(FavoriteServer::new("game.example:1212", "A"))
            .unwrap();
        store.commit();

        let reason = store
            .favorites_mut()
            .add_or_update(FavoriteServer::new("game.example:1212", "B"));
        assert_eq!(reason, ChangeReason::Update);
        let key = "game.example:1212".to_string();
        assert_eq!(
            store.favorites().lookup(&key).unwrap().name.as_deref(),
            Some("B")
        );
        store.close();

        let rows = favorite_rows(&temp_dir);
        assert_eq!(rows, vec![FavoriteServer::new("game.example:1212", "B")]);
    }

    #[test]
    fn test_legacy_import_runs_once() {
        let temp_dir = TempDir::new().unwrap();
        let rt = Runtime::new().unwrap();
        std::fs::write(
            temp_dir.path().join("launcher_config.json"),
            r#"{
                "favorites": [
                    {"address": "game.example:1212", "name": "A"},
                    {"address": "other.example:1212", "name": "B"}
                ],
                "multi_accounts": true,
                "fingerprint": "3f0a9b6e-55c2-4f7e-8f0e-7d5b2a1c9e44"
            }"#,
        )
        .unwrap();

        let mut store = open(&temp_dir, &rt);
        assert_eq!(store.favorites().len(), 2);
        assert!(store.get(&cvars::MULTI_ACCOUNTS).unwrap());
        assert_eq!(
            store.fingerprint().unwrap().to_string(),
            "3f0a9b6e-55c2-4f7e-8f0e-7d5b2a1c9e44"
        );
        store.favorites_mut().remove_by_key(&"other.example:1212".to_string());
        store.close();

        // The legacy file is still there; a second open must not re-import it.
        let store = open(&temp_dir, &rt);
        assert_eq!(store.favorites().len(), 1);
        assert!(store.get(&cvars::MULTI_ACCOUNTS).unwrap());
        store.close();
    }

    #[test]
    fn test_legacy_selected_login_is_imported() {
        let temp_dir = TempDir::new().unwrap();
        let rt = Runtime::new().unwrap();
        let user_id = "5b1d2c9a-8a6e-4c1b-9f1e-3e2f0d4c7a11";
        std::fs::write(
            temp_dir.path().join("launcher_config.json"),
            format!(
                r#"{{
                    "selected_login": "{user_id}",
                    "logins": [{{
                        "user_id": "{user_id}",
                        "username": "urist",
                        "token": {{"token": "abc", "expire_time": "2030-01-01T00:00:00Z"}}
                    }}]
                }}"#
            ),
        )
        .unwrap();

        let store = open(&temp_dir, &rt);
        assert_eq!(
            store.selected_login_id().map(|id| id.to_string()).as_deref(),
            Some(user_id)
        );
        store.close();
    }

    #[test]
    fn test_next_installation_id_persists() {
        let temp_dir = TempDir::new().unwrap();
        let rt = Runtime::new().unwrap();

        let mut store = open(&temp_dir, &rt);
        assert_eq!(store.next_installation_id().unwrap(), 2);
        assert_eq!(store.next_installation_id().unwrap(), 3);
        store.close();

        let mut store = open(&temp_dir, &rt);
        assert_eq!(store.next_installation_id().unwrap(), 4);
        store.close();
    }

    #[test]
    fn test_next_installation_id_stops_at_max() {
        let temp_dir = TempDir::new().unwrap();
        let rt = Runtime::new().unwrap();
        let mut store = open(&temp_dir, &rt);

        store.set_from_str("NextInstallationId", "2147483646").unwrap();
        assert_eq!(store.next_installation_id().unwrap(), i32::MAX);

        let err = store.next_installation_id().unwrap_err();
        assert!(matches!(
            err,
            DataError::InstallationIdsExhausted { current: i32::MAX }
        ));
        assert_eq!(store.get(&cvars::NEXT_INSTALLATION_ID).unwrap(), i32::MAX);
        store.close();

        let store = open(&temp_dir, &rt);
        assert_eq!(store.get(&cvars::NEXT_INSTALLATION_ID).unwrap(), i32::MAX);
        store.close();
    }

    #[test]
    fn test_login_expiry_survives_reopen_exactly() {
        let temp_dir = TempDir::new().unwrap();
        let rt = Runtime::new().unwrap();

        let mut store = open(&temp_dir, &rt);
        let expires = Utc::now() + chrono::Duration::days(30);
        store
            .add_login(LoginInfo::new(
                Uuid::new_v4(),
                "urist",
                LoginToken::new("secret", expires),
            ))
            .unwrap();
        let before: Vec<_> = store.logins().iter().cloned().collect();
        store.close();

        let store = open(&temp_dir, &rt);
        let after: Vec<_> = store.logins().iter().cloned().collect();
        assert_eq!(after, before);
        assert_eq!(after[0].token.expire_time, expires);
        store.close();
    }

    #[test]
    fn test_stored_dangling_selection_is_cleared_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let rt = Runtime::new().unwrap();
        open(&temp_dir, &rt).close();

        let missing = Uuid::new_v4();
        let conn = Connection::open(temp_dir.path().join("settings.db")).unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO Config (Key, Value) VALUES ('SelectedLogin', ?1)",
            [missing.to_string()],
        )
        .unwrap();
        drop(conn);

        let store = open(&temp_dir, &rt);
        assert_eq!(store.selected_login_id(), None);
        store.close();

        let store = open(&temp_dir, &rt);
        assert_eq!(store.selected_login_id(), None);
        store.close();
    }

    #[test]
    fn test_collection_observers_see_changes() {
        let temp_dir = TempDir::new().unwrap();
        let rt = Runtime::new().unwrap();
        let mut store = open(&temp_dir, &rt);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        store
            .logins()
            .subscribe(move |change: &Change<LoginInfo>| s.borrow_mut().push(change.reason));

        let urist = login("urist");
        store.add_login(urist.clone()).unwrap();
        store
            .modify_login(&urist.user_id, |l| l.token.token = "refreshed".to_string())
            .unwrap();
        store.remove_login(&urist.user_id).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![ChangeReason::Add, ChangeReason::Update, ChangeReason::Remove]
        );
        store.close();
    }

    #[test]
    fn test_migration_failure_aborts_open() {
        let temp_dir = TempDir::new().unwrap();
        let rt = Runtime::new().unwrap();

        // Login already has the column 0004 adds.
        let conn = Connection::open(temp_dir.path().join("settings.db")).unwrap();
        conn.execute_batch(
            "CREATE TABLE Login (UserId TEXT PRIMARY KEY, UserName TEXT, Token TEXT, Expires INTEGER, Server TEXT);",
        )
        .unwrap();
        drop(conn);

        let result = DataStore::open(Config::with_data_dir(temp_dir.path()), rt.handle().clone());
        match result {
            Err(DataError::MigrationFailed { script, .. }) => assert_eq!(script, "0004_login_server"),
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(_) => panic!("open should fail"),
        }
    }
}
