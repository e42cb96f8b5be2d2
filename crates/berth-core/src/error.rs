//! Error handling
//!
//! One typed error for every operation the store exposes. Programming
//! errors (duplicate definitions, wrong variable types) and storage errors
//! during startup are fatal; duplicate keys, dangling selections and bad
//! user input are returned for the host to render.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::cvar::CVarKind;

/// Errors that can occur while loading, mutating or flushing the store
#[derive(Error, Debug)]
pub enum DataError {
    /// A variable with this name has already been registered
    #[error("Variable '{name}' is already registered")]
    DuplicateDefinition { name: &'static str },

    /// Registration attempted after the registry was loaded
    #[error("Cannot register variable '{name}': the registry is closed after load")]
    RegistryClosed { name: &'static str },

    /// Access to a variable that is not registered, or with the wrong type
    #[error("Variable '{name}' is unknown or of another type (expected {expected:?}, registered as {actual:?})")]
    UnknownOrMismatchedVariable {
        name: String,
        expected: Option<CVarKind>,
        actual: Option<CVarKind>,
    },

    /// Text input could not be parsed into the variable's declared type
    #[error("'{input}' is not a valid {kind} value for '{name}'")]
    InvalidValue {
        name: String,
        kind: CVarKind,
        input: String,
    },

    /// An element with this key is already present in the collection
    #[error("{collection} already contains an entry for '{key}'")]
    DuplicateKey {
        collection: &'static str,
        key: String,
    },

    /// An in-place edit tried to change an element's key
    #[error("{collection}: editing '{key}' must not change its key")]
    KeyMutation {
        collection: &'static str,
        key: String,
    },

    /// The selected login must refer to a login we hold
    #[error("Cannot select login {user_id}: no such login is stored")]
    DanglingSelectionReference { user_id: uuid::Uuid },

    /// The installation id counter is at its maximum
    #[error("No installation ids left: NextInstallationId is already {current}")]
    InstallationIdsExhausted { current: i32 },

    /// A schema migration script failed; the store is unusable this run
    #[error("Migration '{script}' failed: {source}")]
    MigrationFailed {
        script: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A committed batch could not be written and was dropped
    #[error("Failed to flush {commands} queued commands: {source}")]
    FlushFailed {
        commands: usize,
        #[source]
        source: rusqlite::Error,
    },

    /// The legacy snapshot exists but cannot be parsed
    #[error("Invalid legacy config in '{path}': {source}")]
    LegacyParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to read a file (legacy snapshot, data directory)
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DataError {
    /// Whether this error means the store cannot be used for the rest of the process
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DataError::MigrationFailed { .. }
                | DataError::LegacyParse { .. }
                | DataError::ReadError { .. }
                | DataError::Database(_)
                | DataError::Io(_)
                | DataError::DuplicateDefinition { .. }
                | DataError::RegistryClosed { .. }
        )
    }

    /// Get a suggestion the host can show next to the error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            DataError::DuplicateKey { .. } => Some("Remove the existing entry first or edit it instead."),
            DataError::DanglingSelectionReference { .. } => {
                Some("Log in with that account before selecting it.")
            }
            DataError::InvalidValue { .. } => Some("Run `berth vars` to see each variable's type."),
            DataError::MigrationFailed { .. } => Some(
                "The settings database could not be upgraded. Move settings.db aside to start fresh.",
            ),
            DataError::LegacyParse { .. } => {
                Some("Fix or remove launcher_config.json to skip the one-time import.")
            }
            DataError::InstallationIdsExhausted { .. } => {
                Some("Set NextInstallationId to a value above every id in use.")
            }
            _ => None,
        }
    }
}

/// Result type for store operations
pub type DataResult<T> = Result<T, DataError>;
