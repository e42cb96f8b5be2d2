//! Berth Core Library
//!
//! This crate provides the settings store for the Berth game launcher:
//! typed configuration variables and four keyed collections (favorite
//! servers, logins, installed server content, installed engine versions),
//! kept in memory and persisted to SQLite in the background.
//!
//! # Architecture
//!
//! - **In-memory state** is authoritative while the process runs. Every
//!   mutation queues a write command before observers are notified.
//! - **SQLite** receives queued commands in batches, one transaction per
//!   commit, never more than one transaction at a time.
//!
//! # Quick Start
//!
//! ```text
//! let runtime = tokio::runtime::Runtime::new()?;
//! let mut store = DataStore::open(Config::load()?, runtime.handle().clone())?;
//!
//! store.favorites_mut().add(FavoriteServer::new("game.example:1212", "A"))?;
//! store.set(&cvars::MULTI_ACCOUNTS, true)?;
//! store.commit();
//!
//! // At shutdown
//! store.close();
//! ```
//!
//! # Modules
//!
//! - `store`: Unified settings interface (main entry point)
//! - `cvar`: Variable definitions and the built-in catalogue
//! - `registry`: Typed variable registry
//! - `collection`: Keyed reactive collections
//! - `models`: Collection element types
//! - `legacy`: One-time import of `launcher_config.json`
//! - `storage`: Migrations, row mapping and the write-behind queue
//! - `config`: Application configuration

pub mod collection;
pub mod config;
pub mod cvar;
pub mod error;
pub mod legacy;
pub mod models;
pub mod observer;
pub mod registry;
pub mod storage;
pub mod store;

pub use collection::{Change, ChangeReason, KeyedCollection, Record};
pub use config::Config;
pub use cvar::{cvars, CVarDef, CVarKind, CVarType, CVarValue, Definition};
pub use error::{DataError, DataResult};
pub use legacy::{ImportCounts, ImportOutcome, LegacySnapshot};
pub use models::{FavoriteServer, InstalledEngineVersion, InstalledServerContent, LoginInfo, LoginToken};
pub use observer::SubscriptionId;
pub use registry::{CVarEntry, CVarRegistry};
pub use storage::{FlushStats, Migration, SCHEMA_VERSION};
pub use store::DataStore;
