//! Storage layer
//!
//! Everything that touches SQLite lives here.
//!
//! ## Architecture
//!
//! - **migrations**: versioned schema scripts, applied once each at startup
//! - **tables**: row mapping for the four collection tables
//! - **command**: the queued write operations and how each one is applied
//! - **queue**: batches commands and flushes them off the owner thread
//!
//! In-memory state is authoritative while the process runs; the database
//! only catches up when a batch is committed.

pub mod command;
pub mod database;
pub mod migrations;
pub mod queue;
pub mod tables;

pub use command::{DbCommand, POPULATED_KEY};
pub use database::{is_populated, Database};
pub use migrations::{builtin, run_migrations, schema_version, Migration, SCHEMA_VERSION};
pub use queue::{CommandSink, FlushStats, PersistenceQueue};
