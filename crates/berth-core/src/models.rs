//! Data models for Berth
//!
//! Elements of the four keyed collections. Field names in the serialized
//! form match the legacy `launcher_config.json` layout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A server the user has marked as a favorite
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FavoriteServer {
    /// Server address, unique within the favorites
    pub address: String,
    /// Display name chosen by the user
    #[serde(default)]
    pub name: Option<String>,
}

impl FavoriteServer {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: Some(name.into()),
        }
    }

    /// Set the display name
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }
}

/// Session token issued by an auth server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginToken {
    pub token: String,
    pub expire_time: DateTime<Utc>,
}

impl LoginToken {
    pub fn new(token: impl Into<String>, expire_time: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expire_time,
        }
    }

    /// Whether the token has expired as of `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_time <= now
    }
}

/// A cached account login
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginInfo {
    pub user_id: Uuid,
    pub username: String,
    pub token: LoginToken,
    /// Auth server the login belongs to, if not the default one
    #[serde(default)]
    pub server: Option<String>,
}

impl LoginInfo {
    pub fn new(user_id: Uuid, username: impl Into<String>, token: LoginToken) -> Self {
        Self {
            user_id,
            username: username.into(),
            token,
            server: None,
        }
    }
}

/// Server content currently installed for one fork
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstalledServerContent {
    pub fork_id: String,
    pub current_version: String,
    #[serde(default)]
    pub current_hash: Option<String>,
    pub current_engine_version: String,
    /// Id of the on-disk content directory
    pub disk_id: i64,
}

/// An engine build downloaded by the launcher
///
/// Immutable once installed; replaced by removing and adding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstalledEngineVersion {
    pub version: String,
    /// Hex-encoded signature of the build
    pub signature: String,
}

impl InstalledEngineVersion {
    pub fn new(version: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            signature: signature.into(),
        }
    }
}
