//! Typed configuration variables
//!
//! A variable ("CVar") is a named scalar with a declared type and a default.
//! The set of value types is closed: string, bool, int32 and guid. Each
//! definition carries its type as a parameter, so `get`/`set` through a
//! `CVarDef<T>` are checked at compile time; the registry only has to
//! confirm that the definition it was handed is the one it registered.
//!
//! The launcher's own variables are declared in [`cvars`].

use std::fmt;

use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use serde::Serialize;
use uuid::Uuid;

/// The value type a variable is declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CVarKind {
    String,
    Bool,
    Int,
    Guid,
}

impl fmt::Display for CVarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CVarKind::String => "string",
            CVarKind::Bool => "bool",
            CVarKind::Int => "int32",
            CVarKind::Guid => "guid",
        })
    }
}

/// A variable value with its type erased
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CVarValue {
    String(String),
    Bool(bool),
    Int(i32),
    Guid(Uuid),
}

impl CVarValue {
    pub fn kind(&self) -> CVarKind {
        match self {
            CVarValue::String(_) => CVarKind::String,
            CVarValue::Bool(_) => CVarKind::Bool,
            CVarValue::Int(_) => CVarKind::Int,
            CVarValue::Guid(_) => CVarKind::Guid,
        }
    }

    /// Parse user-provided text as a value of the given kind
    ///
    /// Booleans accept `true`/`false`, `1`/`0` and `yes`/`no`. An empty
    /// string is the zero guid.
    pub fn parse(kind: CVarKind, input: &str) -> Option<Self> {
        let trimmed = input.trim();
        match kind {
            CVarKind::String => Some(CVarValue::String(input.to_string())),
            CVarKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(CVarValue::Bool(true)),
                "false" | "0" | "no" => Some(CVarValue::Bool(false)),
                _ => None,
            },
            CVarKind::Int => trimmed.parse().ok().map(CVarValue::Int),
            CVarKind::Guid if trimmed.is_empty() => Some(CVarValue::Guid(Uuid::nil())),
            CVarKind::Guid => Uuid::parse_str(trimmed).ok().map(CVarValue::Guid),
        }
    }

    /// Read a stored `Config.Value` cell as the given kind
    ///
    /// Returns `None` if the stored cell cannot represent that kind.
    pub(crate) fn from_sql(kind: CVarKind, value: ValueRef<'_>) -> Option<Self> {
        match (kind, value) {
            (CVarKind::String, ValueRef::Text(t)) => {
                std::str::from_utf8(t).ok().map(|s| CVarValue::String(s.to_string()))
            }
            (CVarKind::Bool, ValueRef::Integer(i)) => Some(CVarValue::Bool(i != 0)),
            (CVarKind::Int, ValueRef::Integer(i)) => i32::try_from(i).ok().map(CVarValue::Int),
            (CVarKind::Bool | CVarKind::Int | CVarKind::Guid, ValueRef::Text(t)) => {
                std::str::from_utf8(t).ok().and_then(|s| Self::parse(kind, s))
            }
            _ => None,
        }
    }
}

impl fmt::Display for CVarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CVarValue::String(s) => f.write_str(s),
            CVarValue::Bool(b) => write!(f, "{}", b),
            CVarValue::Int(i) => write!(f, "{}", i),
            CVarValue::Guid(g) if g.is_nil() => Ok(()),
            CVarValue::Guid(g) => write!(f, "{}", g),
        }
    }
}

impl ToSql for CVarValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CVarValue::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            CVarValue::Bool(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            CVarValue::Int(i) => ToSqlOutput::Owned(Value::Integer(i64::from(*i))),
            CVarValue::Guid(g) => ToSqlOutput::Owned(Value::Text(g.to_string())),
        })
    }
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for String {}
    impl Sealed for bool {}
    impl Sealed for i32 {}
    impl Sealed for uuid::Uuid {}
}

/// A Rust type that can be stored in a variable
///
/// Implemented for `String`, `bool`, `i32` and `Uuid` only.
pub trait CVarType: sealed::Sealed + Clone + PartialEq + fmt::Debug + 'static {
    /// Form the default takes inside a `const` definition
    type Const: Copy + fmt::Debug + 'static;

    const KIND: CVarKind;

    fn from_const(value: Self::Const) -> Self;

    fn into_value(self) -> CVarValue;

    fn from_value(value: &CVarValue) -> Option<Self>;
}

impl CVarType for String {
    type Const = &'static str;
    const KIND: CVarKind = CVarKind::String;

    fn from_const(value: &'static str) -> Self {
        value.to_string()
    }

    fn into_value(self) -> CVarValue {
        CVarValue::String(self)
    }

    fn from_value(value: &CVarValue) -> Option<Self> {
        match value {
            CVarValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl CVarType for bool {
    type Const = bool;
    const KIND: CVarKind = CVarKind::Bool;

    fn from_const(value: bool) -> Self {
        value
    }

    fn into_value(self) -> CVarValue {
        CVarValue::Bool(self)
    }

    fn from_value(value: &CVarValue) -> Option<Self> {
        match value {
            CVarValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl CVarType for i32 {
    type Const = i32;
    const KIND: CVarKind = CVarKind::Int;

    fn from_const(value: i32) -> Self {
        value
    }

    fn into_value(self) -> CVarValue {
        CVarValue::Int(self)
    }

    fn from_value(value: &CVarValue) -> Option<Self> {
        match value {
            CVarValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl CVarType for Uuid {
    type Const = Uuid;
    const KIND: CVarKind = CVarKind::Guid;

    fn from_const(value: Uuid) -> Self {
        value
    }

    fn into_value(self) -> CVarValue {
        CVarValue::Guid(self)
    }

    fn from_value(value: &CVarValue) -> Option<Self> {
        match value {
            CVarValue::Guid(g) => Some(*g),
            _ => None,
        }
    }
}

/// Declaration of a typed variable
pub struct CVarDef<T: CVarType> {
    name: &'static str,
    default: T::Const,
}

impl<T: CVarType> CVarDef<T> {
    pub const fn new(name: &'static str, default: T::Const) -> Self {
        Self { name, default }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn default_value(&self) -> T {
        T::from_const(self.default)
    }

    /// Erase the value type for storage in the registry
    pub fn definition(&self) -> Definition {
        Definition {
            name: self.name,
            kind: T::KIND,
            default: self.default_value().into_value(),
        }
    }
}

impl<T: CVarType> Clone for CVarDef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: CVarType> Copy for CVarDef<T> {}

impl<T: CVarType> fmt::Debug for CVarDef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CVarDef")
            .field("name", &self.name)
            .field("kind", &T::KIND)
            .field("default", &self.default)
            .finish()
    }
}

/// A variable definition with its type erased
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub name: &'static str,
    pub kind: CVarKind,
    pub default: CVarValue,
}

impl<T: CVarType> From<CVarDef<T>> for Definition {
    fn from(def: CVarDef<T>) -> Self {
        def.definition()
    }
}

impl<T: CVarType> From<&CVarDef<T>> for Definition {
    fn from(def: &CVarDef<T>) -> Self {
        def.definition()
    }
}

/// Variables used by the launcher
pub mod cvars {
    use super::{CVarDef, Definition};
    use uuid::Uuid;

    /// Force the client into its compatibility renderer
    pub const COMPAT_MODE: CVarDef<bool> = CVarDef::new("CompatMode", false);

    /// Enable dynamic profile-guided optimization for the client runtime
    pub const DYNAMIC_PGO: CVarDef<bool> = CVarDef::new("DynamicPgo", true);

    /// Skip signature checks on downloaded engine builds
    pub const DISABLE_SIGNING: CVarDef<bool> = CVarDef::new("DisableSigning", false);

    pub const LOG_CLIENT: CVarDef<bool> = CVarDef::new("LogClient", false);

    pub const LOG_LAUNCHER: CVarDef<bool> = CVarDef::new("LogLauncher", false);

    /// Allow more than one login to be stored
    pub const MULTI_ACCOUNTS: CVarDef<bool> = CVarDef::new("MultiAccounts", false);

    pub const HAS_DISMISSED_EARLY_ACCESS_WARNING: CVarDef<bool> =
        CVarDef::new("HasDismissedEarlyAccessWarning", false);

    /// Next id handed out for a server content installation
    pub const NEXT_INSTALLATION_ID: CVarDef<i32> = CVarDef::new("NextInstallationId", 1);

    /// Stable random identifier of this installation. Zero until generated.
    pub const FINGERPRINT: CVarDef<Uuid> = CVarDef::new("Fingerprint", Uuid::nil());

    /// User id of the active login. Zero means no login is selected.
    pub const SELECTED_LOGIN: CVarDef<Uuid> = CVarDef::new("SelectedLogin", Uuid::nil());

    /// Every built-in definition, in registration order
    pub fn all() -> Vec<Definition> {
        vec![
            COMPAT_MODE.definition(),
            DYNAMIC_PGO.definition(),
            DISABLE_SIGNING.definition(),
            LOG_CLIENT.definition(),
            LOG_LAUNCHER.definition(),
            MULTI_ACCOUNTS.definition(),
            HAS_DISMISSED_EARLY_ACCESS_WARNING.definition(),
            NEXT_INSTALLATION_ID.definition(),
            FINGERPRINT.definition(),
            SELECTED_LOGIN.definition(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_forms() {
        assert_eq!(CVarValue::parse(CVarKind::Bool, "TRUE"), Some(CVarValue::Bool(true)));
        assert_eq!(CVarValue::parse(CVarKind::Bool, "0"), Some(CVarValue::Bool(false)));
        assert_eq!(CVarValue::parse(CVarKind::Bool, "no"), Some(CVarValue::Bool(false)));
        assert_eq!(CVarValue::parse(CVarKind::Bool, "maybe"), None);
    }

    #[test]
    fn test_parse_int_and_guid() {
        assert_eq!(CVarValue::parse(CVarKind::Int, " 42 "), Some(CVarValue::Int(42)));
        assert_eq!(CVarValue::parse(CVarKind::Int, "4000000000"), None);

        assert_eq!(
            CVarValue::parse(CVarKind::Guid, ""),
            Some(CVarValue::Guid(Uuid::nil()))
        );
        let id = Uuid::new_v4();
        assert_eq!(
            CVarValue::parse(CVarKind::Guid, &id.to_string()),
            Some(CVarValue::Guid(id))
        );
        assert_eq!(CVarValue::parse(CVarKind::Guid, "not-a-guid"), None);
    }

    #[test]
    fn test_from_sql_cells() {
        assert_eq!(
            CVarValue::from_sql(CVarKind::Bool, ValueRef::Integer(1)),
            Some(CVarValue::Bool(true))
        );
        assert_eq!(
            CVarValue::from_sql(CVarKind::Int, ValueRef::Integer(i64::MAX)),
            None
        );
        assert_eq!(
            CVarValue::from_sql(CVarKind::Guid, ValueRef::Text(b"")),
            Some(CVarValue::Guid(Uuid::nil()))
        );
        assert_eq!(CVarValue::from_sql(CVarKind::String, ValueRef::Null), None);
    }

    #[test]
    fn test_definition_erases_type() {
        let def = cvars::NEXT_INSTALLATION_ID.definition();
        assert_eq!(def.name, "NextInstallationId");
        assert_eq!(def.kind, CVarKind::Int);
        assert_eq!(def.default, CVarValue::Int(1));

        const MOTD: CVarDef<String> = CVarDef::new("Motd", "hello");
        assert_eq!(MOTD.default_value(), "hello".to_string());
        assert_eq!(Definition::from(MOTD).kind, CVarKind::String);
    }

    #[test]
    fn test_builtin_names_unique() {
        let all = cvars::all();
        let mut names: Vec<_> = all.iter().map(|d| d.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), all.len());
    }

    #[test]
    fn test_nil_guid_displays_empty() {
        assert_eq!(CVarValue::Guid(Uuid::nil()).to_string(), "");
    }
}
