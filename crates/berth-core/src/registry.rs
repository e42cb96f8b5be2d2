//! Typed variable registry
//!
//! Holds one entry per registered definition. Definitions are registered up
//! front; once the registry is loaded (or explicitly closed) no more can be
//! added. Loading reads stored values without queueing writes; `set` queues
//! an upsert only when the value actually changes.

use std::collections::HashMap;
use std::marker::PhantomData;

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::cvar::{cvars, CVarDef, CVarKind, CVarType, CVarValue, Definition};
use crate::error::{DataError, DataResult};
use crate::observer::{Observers, SubscriptionId};
use crate::storage::command::DbCommand;
use crate::storage::queue::CommandSink;

struct Entry {
    def: Definition,
    value: CVarValue,
    observers: Observers<CVarValue>,
}

pub struct CVarRegistry {
    entries: HashMap<&'static str, Entry>,
    order: Vec<&'static str>,
    closed: bool,
    sink: CommandSink,
}

impl CVarRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
            closed: false,
            sink: CommandSink::new(),
        }
    }

    /// Create a registry holding every built-in launcher variable
    pub fn with_builtin() -> DataResult<Self> {
        let mut registry = Self::new();
        for def in cvars::all() {
            registry.register(def)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, def: impl Into<Definition>) -> DataResult<()> {
        let def = def.into();
        if self.closed {
            return Err(DataError::RegistryClosed { name: def.name });
        }
        if self.entries.contains_key(def.name) {
            return Err(DataError::DuplicateDefinition { name: def.name });
        }

        self.order.push(def.name);
        self.entries.insert(
            def.name,
            Entry {
                value: def.default.clone(),
                def,
                observers: Observers::new(),
            },
        );
        Ok(())
    }

    /// Stop accepting registrations
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered definitions in registration order
    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.order.iter().filter_map(|name| self.entries.get(name).map(|e| &e.def))
    }

    /// Read stored values from the `Config` table and close the registry
    ///
    /// Unknown keys are skipped. Returns how many values were applied.
    pub fn load(&mut self, conn: &Connection) -> DataResult<usize> {
        self.close();

        let mut stmt = conn.prepare("SELECT Key, Value FROM Config")?;
        let mut rows = stmt.query([])?;
        let mut loaded = 0;

        while let Some(row) = rows.next()? {
            let key: String = row.get(0)?;
            let Some(entry) = self.entries.get_mut(key.as_str()) else {
                continue;
            };

            match CVarValue::from_sql(entry.def.kind, row.get_ref(1)?) {
                Some(value) => {
                    entry.value = value;
                    loaded += 1;
                }
                None => warn!(
                    key = %key,
                    kind = %entry.def.kind,
                    "Ignoring stored value that does not match the variable type"
                ),
            }
        }

        debug!(loaded, "Loaded config variables");
        Ok(loaded)
    }

    pub fn get<T: CVarType>(&self, def: &CVarDef<T>) -> DataResult<T> {
        let entry = self.checked(def.name(), T::KIND)?;
        Ok(T::from_value(&entry.value).unwrap_or_else(|| def.default_value()))
    }

    /// Observable handle to a variable
    pub fn entry<T: CVarType>(&self, def: &CVarDef<T>) -> DataResult<CVarEntry<'_, T>> {
        let entry = self.checked(def.name(), T::KIND)?;
        Ok(CVarEntry {
            entry,
            def: *def,
            _type: PhantomData,
        })
    }

    /// Set a variable, returning whether the value changed
    pub fn set<T: CVarType>(&mut self, def: &CVarDef<T>, value: T) -> DataResult<bool> {
        self.set_value(def.name(), value.into_value())
    }

    /// Current value by name, for untyped consumers
    pub fn value_by_name(&self, name: &str) -> Option<&CVarValue> {
        self.entries.get(name).map(|e| &e.value)
    }

    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.entries.get(name).map(|e| &e.def)
    }

    /// Parse `input` as the variable's declared type
    pub fn parse_value(&self, name: &str, input: &str) -> DataResult<CVarValue> {
        let def = self
            .definition(name)
            .ok_or_else(|| DataError::UnknownOrMismatchedVariable {
                name: name.to_string(),
                expected: None,
                actual: None,
            })?;

        CVarValue::parse(def.kind, input).ok_or_else(|| DataError::InvalidValue {
            name: name.to_string(),
            kind: def.kind,
            input: input.to_string(),
        })
    }

    /// Set a variable from an untyped value whose kind must match
    pub fn set_value(&mut self, name: &str, value: CVarValue) -> DataResult<bool> {
        let kind = value.kind();
        self.checked(name, kind)?;
        let Some(entry) = self.entries.get_mut(name) else {
            return Ok(false);
        };

        if entry.value == value {
            return Ok(false);
        }

        entry.value = value.clone();
        self.sink.push(DbCommand::SetConfig {
            key: entry.def.name.to_string(),
            value,
        });
        entry.observers.notify(&entry.value);
        Ok(true)
    }

    pub(crate) fn sink(&self) -> &CommandSink {
        &self.sink
    }

    fn checked(&self, name: &str, kind: CVarKind) -> DataResult<&Entry> {
        match self.entries.get(name) {
            Some(entry) if entry.def.kind == kind => Ok(entry),
            other => Err(DataError::UnknownOrMismatchedVariable {
                name: name.to_string(),
                expected: Some(kind),
                actual: other.map(|e| e.def.kind),
            }),
        }
    }
}

impl Default for CVarRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Read and observe access to one variable
pub struct CVarEntry<'a, T: CVarType> {
    entry: &'a Entry,
    def: CVarDef<T>,
    _type: PhantomData<T>,
}

impl<T: CVarType> CVarEntry<'_, T> {
    pub fn name(&self) -> &'static str {
        self.def.name()
    }

    pub fn value(&self) -> T {
        T::from_value(&self.entry.value).unwrap_or_else(|| self.def.default_value())
    }

    /// Call `callback` with the new value whenever it changes
    pub fn subscribe(&self, mut callback: impl FnMut(&T) + 'static) -> SubscriptionId {
        self.entry.observers.subscribe(move |value: &CVarValue| {
            if let Some(value) = T::from_value(value) {
                callback(&value);
            }
        })
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.entry.observers.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::migrations::{builtin, run_migrations};
    use std::cell::RefCell;
    use std::rc::Rc;
    use uuid::Uuid;

    fn migrated() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn, builtin()).unwrap();
        conn
    }

    #[test]
    fn test_duplicate_definition() {
        let mut registry = CVarRegistry::new();
        registry.register(cvars::LOG_CLIENT).unwrap();

        let err = registry.register(cvars::LOG_CLIENT).unwrap_err();
        assert!(matches!(err, DataError::DuplicateDefinition { name: "LogClient" }));
    }

    #[test]
    fn test_no_registration_after_load() {
        let conn = migrated();
        let mut registry = CVarRegistry::new();
        registry.load(&conn).unwrap();

        let err = registry.register(cvars::LOG_CLIENT).unwrap_err();
        assert!(matches!(err, DataError::RegistryClosed { .. }));
    }

    #[test]
    fn test_get_defaults_and_set() {
        let mut registry = CVarRegistry::with_builtin().unwrap();
        assert!(registry.get(&cvars::DYNAMIC_PGO).unwrap());
        assert_eq!(registry.get(&cvars::NEXT_INSTALLATION_ID).unwrap(), 1);

        assert!(registry.set(&cvars::NEXT_INSTALLATION_ID, 5).unwrap());
        assert_eq!(registry.get(&cvars::NEXT_INSTALLATION_ID).unwrap(), 5);
    }

    #[test]
    fn test_set_same_value_queues_nothing() {
        let mut registry = CVarRegistry::with_builtin().unwrap();

        assert!(!registry.set(&cvars::LOG_LAUNCHER, false).unwrap());
        assert!(registry.sink().is_empty());

        assert!(registry.set(&cvars::LOG_LAUNCHER, true).unwrap());
        assert!(!registry.set(&cvars::LOG_LAUNCHER, true).unwrap());
        assert_eq!(
            registry.sink().pending(),
            vec![DbCommand::SetConfig {
                key: "LogLauncher".to_string(),
                value: CVarValue::Bool(true),
            }]
        );
    }

    #[test]
    fn test_unregistered_or_mismatched() {
        let mut registry = CVarRegistry::new();
        registry.register(cvars::FINGERPRINT).unwrap();

        let err = registry.get(&cvars::MULTI_ACCOUNTS).unwrap_err();
        assert!(matches!(
            err,
            DataError::UnknownOrMismatchedVariable { actual: None, .. }
        ));

        const WRONG: CVarDef<bool> = CVarDef::new("Fingerprint", false);
        let err = registry.set(&WRONG, true).unwrap_err();
        assert!(matches!(
            err,
            DataError::UnknownOrMismatchedVariable {
                actual: Some(CVarKind::Guid),
                ..
            }
        ));
    }

    #[test]
    fn test_load_is_not_a_mutation() {
        let conn = migrated();
        conn.execute_batch(
            r#"
            INSERT INTO Config VALUES ('MultiAccounts', 1);
            INSERT INTO Config VALUES ('NextInstallationId', 12);
            INSERT INTO Config VALUES ('Populated', 1);
            INSERT INTO Config VALUES ('SomeFutureVariable', 'x');
            INSERT INTO Config VALUES ('LogClient', 'not a bool');
            "#,
        )
        .unwrap();

        let mut registry = CVarRegistry::with_builtin().unwrap();
        let changes = Rc::new(RefCell::new(0));
        let c = changes.clone();
        registry
            .entry(&cvars::MULTI_ACCOUNTS)
            .unwrap()
            .subscribe(move |_| *c.borrow_mut() += 1);

        assert_eq!(registry.load(&conn).unwrap(), 2);
        assert!(registry.get(&cvars::MULTI_ACCOUNTS).unwrap());
        assert_eq!(registry.get(&cvars::NEXT_INSTALLATION_ID).unwrap(), 12);
        assert!(!registry.get(&cvars::LOG_CLIENT).unwrap());
        assert!(registry.sink().is_empty());
        assert_eq!(*changes.borrow(), 0);
    }

    #[test]
    fn test_entry_notifies_on_change() {
        let mut registry = CVarRegistry::with_builtin().unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let s = seen.clone();
        registry
            .entry(&cvars::FINGERPRINT)
            .unwrap()
            .subscribe(move |id: &Uuid| s.borrow_mut().push(*id));

        let id = Uuid::new_v4();
        registry.set(&cvars::FINGERPRINT, id).unwrap();
        registry.set(&cvars::FINGERPRINT, id).unwrap();

        assert_eq!(*seen.borrow(), vec![id]);
        assert_eq!(registry.entry(&cvars::FINGERPRINT).unwrap().value(), id);
    }

    #[test]
    fn test_parse_value() {
        let registry = CVarRegistry::with_builtin().unwrap();
        assert_eq!(
            registry.parse_value("CompatMode", "yes").unwrap(),
            CVarValue::Bool(true)
        );
        assert!(matches!(
            registry.parse_value("NextInstallationId", "ten"),
            Err(DataError::InvalidValue { .. })
        ));
        assert!(registry.parse_value("Nope", "1").is_err());
    }

    #[test]
    fn test_definitions_keep_registration_order() {
        let registry = CVarRegistry::with_builtin().unwrap();
        let names: Vec<_> = registry.definitions().map(|d| d.name).collect();
        assert_eq!(names.first(), Some(&"CompatMode"));
        assert_eq!(names.last(), Some(&"SelectedLogin"));
    }
}
