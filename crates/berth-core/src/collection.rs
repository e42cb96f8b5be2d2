//! Keyed reactive collections
//!
//! A `KeyedCollection` holds elements unique by key. Every mutation updates
//! the in-memory map, pushes a `DbCommand` carrying a copy of the element,
//! and only then notifies subscribers. Observers therefore never see a state
//! that is not already queued for persistence.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{DataError, DataResult};
use crate::observer::{Observers, SubscriptionId};
use crate::storage::command::DbCommand;
use crate::storage::queue::CommandSink;

/// Why an element changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeReason {
    Add,
    Update,
    Remove,
}

/// A change delivered to collection subscribers
#[derive(Debug, Clone, PartialEq)]
pub struct Change<E> {
    pub reason: ChangeReason,
    /// The element after the change, or the removed element
    pub current: E,
}

/// An element type that can live in a keyed collection
pub trait Record: Clone + PartialEq + fmt::Debug + 'static {
    type Key: Ord + Clone + fmt::Debug + fmt::Display;

    /// Human-readable collection name, used in errors
    const COLLECTION: &'static str;

    fn key(&self) -> Self::Key;

    /// Build the persistence command for a change to `snapshot`
    fn command(reason: ChangeReason, snapshot: Self) -> DbCommand;
}

pub struct KeyedCollection<E: Record> {
    items: BTreeMap<E::Key, E>,
    sink: CommandSink,
    observers: Observers<Change<E>>,
}

impl<E: Record> KeyedCollection<E> {
    pub fn new(sink: CommandSink) -> Self {
        Self {
            items: BTreeMap::new(),
            sink,
            observers: Observers::new(),
        }
    }

    /// Fill from stored rows without queueing commands or notifying
    pub(crate) fn load(&mut self, rows: impl IntoIterator<Item = E>) {
        for row in rows {
            self.items.insert(row.key(), row);
        }
    }

    /// Add a new element, rejecting keys that are already present
    pub fn add(&mut self, element: E) -> DataResult<()> {
        let key = element.key();
        if self.items.contains_key(&key) {
            return Err(DataError::DuplicateKey {
                collection: E::COLLECTION,
                key: key.to_string(),
            });
        }

        self.items.insert(key, element.clone());
        self.emit(ChangeReason::Add, element);
        Ok(())
    }

    /// Insert or replace an element by key
    ///
    /// Returns `Add` if the key was new and `Update` otherwise.
    pub fn add_or_update(&mut self, element: E) -> ChangeReason {
        let reason = match self.items.insert(element.key(), element.clone()) {
            Some(_) => ChangeReason::Update,
            None => ChangeReason::Add,
        };
        self.emit(reason, element);
        reason
    }

    /// Mutate a tracked element in place
    ///
    /// Emits an `Update` if `f` changed the element. Returns whether an
    /// update was emitted; `false` also covers a missing key. Changing the
    /// key field is rejected and leaves the element untouched.
    pub fn modify(&mut self, key: &E::Key, f: impl FnOnce(&mut E)) -> DataResult<bool> {
        let Some(existing) = self.items.get(key) else {
            return Ok(false);
        };

        let mut edited = existing.clone();
        f(&mut edited);

        if edited.key() != *key {
            return Err(DataError::KeyMutation {
                collection: E::COLLECTION,
                key: key.to_string(),
            });
        }
        if edited == *existing {
            return Ok(false);
        }

        self.items.insert(key.clone(), edited.clone());
        self.emit(ChangeReason::Update, edited);
        Ok(true)
    }

    /// Remove an element; absent elements are ignored
    pub fn remove(&mut self, element: &E) -> Option<E> {
        self.remove_by_key(&element.key())
    }

    /// Remove by key; absent keys are ignored
    pub fn remove_by_key(&mut self, key: &E::Key) -> Option<E> {
        let removed = self.items.remove(key)?;
        self.emit(ChangeReason::Remove, removed.clone());
        Some(removed)
    }

    pub fn lookup(&self, key: &E::Key) -> Option<&E> {
        self.items.get(key)
    }

    pub fn contains_key(&self, key: &E::Key) -> bool {
        self.items.contains_key(key)
    }

    /// Elements in key order
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Register a callback for every add, update and remove
    pub fn subscribe(&self, callback: impl FnMut(&Change<E>) + 'static) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn emit(&mut self, reason: ChangeReason, current: E) {
        self.sink.push(E::command(reason, current.clone()));
        self.observers.notify(&Change { reason, current });
    }
}

impl<E: Record> fmt::Debug for KeyedCollection<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedCollection")
            .field("collection", &E::COLLECTION)
            .field("items", &self.items)
            .finish()
    }
}
