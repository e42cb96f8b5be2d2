//! Callback lists for change notification
//!
//! Variables and collections each keep one of these. Callbacks run on the
//! owner thread, synchronously, after the change has been queued for
//! persistence. A callback may subscribe or unsubscribe others while it runs.

use std::cell::{Cell, RefCell};
use std::fmt;

/// Identifies a registered callback so it can be removed again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Box<dyn FnMut(&T)>;

pub struct Observers<T> {
    next_id: Cell<u64>,
    callbacks: RefCell<Vec<(SubscriptionId, Callback<T>)>>,
    removed: RefCell<Vec<SubscriptionId>>,
}

impl<T> Observers<T> {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            callbacks: RefCell::new(Vec::new()),
            removed: RefCell::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, callback: impl FnMut(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.callbacks.borrow_mut().push((id, Box::new(callback)));
        id
    }

    /// Returns false if the id was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut callbacks = self.callbacks.borrow_mut();
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        if callbacks.len() != before {
            return true;
        }
        drop(callbacks);

        // May be running right now, in which case it is detached from the list.
        if id.0 < self.next_id.get() {
            self.removed.borrow_mut().push(id);
        }
        false
    }

    pub fn len(&self) -> usize {
        self.callbacks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn notify(&self, value: &T) {
        let mut running = std::mem::take(&mut *self.callbacks.borrow_mut());
        for (_, callback) in running.iter_mut() {
            callback(value);
        }

        let removed = std::mem::take(&mut *self.removed.borrow_mut());
        running.retain(|(id, _)| !removed.contains(id));

        // Keep callbacks added during notification after the existing ones.
        let mut callbacks = self.callbacks.borrow_mut();
        let added = std::mem::take(&mut *callbacks);
        running.extend(added);
        *callbacks = running;
    }
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Observers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers").field("len", &self.len()).finish()
    }
}
