//! Typed publish/subscribe signals.
//!
//! One [`Signal`] per event kind: a registry of callbacks, each
//! subscription an opaque handle that detaches on drop. Notification is
//! synchronous; callbacks are snapshotted before invocation so a callback
//! may itself subscribe or detach without deadlocking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    callbacks: HashMap<u64, Callback<T>>,
}

/// A broadcast point for one kind of event.
pub struct Signal<T> {
    inner: Arc<Mutex<Registry<T>>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry {
                next_id: 0,
                callbacks: HashMap::new(),
            })),
        }
    }

    /// Number of live subscriptions.
    pub fn observer_count(&self) -> usize {
        self.inner.lock().unwrap().callbacks.len()
    }

    /// Detaches every subscription at once. Outstanding [`Subscription`]
    /// handles become inert.
    pub fn clear(&self) {
        self.inner.lock().unwrap().callbacks.clear();
    }
}

impl<T: 'static> Signal<T> {
    /// Registers a callback. Delivery stops when the returned handle is
    /// dropped or [`Subscription::detach`] is called.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut registry = self.inner.lock().unwrap();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.callbacks.insert(id, Arc::new(callback));
            id
        };

        let weak: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.inner);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.lock().unwrap().callbacks.remove(&id);
                }
            })),
        }
    }

    /// Notifies all current subscribers synchronously.
    pub fn emit(&self, event: &T) {
        let snapshot: Vec<Callback<T>> =
            self.inner.lock().unwrap().callbacks.values().cloned().collect();
        for callback in snapshot {
            callback(event);
        }
    }
}

/// Detach handle for one subscription. Detaches on drop.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Explicitly detaches; equivalent to dropping the handle.
    pub fn detach(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
