//! Edge-triggered availability flag.

use std::sync::{Arc, Mutex};

use crate::signal::{Signal, Subscription};

/// Change notification payload. `error` is advisory and may be stale
/// after recovery.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityEvent {
    pub available: bool,
    pub error: Option<String>,
}

struct State {
    available: bool,
    last_error: Option<String>,
}

/// Boolean health flag with change notification.
///
/// Observers are notified iff the value actually flips; repeated identical
/// sets are no-ops. Heartbeat successes arrive every cycle, so edge
/// triggering is what keeps observers from reacting to steady state.
pub struct Availability {
    state: Mutex<State>,
    changed: Signal<AvailabilityEvent>,
}

impl Default for Availability {
    fn default() -> Self {
        Self::new()
    }
}

impl Availability {
    /// Starts unavailable.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                available: false,
                last_error: None,
            }),
            changed: Signal::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.state.lock().unwrap().available
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().unwrap().last_error.clone()
    }

    pub fn on_change(
        &self,
        callback: impl Fn(&AvailabilityEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.changed.subscribe(callback)
    }

    /// Updates the flag; notifies observers only on an actual transition.
    pub fn set_available(&self, available: bool, error: Option<String>) {
        let flipped = {
            let mut state = self.state.lock().unwrap();
            let flipped = state.available != available;
            state.available = available;
            state.last_error = error.clone();
            flipped
        };
        if flipped {
            self.changed.emit(&AvailabilityEvent { available, error });
        }
    }

    /// Mirrors `other`: adopts its current state immediately, then follows
    /// every subsequent change until the returned subscription is dropped.
    /// Detaching never affects the source.
    pub fn bind_to(self: &Arc<Self>, other: &Availability) -> Subscription {
        self.set_available(other.is_available(), other.last_error());
        let weak = Arc::downgrade(self);
        other.on_change(move |event| {
            if let Some(this) = weak.upgrade() {
                this.set_available(event.available, event.error.clone());
            }
        })
    }

    /// Detaches all observers. Used on connection close.
    pub(crate) fn clear_observers(&self) {
        self.changed.clear();
    }
}
