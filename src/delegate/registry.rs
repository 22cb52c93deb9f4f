// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Delegate management for device transitions.
//!
//! This module provides [`DelegateRegistry`], the fan-out table mapping
//! state tokens to observer callbacks plus a wildcard list invoked on every
//! transition.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::state::{State, Transition};

/// Type alias for delegate callbacks.
pub type Delegate = Arc<dyn Fn(&Transition) + Send + Sync>;

/// Registry for the observer callbacks of one device.
///
/// Delegates are registered either for a specific state or for the wildcard
/// slot that fires on every transition. Registration order is preserved and
/// duplicates are allowed; there is no removal API, entries live as long as
/// the owning device.
///
/// # Thread Safety
///
/// The registry is fully thread-safe. Notification snapshots the effective
/// callback list under a read lock and invokes it with no lock held, so a
/// delegate may register further delegates or trigger transitions on the
/// same device without deadlocking.
pub struct DelegateRegistry {
    /// Callbacks keyed by the state they observe.
    by_state: RwLock<HashMap<State, Vec<Delegate>>>,
    /// Callbacks invoked on every transition.
    any_state: RwLock<Vec<Delegate>>,
}

impl DelegateRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_state: RwLock::new(HashMap::new()),
            any_state: RwLock::new(Vec::new()),
        }
    }

    /// Registers a callback for transitions into `state`.
    pub fn add<F>(&self, state: State, callback: F)
    where
        F: Fn(&Transition) + Send + Sync + 'static,
    {
        self.by_state
            .write()
            .entry(state)
            .or_default()
            .push(Arc::new(callback));
    }

    /// Registers a callback for every transition, whatever the state.
    pub fn add_any<F>(&self, callback: F)
    where
        F: Fn(&Transition) + Send + Sync + 'static,
    {
        self.any_state.write().push(Arc::new(callback));
    }

    /// Notifies every delegate observing this transition.
    ///
    /// State-specific delegates run first, wildcard delegates after, each
    /// group in registration order. A panicking delegate is logged and
    /// skipped; the remaining delegates still run.
    pub fn notify(&self, transition: &Transition) {
        let mut effective: Vec<Delegate> = Vec::new();
        {
            let by_state = self.by_state.read();
            if let Some(list) = by_state.get(transition.state()) {
                effective.extend(list.iter().map(Arc::clone));
            }
        }
        {
            let any_state = self.any_state.read();
            effective.extend(any_state.iter().map(Arc::clone));
        }

        for callback in effective {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(transition))) {
                tracing::error!(
                    state = %transition.state(),
                    panic = panic_message(&panic),
                    "Delegate panicked during notification"
                );
            }
        }
    }

    /// Returns the total number of registered delegates.
    #[must_use]
    pub fn delegate_count(&self) -> usize {
        let by_state = self.by_state.read().values().map(Vec::len).sum::<usize>();
        by_state + self.any_state.read().len()
    }

    /// Returns `true` if there are no registered delegates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.delegate_count() == 0
    }
}

impl Default for DelegateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DelegateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegateRegistry")
            .field("delegate_count", &self.delegate_count())
            .finish()
    }
}

/// Extracts a readable message from a delegate panic payload.
fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use parking_lot::Mutex;

    use crate::device::Device;
    use crate::state::TransitionOrigin;

    fn transition_to(state: State, previous: State) -> Transition {
        let device = Device::builder().with_name("probe").build().unwrap();
        Transition::new(state, previous, TransitionOrigin::External, device)
    }

    #[test]
    fn registry_new_is_empty() {
        let registry = DelegateRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.delegate_count(), 0);
    }

    #[test]
    fn state_delegate_fires_for_its_state_only() {
        let registry = DelegateRegistry::new();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        registry.add(State::On, move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        registry.notify(&transition_to(State::On, State::Off));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        registry.notify(&transition_to(State::Off, State::On));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn wildcard_fires_for_every_state() {
        let registry = DelegateRegistry::new();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        registry.add_any(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        registry.notify(&transition_to(State::On, State::Off));
        registry.notify(&transition_to(State::Motion, State::On));
        registry.notify(&transition_to(State::Dark, State::Motion));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn state_specific_runs_before_wildcard() {
        let registry = DelegateRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let log = order.clone();
        registry.add_any(move |_| log.lock().push("any"));
        let log = order.clone();
        registry.add(State::On, move |_| log.lock().push("on"));

        registry.notify(&transition_to(State::On, State::Off));
        assert_eq!(*order.lock(), vec!["on", "any"]);
    }

    #[test]
    fn duplicates_fire_twice_in_order() {
        let registry = DelegateRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let log = order.clone();
        registry.add(State::On, move |_| log.lock().push("first"));
        let log = order.clone();
        registry.add(State::On, move |_| log.lock().push("second"));

        registry.notify(&transition_to(State::On, State::Off));
        assert_eq!(*order.lock(), vec!["first", "second"]);
        assert_eq!(registry.delegate_count(), 2);
    }

    #[test]
    fn delegate_receives_payload_pair() {
        let registry = DelegateRegistry::new();
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();

        registry.add(State::Motion, move |transition| {
            *seen_clone.lock() = Some((transition.state().clone(), transition.previous().clone()));
        });

        registry.notify(&transition_to(State::Motion, State::Still));
        assert_eq!(seen.lock().take(), Some((State::Motion, State::Still)));
    }

    #[test]
    fn panicking_delegate_does_not_stop_fanout() {
        let registry = DelegateRegistry::new();
        let counter = Arc::new(AtomicU32::new(0));

        registry.add(State::On, |_| panic!("observer exploded"));
        let counter_clone = counter.clone();
        registry.add(State::On, move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        registry.notify(&transition_to(State::On, State::Off));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delegate_may_register_during_notification() {
        let registry = Arc::new(DelegateRegistry::new());
        let counter = Arc::new(AtomicU32::new(0));

        let registry_clone = registry.clone();
        let counter_clone = counter.clone();
        registry.add_any(move |_| {
            let counter_inner = counter_clone.clone();
            registry_clone.add(State::Off, move |_| {
                counter_inner.fetch_add(1, Ordering::SeqCst);
            });
        });

        registry.notify(&transition_to(State::On, State::Off));
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        registry.notify(&transition_to(State::Off, State::On));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn registry_debug() {
        let registry = DelegateRegistry::new();
        registry.add(State::On, |_| {});

        let debug = format!("{registry:?}");
        assert!(debug.contains("DelegateRegistry"));
        assert!(debug.contains("delegate_count"));
    }
}
