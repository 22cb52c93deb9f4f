// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Current/previous state tracking.

use super::State;

/// The current and previous state of a device.
///
/// A transition mutates the cell in two phases. [`replace`](Self::replace)
/// swaps in the new current state and hands back the old one, while the
/// stored previous state is left untouched. Only after observers of the
/// transition have been notified is the old state written back with
/// [`commit_previous`](Self::commit_previous). The previous state therefore
/// always answers "what was the state before the last completed transition"
/// and is never mutated mid-notification.
///
/// # Examples
///
/// ```
/// use domostate::state::{State, StateCell};
///
/// let mut cell = StateCell::new(State::Off);
/// let old = cell.replace(State::On);
/// assert_eq!(old, State::Off);
/// assert_eq!(cell.current(), &State::On);
/// // previous still holds its pre-transition value until committed
/// assert_eq!(cell.previous(), &State::Off);
/// cell.commit_previous(old);
/// assert_eq!(cell.previous(), &State::Off);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateCell {
    /// State the device is in right now.
    current: State,
    /// State before the most recently completed transition.
    previous: State,
}

impl StateCell {
    /// Creates a cell holding the initial state.
    ///
    /// Before the first transition the previous state equals the initial
    /// state; there is nothing earlier to report.
    #[must_use]
    pub fn new(initial: State) -> Self {
        Self {
            previous: initial.clone(),
            current: initial,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn current(&self) -> &State {
        &self.current
    }

    /// Returns the state before the most recently completed transition.
    #[must_use]
    pub fn previous(&self) -> &State {
        &self.previous
    }

    /// Swaps in a new current state, returning the state it replaced.
    ///
    /// The stored previous state is not touched; call
    /// [`commit_previous`](Self::commit_previous) once observers have been
    /// notified.
    pub fn replace(&mut self, next: State) -> State {
        std::mem::replace(&mut self.current, next)
    }

    /// Commits the pre-transition state after notification has finished.
    pub fn commit_previous(&mut self, old: State) {
        self.previous = old;
    }
}
