// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transition payloads delivered to delegates.

use crate::device::Device;

use super::State;

/// Why a transition was initiated.
///
/// The origin travels with every transition so the engine can tell externally
/// requested changes apart from its own timer activity. Delay-originated
/// transitions do not re-arm delay timers; everything else does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionOrigin {
    /// Requested by a caller, or forwarded from a bound child device.
    External,
    /// Fired by a one-shot delay timer.
    DelayFired,
    /// Fired by a recurring schedule timer.
    ScheduleFired,
}

impl TransitionOrigin {
    /// Returns `true` for transitions fired by one of the device's timers.
    #[must_use]
    pub const fn is_timer(&self) -> bool {
        matches!(self, Self::DelayFired | Self::ScheduleFired)
    }
}

/// A completed state transition as seen by delegates.
///
/// Delegates always receive the consistent `(state, previous)` pair of the
/// transition they are observing, regardless of what the source device's
/// stored previous state reads at that moment. `source` is the device that
/// performed the transition; for a delegate registered on a bound child it
/// is the child, not the parent.
///
/// # Examples
///
/// ```
/// use domostate::{Device, State};
///
/// # fn main() -> domostate::Result<()> {
/// let lamp = Device::builder()
///     .with_name("lamp")
///     .with_initial_state(State::Off)
///     .build()?;
/// lamp.add_delegate(State::On, |transition| {
///     println!(
///         "{} went {} -> {}",
///         transition.source().name(),
///         transition.previous(),
///         transition.state(),
///     );
/// });
/// lamp.transition(State::On)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Transition {
    /// State entered by this transition.
    state: State,
    /// State held immediately before this transition.
    previous: State,
    /// Why the transition was initiated.
    origin: TransitionOrigin,
    /// Device that performed the transition.
    source: Device,
}

impl Transition {
    /// Assembles a payload; only the engine completes transitions.
    pub(crate) fn new(
        state: State,
        previous: State,
        origin: TransitionOrigin,
        source: Device,
    ) -> Self {
        Self {
            state,
            previous,
            origin,
            source,
        }
    }

    /// Returns the state entered by this transition.
    #[must_use]
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Returns the state held immediately before this transition.
    #[must_use]
    pub fn previous(&self) -> &State {
        &self.previous
    }

    /// Returns why the transition was initiated.
    #[must_use]
    pub const fn origin(&self) -> TransitionOrigin {
        self.origin
    }

    /// Returns the device that performed the transition.
    #[must_use]
    pub fn source(&self) -> &Device {
        &self.source
    }

    /// Returns `true` if the entered state differs from the previous one.
    #[must_use]
    pub fn is_change(&self) -> bool {
        self.state != self.previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_is_timer() {
        assert!(!TransitionOrigin::External.is_timer());
        assert!(TransitionOrigin::DelayFired.is_timer());
        assert!(TransitionOrigin::ScheduleFired.is_timer());
    }

    #[test]
    fn origin_serde_round_trip() {
        let json = serde_json::to_string(&TransitionOrigin::DelayFired).unwrap();
        assert_eq!(json, "\"delay_fired\"");
        let back: TransitionOrigin = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TransitionOrigin::DelayFired);
    }

    #[test]
    fn payload_accessors() {
        let device = Device::builder()
            .with_name("sensor")
            .with_initial_state(State::Still)
            .build()
            .unwrap();
        let transition = Transition::new(
            State::Motion,
            State::Still,
            TransitionOrigin::External,
            device.clone(),
        );

        assert_eq!(transition.state(), &State::Motion);
        assert_eq!(transition.previous(), &State::Still);
        assert_eq!(transition.origin(), TransitionOrigin::External);
        assert_eq!(transition.source().id(), device.id());
        assert!(transition.is_change());
    }

    #[test]
    fn same_state_is_not_a_change() {
        let device = Device::builder().build().unwrap();
        let transition = Transition::new(
            State::Motion,
            State::Motion,
            TransitionOrigin::ScheduleFired,
            device,
        );
        assert!(!transition.is_change());
    }
}
