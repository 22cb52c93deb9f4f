// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Composable state devices.
//!
//! A [`Device`] holds a current/previous state pair, notifies registered
//! delegates on every transition, and carries the schedule and delay timers
//! that drive time-based transitions. Devices compose hierarchically:
//! binding a child makes the parent re-run its own transition logic for
//! every transition the child performs.
//!
//! `Device` is a cheap handle; clones share the same underlying device.
//! Timer tasks hold only weak references, so dropping the last handle winds
//! the timers down.
//!
//! # Examples
//!
//! ```
//! use domostate::{Device, State};
//!
//! # fn main() -> domostate::Result<()> {
//! let motion = Device::builder()
//!     .with_name("hall-motion")
//!     .with_initial_state(State::Still)
//!     .build()?;
//! let hall = Device::builder()
//!     .with_name("hall")
//!     .with_child(&motion)
//!     .build()?;
//!
//! // the parent mirrors child transitions through its own logic
//! motion.transition(State::Motion)?;
//! assert_eq!(hall.state(), State::Motion);
//! # Ok(())
//! # }
//! ```

mod id;

pub use id::DeviceId;

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::delegate::DelegateRegistry;
use crate::error::{Error, Result, ValidationError};
use crate::state::{State, StateCell, Transition, TransitionOrigin};
use crate::timer::{ScheduleSpec, TimerManager};

/// Context handed to a device's state-mapping hook.
///
/// The hook sees the full request and decides what state the device actually
/// enters, or vetoes the transition altogether.
#[derive(Debug)]
pub struct MapContext<'a> {
    /// Requested target state.
    pub target: &'a State,
    /// Prior-state hint supplied with the request, if any.
    ///
    /// Bound children forward their own previous state here; a delay timer
    /// supplies the state its device held when the one-shot was armed.
    pub prior_hint: Option<&'a State>,
    /// Current state of the device receiving the transition.
    pub current: &'a State,
    /// Why the transition was initiated.
    pub origin: TransitionOrigin,
}

/// Type alias for state-mapping hooks.
type MapHook =
    Box<dyn Fn(&MapContext<'_>) -> std::result::Result<State, ValidationError> + Send + Sync>;

/// Shared innards of a device; handles are `Arc`s of this.
struct DeviceEngine {
    /// Stable identity, assigned at build time.
    id: DeviceId,
    /// Human-readable name used in logs.
    name: String,
    /// Current/previous pair with the two-phase commit discipline.
    cell: Mutex<StateCell>,
    /// Optional coerce-or-veto hook applied to every target state.
    map_hook: Option<MapHook>,
    /// Observer fan-out.
    delegates: DelegateRegistry,
    /// Schedule and delay timers.
    timers: TimerManager,
}

/// A composable finite-state device.
///
/// Transitions run synchronously: the state is swapped, delegates are
/// notified with the consistent `(new, old)` pair of this transition, delay
/// timers are re-armed where applicable, and only then is the stored
/// previous state committed. Reading [`previous_state`](Self::previous_state)
/// after a transition therefore always answers "what was the state before
/// the last completed transition".
///
/// Registering schedules, and transitions on devices with registered delays,
/// must happen inside a Tokio runtime; everything else is runtime-free.
///
/// # Examples
///
/// ```
/// use domostate::{Device, State};
///
/// # fn main() -> domostate::Result<()> {
/// let lamp = Device::builder()
///     .with_name("porch-lamp")
///     .with_initial_state(State::Off)
///     .build()?;
///
/// lamp.add_delegate(State::On, |transition| {
///     println!("{} switched on", transition.source().name());
/// });
///
/// lamp.transition(State::On)?;
/// assert_eq!(lamp.state(), State::On);
/// assert_eq!(lamp.previous_state(), State::Off);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Device {
    engine: Arc<DeviceEngine>,
}

impl Device {
    /// Creates a builder for a new device.
    #[must_use]
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::new()
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Performs an externally requested transition into `target`.
    ///
    /// Equivalent to [`transition_with`](Self::transition_with) with no
    /// prior-state hint and [`TransitionOrigin::External`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the device's mapping hook vetoed the
    /// transition; the state is left untouched and no delegate runs.
    pub fn transition(&self, target: State) -> Result<bool> {
        self.transition_with(target, None, TransitionOrigin::External)
    }

    /// Performs a transition with an explicit prior-state hint and origin.
    ///
    /// The hint is purely advisory input to the mapping hook; delegates
    /// always observe the device's actual pre-transition state. Transitions
    /// not originated by a delay timer re-arm the one-shot for every
    /// registered delay state other than the one entered.
    ///
    /// Returns `Ok(true)` on completion; this layer itself never rejects a
    /// transition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the mapping hook vetoed the
    /// transition.
    pub fn transition_with(
        &self,
        target: State,
        prior_hint: Option<State>,
        origin: TransitionOrigin,
    ) -> Result<bool> {
        let engine = &self.engine;

        let mapped = match &engine.map_hook {
            Some(hook) => {
                let current = engine.cell.lock().current().clone();
                let context = MapContext {
                    target: &target,
                    prior_hint: prior_hint.as_ref(),
                    current: &current,
                    origin,
                };
                hook(&context)?
            }
            None => target,
        };

        let old = engine.cell.lock().replace(mapped.clone());
        tracing::debug!(
            device = %engine.name,
            from = %old,
            to = %mapped,
            origin = ?origin,
            "State transition"
        );

        let payload = Transition::new(mapped.clone(), old.clone(), origin, self.clone());
        engine.delegates.notify(&payload);

        if origin != TransitionOrigin::DelayFired {
            engine.timers.arm_delays(&mapped, &old);
        }

        engine.cell.lock().commit_previous(old);
        Ok(true)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> State {
        self.engine.cell.lock().current().clone()
    }

    /// Returns the state held before the most recently completed transition.
    #[must_use]
    pub fn previous_state(&self) -> State {
        self.engine.cell.lock().previous().clone()
    }

    /// Returns the device's identifier.
    #[must_use]
    pub fn id(&self) -> DeviceId {
        self.engine.id
    }

    /// Returns the device's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.engine.name
    }

    // =========================================================================
    // Delegates
    // =========================================================================

    /// Registers a callback invoked on every transition into `state`.
    ///
    /// Delegates cannot be removed; they live as long as the device.
    pub fn add_delegate<F>(&self, state: State, callback: F)
    where
        F: Fn(&Transition) + Send + Sync + 'static,
    {
        self.engine.delegates.add(state, callback);
    }

    /// Registers a callback invoked on every transition, whatever the state.
    ///
    /// Wildcard delegates run after the state-specific ones.
    pub fn add_any_delegate<F>(&self, callback: F)
    where
        F: Fn(&Transition) + Send + Sync + 'static,
    {
        self.engine.delegates.add_any(callback);
    }

    /// Returns the total number of registered delegates.
    #[must_use]
    pub fn delegate_count(&self) -> usize {
        self.engine.delegates.delegate_count()
    }

    // =========================================================================
    // Timers
    // =========================================================================

    /// Registers a recurring schedule forcing transitions into `state`.
    ///
    /// Starts immediately and replaces any schedule previously registered
    /// for the same state. Schedule-fired transitions re-arm delay timers
    /// exactly as external ones do.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schedule`] outside a Tokio runtime or for a spec
    /// with no upcoming occurrence.
    pub fn add_schedule(&self, state: State, spec: ScheduleSpec) -> Result<()> {
        self.engine.timers.add_schedule(state, spec)?;
        Ok(())
    }

    /// Cancels the schedule registered for `state`.
    ///
    /// Returns `true` if a schedule was found and aborted.
    pub fn clear_schedule(&self, state: &State) -> bool {
        self.engine.timers.clear_schedule(state)
    }

    /// Registers a delayed follow-up transition into `state`.
    ///
    /// The one-shot is armed after every transition that was not itself
    /// fired by a delay, for every registered delay state other than the
    /// one entered; arming restarts any pending one-shot. A zero duration
    /// removes the registration.
    pub fn add_delay(&self, state: State, duration: Duration) {
        self.engine.timers.add_delay(state, duration);
    }

    /// Removes the delay registered for `state` and cancels its pending
    /// one-shot.
    ///
    /// Returns `true` if a registration was found.
    pub fn clear_delay(&self, state: &State) -> bool {
        self.engine.timers.clear_delay(state)
    }

    // =========================================================================
    // Composition
    // =========================================================================

    /// Makes this device observe one child device.
    ///
    /// A forwarding delegate is registered on the child's wildcard slot:
    /// every child transition re-runs this device's transition logic with
    /// the child's new state as target, the child's previous state as
    /// prior-state hint, and [`TransitionOrigin::External`] (so forwarded
    /// transitions re-arm this device's delays). A veto from this device's
    /// mapping hook is logged and does not disturb the child.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BindToSelf`] when `child` is this device.
    pub fn bind_one(&self, child: &Device) -> Result<()> {
        if Arc::ptr_eq(&self.engine, &child.engine) {
            tracing::warn!(device = %self.engine.name, "Refusing to bind a device to itself");
            return Err(Error::BindToSelf);
        }

        let parent = Arc::downgrade(&self.engine);
        child.add_any_delegate(move |transition: &Transition| {
            let Some(engine) = parent.upgrade() else {
                return;
            };
            let device = Device { engine };
            if let Err(error) = device.transition_with(
                transition.state().clone(),
                Some(transition.previous().clone()),
                TransitionOrigin::External,
            ) {
                tracing::warn!(
                    device = %device.engine.name,
                    error = %error,
                    "Forwarded transition rejected"
                );
            }
        });
        tracing::debug!(
            parent = %self.engine.name,
            child = %child.engine.name,
            "Bound child device"
        );
        Ok(())
    }

    /// Makes this device observe every given child device.
    ///
    /// Returns the number of children bound.
    ///
    /// # Errors
    ///
    /// Returns the first binding failure; children before it stay bound.
    pub fn bind<'a, I>(&self, children: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a Device>,
    {
        let mut bound = 0;
        for child in children {
            self.bind_one(child)?;
            bound += 1;
        }
        Ok(bound)
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell = self.engine.cell.lock();
        f.debug_struct("Device")
            .field("id", &self.engine.id)
            .field("name", &self.engine.name)
            .field("state", cell.current())
            .field("previous_state", cell.previous())
            .finish_non_exhaustive()
    }
}

/// Builder for creating devices.
///
/// # Examples
///
/// ```
/// use domostate::{Device, State};
///
/// # fn main() -> domostate::Result<()> {
/// let night_light = Device::builder()
///     .with_name("night-light")
///     .with_initial_state(State::Off)
///     .with_state_map(|ctx| match ctx.target {
///         // treat motion reports as a switch-on request
///         State::Motion => Ok(State::On),
///         State::Still => Ok(State::Off),
///         other => Ok(other.clone()),
///     })
///     .build()?;
///
/// night_light.transition(State::Motion)?;
/// assert_eq!(night_light.state(), State::On);
/// # Ok(())
/// # }
/// ```
pub struct DeviceBuilder {
    name: Option<String>,
    initial_state: Option<State>,
    map_hook: Option<MapHook>,
    children: Vec<Device>,
}

impl DeviceBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: None,
            initial_state: None,
            map_hook: None,
            children: Vec::new(),
        }
    }

    /// Sets the device name used in logs.
    ///
    /// Defaults to a name derived from the device id.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the initial state explicitly.
    ///
    /// Without it the device adopts the first child's current state, or
    /// [`State::Unknown`] when there are no children.
    #[must_use]
    pub fn with_initial_state(mut self, state: State) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Installs the state-mapping hook.
    ///
    /// The hook runs before every transition and either returns the state
    /// the device actually enters or vetoes with a [`ValidationError`]. The
    /// default is identity.
    #[must_use]
    pub fn with_state_map<F>(mut self, hook: F) -> Self
    where
        F: Fn(&MapContext<'_>) -> std::result::Result<State, ValidationError>
            + Send
            + Sync
            + 'static,
    {
        self.map_hook = Some(Box::new(hook));
        self
    }

    /// Adds a child device bound at build time.
    #[must_use]
    pub fn with_child(mut self, child: &Device) -> Self {
        self.children.push(child.clone());
        self
    }

    /// Adds several child devices bound at build time.
    #[must_use]
    pub fn with_children<'a, I>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = &'a Device>,
    {
        self.children.extend(children.into_iter().cloned());
        self
    }

    /// Builds the device and binds its children.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BindToSelf`] if a child turns out to be the device
    /// itself; this cannot happen for children added through the builder.
    pub fn build(self) -> Result<Device> {
        let initial = self
            .initial_state
            .or_else(|| self.children.first().map(Device::state))
            .unwrap_or_default();
        let id = DeviceId::new();
        let name = self
            .name
            .unwrap_or_else(|| format!("device-{}", &id.to_string()[..8]));
        let map_hook = self.map_hook;

        let engine = Arc::new_cyclic(|weak: &Weak<DeviceEngine>| {
            let fire_weak = weak.clone();
            DeviceEngine {
                id,
                name,
                cell: Mutex::new(StateCell::new(initial)),
                map_hook,
                delegates: DelegateRegistry::new(),
                timers: TimerManager::new(move |state, hint, origin| {
                    let Some(engine) = fire_weak.upgrade() else {
                        return;
                    };
                    let device = Device { engine };
                    if let Err(error) = device.transition_with(state, hint, origin) {
                        tracing::warn!(
                            device = %device.engine.name,
                            error = %error,
                            "Timer transition rejected"
                        );
                    }
                }),
            }
        });

        let device = Device { engine };
        for child in &self.children {
            device.bind_one(child)?;
        }
        tracing::debug!(
            device = %device.engine.name,
            id = ?device.engine.id,
            state = %device.state(),
            "Built device"
        );
        Ok(device)
    }
}

impl Default for DeviceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DeviceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuilder")
            .field("name", &self.name)
            .field("initial_state", &self.initial_state)
            .field("children", &self.children.len())
            .finish_non_exhaustive()
    }
}
