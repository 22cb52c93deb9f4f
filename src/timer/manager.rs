// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Schedule and delay timer ownership.
//!
//! This module provides [`TimerManager`], which owns the two timer kinds a
//! device carries: recurring schedule loops and one-shot delay timers. Both
//! run as detached Tokio tasks; dropping the manager aborts them all.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::ScheduleError;
use crate::state::{State, TransitionOrigin};

use super::ScheduleSpec;

/// Type alias for the transition performed when a timer fires.
///
/// Arguments are the target state, the prior-state hint handed to the
/// device's mapping hook, and the origin tag.
pub type TimerFire = Arc<dyn Fn(State, Option<State>, TransitionOrigin) + Send + Sync>;

/// Owner of one device's schedule and delay timers.
///
/// Schedule timers run from registration until replaced or cleared, firing
/// per their [`ScheduleSpec`]. Delay timers are only registered here; they
/// are armed by the device after each transition that did not itself come
/// from a delay, via [`arm_delays`](Self::arm_delays). At most one schedule
/// task and one pending one-shot exist per state; registering or arming
/// again replaces the running task.
///
/// Timer tasks call back into the device through the fire callback given at
/// construction. Failures inside that callback are that callback's business;
/// the manager never retries and a failure for one state does not disturb
/// timers for the others.
pub struct TimerManager {
    /// Transition performed when any timer fires.
    fire: TimerFire,
    /// Registered delay durations, keyed by target state.
    delays: Mutex<HashMap<State, Duration>>,
    /// Pending delay one-shots.
    pending: Mutex<HashMap<State, JoinHandle<()>>>,
    /// Active schedule loops.
    schedules: Mutex<HashMap<State, JoinHandle<()>>>,
}

impl TimerManager {
    /// Creates a manager firing transitions through `fire`.
    #[must_use]
    pub fn new<F>(fire: F) -> Self
    where
        F: Fn(State, Option<State>, TransitionOrigin) + Send + Sync + 'static,
    {
        Self {
            fire: Arc::new(fire),
            delays: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            schedules: Mutex::new(HashMap::new()),
        }
    }

    // =========================================================================
    // Schedule timers
    // =========================================================================

    /// Registers a recurring schedule forcing transitions into `state`.
    ///
    /// The schedule starts immediately and replaces any schedule previously
    /// registered for the same state, whose task is aborted.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::NoRuntime`] outside a Tokio runtime and
    /// [`ScheduleError::NeverFires`] for a spec with no upcoming occurrence.
    pub fn add_schedule(&self, state: State, spec: ScheduleSpec) -> Result<(), ScheduleError> {
        let handle = Handle::try_current().map_err(|_| ScheduleError::NoRuntime)?;
        if spec.next_occurrence(Local::now()).is_none() {
            return Err(ScheduleError::NeverFires(spec.to_string()));
        }

        let task = handle.spawn(run_schedule(
            spec.clone(),
            state.clone(),
            Arc::clone(&self.fire),
        ));
        let replaced = self.schedules.lock().insert(state.clone(), task);
        let was_replaced = replaced.is_some();
        if let Some(previous) = replaced {
            previous.abort();
        }
        tracing::info!(
            state = %state,
            schedule = %spec,
            replaced = was_replaced,
            "Registered schedule timer"
        );
        Ok(())
    }

    /// Cancels the schedule registered for `state`.
    ///
    /// Returns `true` if a schedule was found and aborted.
    pub fn clear_schedule(&self, state: &State) -> bool {
        if let Some(task) = self.schedules.lock().remove(state) {
            task.abort();
            tracing::debug!(state = %state, "Canceled schedule timer");
            true
        } else {
            false
        }
    }

    /// Returns the number of active schedule timers.
    #[must_use]
    pub fn schedule_count(&self) -> usize {
        self.schedules.lock().len()
    }

    // =========================================================================
    // Delay timers
    // =========================================================================

    /// Registers a delay duration for `state`.
    ///
    /// Registration alone starts nothing; the one-shot is armed by
    /// [`arm_delays`](Self::arm_delays) after a qualifying transition. A
    /// zero duration removes the registration and cancels any pending
    /// one-shot for the state.
    pub fn add_delay(&self, state: State, duration: Duration) {
        if duration.is_zero() {
            self.delays.lock().remove(&state);
            if let Some(task) = self.pending.lock().remove(&state) {
                task.abort();
            }
            tracing::debug!(state = %state, "Removed delay timer");
        } else {
            self.delays.lock().insert(state.clone(), duration);
            tracing::debug!(state = %state, ?duration, "Registered delay timer");
        }
    }

    /// Removes the delay registered for `state` and cancels its pending
    /// one-shot.
    ///
    /// Returns `true` if a registration was found.
    pub fn clear_delay(&self, state: &State) -> bool {
        let removed = self.delays.lock().remove(state).is_some();
        if let Some(task) = self.pending.lock().remove(state) {
            task.abort();
        }
        if removed {
            tracing::debug!(state = %state, "Removed delay timer");
        }
        removed
    }

    /// Returns `true` if a delay is registered for `state`.
    #[must_use]
    pub fn has_delay(&self, state: &State) -> bool {
        self.delays.lock().contains_key(state)
    }

    /// Returns the number of registered delay durations.
    #[must_use]
    pub fn delay_count(&self) -> usize {
        self.delays.lock().len()
    }

    /// Arms a one-shot for every registered delay state other than the one
    /// just entered.
    ///
    /// Any one-shot already pending for an armed state is aborted and timed
    /// afresh; a pending one-shot for `entered` itself keeps running. `hint`
    /// is the pre-transition state, handed to the mapping hook when the
    /// one-shot fires.
    pub fn arm_delays(&self, entered: &State, hint: &State) {
        let to_arm: Vec<(State, Duration)> = self
            .delays
            .lock()
            .iter()
            .filter(|&(state, _)| state != entered)
            .map(|(state, duration)| (state.clone(), *duration))
            .collect();
        if to_arm.is_empty() {
            return;
        }

        let Ok(handle) = Handle::try_current() else {
            tracing::error!(
                entered = %entered,
                "Delay timers require a tokio runtime, not arming"
            );
            return;
        };

        for (state, duration) in to_arm {
            let fire = Arc::clone(&self.fire);
            let target = state.clone();
            let prior = hint.clone();
            let task = handle.spawn(async move {
                tokio::time::sleep(duration).await;
                tracing::debug!(state = %target, "Delay timer fired");
                fire(target, Some(prior), TransitionOrigin::DelayFired);
            });
            tracing::debug!(state = %state, ?duration, "Armed delay one-shot");
            if let Some(previous) = self.pending.lock().insert(state, task) {
                previous.abort();
            }
        }
    }
}

impl Drop for TimerManager {
    fn drop(&mut self) {
        for task in self.pending.lock().values() {
            task.abort();
        }
        for task in self.schedules.lock().values() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for TimerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerManager")
            .field("schedule_count", &self.schedule_count())
            .field("delay_count", &self.delay_count())
            .finish()
    }
}

/// Loop body of one schedule task.
async fn run_schedule(spec: ScheduleSpec, state: State, fire: TimerFire) {
    if let ScheduleSpec::Every { interval } = spec {
        let mut ticker = tokio::time::interval(interval);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            tracing::debug!(state = %state, "Schedule timer fired");
            fire(state.clone(), None, TransitionOrigin::ScheduleFired);
        }
    } else {
        let mut after = Local::now();
        loop {
            let Some(next) = spec.next_occurrence(after) else {
                tracing::warn!(state = %state, "Schedule has no upcoming occurrence, stopping");
                break;
            };
            let wait = (next - Local::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(wait).await;
            tracing::debug!(state = %state, "Schedule timer fired");
            fire(state.clone(), None, TransitionOrigin::ScheduleFired);
            // anchor past the fired occurrence so a lagging wall clock cannot replay it
            after = next.max(Local::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type FireLog = Arc<Mutex<Vec<(State, Option<State>, TransitionOrigin)>>>;

    fn logging_manager() -> (TimerManager, FireLog) {
        let log: FireLog = Arc::new(Mutex::new(Vec::new()));
        let log_clone = log.clone();
        let manager = TimerManager::new(move |state, hint, origin| {
            log_clone.lock().push((state, hint, origin));
        });
        (manager, log)
    }

    #[test]
    fn add_schedule_requires_runtime() {
        let (manager, _log) = logging_manager();
        let spec = ScheduleSpec::every(Duration::from_secs(30)).unwrap();
        assert!(matches!(
            manager.add_schedule(State::Motion, spec),
            Err(ScheduleError::NoRuntime)
        ));
    }

    #[test]
    fn delay_registration_bookkeeping() {
        let (manager, _log) = logging_manager();

        manager.add_delay(State::Off, Duration::from_secs(5));
        assert!(manager.has_delay(&State::Off));
        assert_eq!(manager.delay_count(), 1);

        manager.add_delay(State::Off, Duration::ZERO);
        assert!(!manager.has_delay(&State::Off));
        assert_eq!(manager.delay_count(), 0);
    }

    #[test]
    fn clear_delay_reports_presence() {
        let (manager, _log) = logging_manager();
        manager.add_delay(State::Off, Duration::from_secs(5));

        assert!(manager.clear_delay(&State::Off));
        assert!(!manager.clear_delay(&State::Off));
    }

    #[test]
    fn arming_without_runtime_is_harmless() {
        let (manager, log) = logging_manager();
        manager.add_delay(State::Off, Duration::from_secs(5));

        manager.arm_delays(&State::On, &State::Off);
        assert!(log.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn never_firing_schedule_is_rejected() {
        let (manager, _log) = logging_manager();
        let spec = ScheduleSpec::cron("0 0 0 1 1 * 1970").unwrap();
        assert!(matches!(
            manager.add_schedule(State::Motion, spec),
            Err(ScheduleError::NeverFires(_))
        ));
        assert_eq!(manager.schedule_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_fires_with_hint_after_duration() {
        let (manager, log) = logging_manager();
        manager.add_delay(State::Off, Duration::from_secs(5));

        manager.arm_delays(&State::Motion, &State::Still);
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(
            *log.lock(),
            vec![(
                State::Off,
                Some(State::Still),
                TransitionOrigin::DelayFired
            )]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn delay_for_entered_state_is_not_armed() {
        let (manager, log) = logging_manager();
        manager.add_delay(State::On, Duration::from_secs(5));
        manager.add_delay(State::Off, Duration::from_secs(5));

        manager.arm_delays(&State::On, &State::Unknown);
        tokio::time::sleep(Duration::from_secs(6)).await;

        let fired = log.lock();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0, State::Off);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_restarts_the_countdown() {
        let (manager, log) = logging_manager();
        manager.add_delay(State::Off, Duration::from_secs(10));

        manager.arm_delays(&State::On, &State::Off);
        tokio::time::sleep(Duration::from_secs(5)).await;
        manager.arm_delays(&State::Motion, &State::On);

        // original deadline passes without firing
        tokio::time::sleep(Duration::from_secs(7)).await;
        assert!(log.lock().is_empty());

        // restarted deadline fires
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(
            *log.lock(),
            vec![(State::Off, Some(State::On), TransitionOrigin::DelayFired)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_cancels_pending_one_shot() {
        let (manager, log) = logging_manager();
        manager.add_delay(State::Off, Duration::from_secs(5));
        manager.arm_delays(&State::On, &State::Off);

        tokio::time::sleep(Duration::from_secs(2)).await;
        manager.add_delay(State::Off, Duration::ZERO);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(log.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn interval_schedule_fires_repeatedly() {
        let (manager, log) = logging_manager();
        let spec = ScheduleSpec::every(Duration::from_secs(30)).unwrap();
        manager.add_schedule(State::Motion, spec).unwrap();

        tokio::time::sleep(Duration::from_secs(95)).await;

        let fired = log.lock();
        assert_eq!(fired.len(), 3);
        assert!(
            fired
                .iter()
                .all(|entry| *entry
                    == (State::Motion, None, TransitionOrigin::ScheduleFired))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reregistering_replaces_the_schedule() {
        let (manager, log) = logging_manager();
        manager
            .add_schedule(
                State::Motion,
                ScheduleSpec::every(Duration::from_secs(30)).unwrap(),
            )
            .unwrap();
        manager
            .add_schedule(
                State::Motion,
                ScheduleSpec::every(Duration::from_secs(50)).unwrap(),
            )
            .unwrap();
        assert_eq!(manager.schedule_count(), 1);

        // the replaced 30s schedule never fires
        tokio::time::sleep(Duration::from_secs(45)).await;
        assert!(log.lock().is_empty());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(log.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_schedule_stops_firings() {
        let (manager, log) = logging_manager();
        manager
            .add_schedule(
                State::Motion,
                ScheduleSpec::every(Duration::from_secs(30)).unwrap(),
            )
            .unwrap();

        assert!(manager.clear_schedule(&State::Motion));
        assert!(!manager.clear_schedule(&State::Motion));

        tokio::time::sleep(Duration::from_secs(65)).await;
        assert!(log.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_aborts_all_timers() {
        let (manager, log) = logging_manager();
        manager.add_delay(State::Off, Duration::from_secs(5));
        manager.arm_delays(&State::On, &State::Off);
        manager
            .add_schedule(
                State::Motion,
                ScheduleSpec::every(Duration::from_secs(30)).unwrap(),
            )
            .unwrap();

        drop(manager);
        tokio::time::sleep(Duration::from_secs(65)).await;
        assert!(log.lock().is_empty());
    }
}
