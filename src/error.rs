// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `domostate` library.
//!
//! This module provides the error hierarchy for failures across the library:
//! state token validation, mapping-hook vetoes, schedule construction, and
//! device composition.

use thiserror::Error;

use crate::state::State;

/// The main error type for this library.
///
/// This enum encompasses all possible errors that can occur when working
/// with devices, their delegates, and their timers.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// A state-mapping hook vetoed a transition.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Error occurred while registering a schedule timer.
    #[error("schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// A device cannot observe its own transitions.
    #[error("cannot bind a device to itself")]
    BindToSelf,
}

/// Errors related to value validation and constraints.
///
/// These errors occur when constructing state tokens from untrusted input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A state token outside the built-in vocabulary was requested by name.
    #[error("unrecognized state: {0}")]
    UnrecognizedState(String),

    /// A custom state token was empty.
    #[error("custom state token is empty")]
    EmptyCustomState,
}

/// Rejection raised by a device's state-mapping hook.
///
/// The engine itself never refuses a transition; domain rules live in the
/// hook, which vetoes by returning this error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The mapping hook refused the requested state.
    #[error("state {state} rejected: {reason}")]
    Rejected {
        /// The state that was requested.
        state: State,
        /// Why the hook refused it.
        reason: String,
    },
}

impl ValidationError {
    /// Creates a rejection for the given state.
    #[must_use]
    pub fn rejected(state: State, reason: impl Into<String>) -> Self {
        Self::Rejected {
            state,
            reason: reason.into(),
        }
    }
}

/// Errors related to building and registering schedule timers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// A cron expression could not be parsed.
    #[error("invalid cron expression {expression:?}: {reason}")]
    InvalidCron {
        /// The expression that failed to parse.
        expression: String,
        /// Description of the parse failure.
        reason: String,
    },

    /// A time spec was neither a wall-clock time nor a cron expression.
    #[error("invalid time spec: {0:?}")]
    InvalidTimeSpec(String),

    /// A schedule interval of zero would fire continuously.
    #[error("schedule interval must be greater than zero")]
    ZeroInterval,

    /// The schedule has no upcoming occurrence and would never fire.
    #[error("schedule never fires: {0}")]
    NeverFires(String),

    /// Schedule timers are spawned as tasks and need an ambient runtime.
    #[error("schedules require a running tokio runtime")]
    NoRuntime,
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
