// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Time-driven transitions.
//!
//! Two timer kinds drive transitions without an external caller:
//!
//! - **Schedule timers** recur per a [`ScheduleSpec`] (fixed interval, daily
//!   wall-clock time, or cron expression) and force a transition on every
//!   firing.
//! - **Delay timers** are one-shots armed after a transition, firing a
//!   follow-up transition a fixed duration later.
//!
//! Both are owned by the [`TimerManager`] every device carries. Timer tasks
//! need an ambient Tokio runtime; purely manual state handling does not.

mod manager;
mod schedule;

pub use manager::{TimerFire, TimerManager};
pub use schedule::ScheduleSpec;
