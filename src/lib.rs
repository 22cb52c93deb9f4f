// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `DomoState` - a composable finite-state device engine for home automation.
//!
//! Every device is a small state machine holding a current/previous state
//! pair. Transitions fan out to registered delegates, re-arm delayed
//! follow-up transitions, and can be forced by recurring schedules. Devices
//! bind to other devices to form hierarchies in which a parent mirrors its
//! children through its own transition logic.
//!
//! # Supported Features
//!
//! - **State tracking**: current and previous state, with the previous state
//!   committed only after all observers of a transition have run
//! - **Delegates**: per-state and wildcard callbacks, panic-isolated
//! - **Mapping hooks**: coerce or veto requested transitions per device
//! - **Timers**: recurring schedules (fixed interval, daily wall-clock time,
//!   cron expression) and delayed follow-up transitions
//! - **Composition**: bind child devices so parents track them
//!
//! # Quick Start
//!
//! ```
//! use domostate::{Device, State};
//!
//! fn main() -> domostate::Result<()> {
//!     let lamp = Device::builder()
//!         .with_name("desk-lamp")
//!         .with_initial_state(State::Off)
//!         .build()?;
//!
//!     lamp.add_delegate(State::On, |transition| {
//!         println!(
//!             "{}: {} -> {}",
//!             transition.source().name(),
//!             transition.previous(),
//!             transition.state(),
//!         );
//!     });
//!
//!     lamp.transition(State::On)?;
//!     assert_eq!(lamp.state(), State::On);
//!     assert_eq!(lamp.previous_state(), State::Off);
//!     Ok(())
//! }
//! ```
//!
//! ## Timers
//!
//! Delay timers arm a one-shot follow-up after each transition; schedules
//! force a transition on a recurring spec. Both run on a Tokio runtime.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use domostate::{Device, ScheduleSpec, State};
//!
//! #[tokio::main]
//! async fn main() -> domostate::Result<()> {
//!     let porch = Device::builder()
//!         .with_name("porch-light")
//!         .with_initial_state(State::Off)
//!         .build()?;
//!
//!     // fall back to off ten minutes after any other state
//!     porch.add_delay(State::Off, Duration::from_secs(600));
//!     // switch on every evening
//!     porch.add_schedule(State::On, ScheduleSpec::parse("18:30")?)?;
//!
//!     porch.transition(State::On)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Composition
//!
//! ```
//! use domostate::{Device, State};
//!
//! # fn main() -> domostate::Result<()> {
//! let sensor = Device::builder().with_initial_state(State::Still).build()?;
//! let room = Device::builder()
//!     .with_name("living-room")
//!     .with_child(&sensor)
//!     .build()?;
//!
//! sensor.transition(State::Motion)?;
//! assert_eq!(room.state(), State::Motion);
//! # Ok(())
//! # }
//! ```

pub mod delegate;
pub mod device;
pub mod error;
pub mod state;
pub mod timer;

pub use delegate::{Delegate, DelegateRegistry};
pub use device::{Device, DeviceBuilder, DeviceId, MapContext};
pub use error::{Error, Result, ScheduleError, ValidationError, ValueError};
pub use state::{State, StateCell, Transition, TransitionOrigin};
pub use timer::{ScheduleSpec, TimerManager};
