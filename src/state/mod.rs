// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State tokens and transition bookkeeping.
//!
//! This module provides the [`State`] vocabulary, the [`StateCell`] holding a
//! device's current/previous pair, and the [`Transition`] payload delivered
//! to delegates together with its [`TransitionOrigin`] tag.
//!
//! # Examples
//!
//! ```
//! use domostate::state::State;
//!
//! let state: State = "motion".parse().unwrap();
//! assert_eq!(state, State::Motion);
//! assert_eq!(state.to_string(), "motion");
//! ```

mod store;
mod transition;
mod value;

pub use store::StateCell;
pub use transition::{Transition, TransitionOrigin};
pub use value::State;
