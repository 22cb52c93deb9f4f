// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Observer fan-out for device transitions.
//!
//! Every device owns a [`DelegateRegistry`]. Callbacks registered for a
//! specific state fire on transitions into that state; wildcard callbacks
//! fire on every transition, after the state-specific ones.

mod registry;

pub use registry::{Delegate, DelegateRegistry};
