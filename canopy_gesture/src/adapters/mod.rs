// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integration adapters for other Canopy crates.
//!
//! - **Focus adapter** (`focus_adapter` feature): implements
//!   [`FocusControl`](crate::FocusControl) for
//!   [`canopy_focus::FocusManager`], wiring gesture locking to the focus
//!   layer's probes.

#[cfg(feature = "focus_adapter")]
pub mod focus;
