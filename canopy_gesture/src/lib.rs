// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Gesture: per-probe gesture phase machines with focus locking.
//!
//! ## Overview
//!
//! This crate turns edge-triggered device signals (select up/down, menu
//! edges, hold confirmation, navigation and manipulation phases) into
//! gesture events routed to a *locked* target. Each probe gets independent
//! machines:
//!
//! - **Press/Hold**: `Idle → Pressed → Holding → Idle`, with Tap and
//!   DoubleTap recognized on release and a per-tick hold countdown instead
//!   of timers.
//! - **Navigation** (2-axis drag) and **Manipulation** (3D displacement):
//!   `Started → Updated* → (Completed | Cancelled)`, driven by external
//!   recognizer signals.
//!
//! On a Hold, Navigation, or Manipulation start, the dispatcher locks the
//! originating probe's focus to its current prime-focus node; every later
//! phase of that gesture targets the locked node no matter where the ray
//! drifts. The lock is released exactly once at the terminating transition,
//! idempotently under repeated cancels. Tap does not lock.
//!
//! ## Signals and ticks
//!
//! Device callbacks push [`Signal`]s into a probe's [`SignalBuffer`] at any
//! time; the [`GestureDispatcher`] drains each buffer exactly once per
//! [`GestureDispatcher::tick`], so all recognition runs on the single update
//! thread without locks. Losing the target's focus, or an external cancel,
//! forces the cancel transition on the same tick.
//!
//! Every transition produces two effects atomically: a direct notification
//! to the registered [`InteractionTarget`] for the node, then a broadcast to
//! the [`GestureSink`].
//!
//! ## Features
//!
//! - `std` (default): enables `std` support for dependencies.
//! - `libm`: enables `no_std` builds that rely on `libm` for floating-point
//!   math.
//! - `focus_adapter`: implements [`FocusControl`] for
//!   `canopy_focus::FocusManager`.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod adapters;
mod axis;
mod dispatcher;
mod press;
mod signals;

pub use axis::{AxisMachine, AxisOutput, AxisPhase};
pub use dispatcher::{
    FocusControl, GestureDispatcher, GestureKind, GestureSink, InteractionEvent,
    InteractionEventArgs, InteractionTarget, PositionPayload,
};
pub use press::{PressConfig, PressMachine, PressOutput, PressOutputs, PressPhase};
pub use signals::{Signal, SignalBuffer};
