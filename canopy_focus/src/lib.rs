// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Focus: per-probe focus resolution and global enter/exit bubbling.
//!
//! ## Overview
//!
//! A [`Probe`] is one ray-based input source: gaze, a hand or controller
//! ray, or an emulated pointer. Each tick it turns a device pose into a ray,
//! runs the UI and bounded 3D hit-test passes, and resolves a single *prime
//! focus*: the nearest hit node (or nearest qualifying ancestor) that passes
//! the host's filter gate. From the prime focus it rebuilds its *focus
//! chain* (the ancestor path of qualifying nodes) and diffs it against the
//! previous tick to produce per-probe enter and exit lists.
//!
//! The [`FocusManager`] owns the registered probes. After all probes have
//! resolved, it runs four deterministic passes: aggregate the chains,
//! dispatch enters (incrementing each node's focus reference count *before*
//! the handler sees it), dispatch exits (decrementing first), and raise
//! prime-focus-changed plus pointer enter/exit notifications. A node's count
//! therefore always equals the number of probes whose chain contains it at
//! the instant any handler runs, and a node observes "zero probes" in the
//! same tick the last probe abandoned it.
//!
//! ## Locking
//!
//! A probe's focus can be locked to a node (typically for the lifetime of a
//! gesture). While locked, the lock target is the prime focus regardless of
//! where the ray points; ray and hit-point data still update so cursors can
//! track. Release is idempotent.
//!
//! ## Tick model
//!
//! Single-threaded and cooperative. The host drives, once per frame:
//!
//! 1. feed poses and flags to each probe,
//! 2. [`FocusManager::resolve_all`],
//! 3. gesture dispatch (see `canopy_gesture`), which may lock/unlock focus,
//! 4. [`FocusManager::dispatch`] with a [`FocusSink`].
//!
//! Registration changes between ticks take effect at the next tick; nothing
//! here blocks or suspends.
//!
//! ## Features
//!
//! - `std` (default): enables `std` support for dependencies.
//! - `libm`: enables `no_std` builds that rely on `libm` for floating-point
//!   math.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod manager;
mod probe;
mod types;

pub use canopy_hit::SceneGraph;
pub use manager::FocusManager;
pub use probe::{FocusChain, Probe};
pub use types::{FocusEventArgs, FocusSink, FocusTarget, ProbeFlags, ProbeId, ProbeKind};
