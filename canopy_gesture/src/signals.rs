// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Edge-triggered input signals and the per-probe capture buffer.

use alloc::vec::Vec;

use kurbo::Vec2;
use nalgebra::Vector3;

/// One edge-triggered signal from the device or gesture-recognizer layer.
///
/// Navigation payloads are normalized 2-axis drag offsets; manipulation
/// payloads are cumulative 3D displacements of the manipulated source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Signal {
    /// The select control went down.
    SelectDown,
    /// The select control went up.
    SelectUp,
    /// The menu control went down.
    MenuDown,
    /// The menu control went up.
    MenuUp,
    /// The external gesture layer confirmed a hold ahead of the local
    /// countdown.
    HoldConfirm,
    /// Abort whatever gesture is in flight for this probe.
    Cancel,
    /// A navigation drag began.
    NavigationStart(Vec2),
    /// The navigation offset changed.
    NavigationUpdate(Vec2),
    /// The navigation drag finished.
    NavigationComplete(Vec2),
    /// The navigation drag was abandoned.
    NavigationCancel,
    /// A manipulation began.
    ManipulationStart(Vector3<f64>),
    /// The manipulation displacement changed.
    ManipulationUpdate(Vector3<f64>),
    /// The manipulation finished.
    ManipulationComplete(Vector3<f64>),
    /// The manipulation was abandoned.
    ManipulationCancel,
}

/// Per-probe mailbox for asynchronous signals.
///
/// Producers (device callbacks, recognizers) push at any time; the
/// dispatcher drains the buffer exactly once at the tick boundary, in push
/// order. Draining clears the buffer, so a signal is consumed by exactly
/// one tick.
#[derive(Clone, Debug, Default)]
pub struct SignalBuffer {
    queued: Vec<Signal>,
}

impl SignalBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a signal for the next tick.
    pub fn push(&mut self, signal: Signal) {
        self.queued.push(signal);
    }

    /// Number of signals waiting for the next tick.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queued.len()
    }

    /// Whether no signals are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    /// Discards all waiting signals.
    pub fn clear(&mut self) {
        self.queued.clear();
    }

    /// Takes all waiting signals in push order, leaving the buffer empty.
    pub(crate) fn drain(&mut self) -> Vec<Signal> {
        core::mem::take(&mut self.queued)
    }
}
