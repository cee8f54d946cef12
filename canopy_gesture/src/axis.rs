// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The shared phase machine for navigation and manipulation gestures.

/// Phase of an axis gesture.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AxisPhase {
    /// No gesture in flight.
    Idle,
    /// Started and not yet completed or cancelled.
    Active,
}

/// One transition produced by an [`AxisMachine`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AxisOutput<K, P> {
    /// The gesture began over `target`. Requests a focus lock.
    Started {
        /// Target captured at start.
        target: Option<K>,
        /// Initial payload.
        payload: P,
    },
    /// The payload changed.
    Updated {
        /// The locked start target.
        target: Option<K>,
        /// Current payload.
        payload: P,
    },
    /// The gesture finished normally.
    Completed {
        /// The locked start target.
        target: Option<K>,
        /// Final payload.
        payload: P,
    },
    /// The gesture was abandoned; no completion follows.
    Cancelled {
        /// The locked start target.
        target: Option<K>,
    },
}

/// Started → Updated* → (Completed | Cancelled), tracked per probe.
///
/// The machine is generic over the payload `P`: a 2-axis offset for
/// navigation, a 3D displacement for manipulation. The target captured at
/// start is reported by every later transition, so routing stays on the
/// locked node while the ray drifts. Terminal transitions are idempotent:
/// update, complete, and cancel do nothing when idle.
#[derive(Clone, Debug)]
pub struct AxisMachine<K, P> {
    phase: AxisPhase,
    target: Option<K>,
    _payload: core::marker::PhantomData<fn() -> P>,
}

impl<K: Copy, P> AxisMachine<K, P> {
    /// Creates an idle machine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: AxisPhase::Idle,
            target: None,
            _payload: core::marker::PhantomData,
        }
    }

    /// The current phase.
    #[must_use]
    pub fn phase(&self) -> AxisPhase {
        self.phase
    }

    /// The target captured at start, while active.
    #[must_use]
    pub fn target(&self) -> Option<K> {
        self.target
    }

    /// Whether a gesture is in flight.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase == AxisPhase::Active
    }

    /// Starts the gesture over `target`. Ignored while already active.
    pub fn start(&mut self, target: Option<K>, payload: P) -> Option<AxisOutput<K, P>> {
        if self.phase == AxisPhase::Active {
            return None;
        }
        self.phase = AxisPhase::Active;
        self.target = target;
        Some(AxisOutput::Started { target, payload })
    }

    /// Reports a payload change. Ignored while idle.
    pub fn update(&mut self, payload: P) -> Option<AxisOutput<K, P>> {
        self.is_active().then(|| AxisOutput::Updated {
            target: self.target,
            payload,
        })
    }

    /// Completes the gesture. Ignored while idle.
    pub fn complete(&mut self, payload: P) -> Option<AxisOutput<K, P>> {
        if !self.is_active() {
            return None;
        }
        let target = self.target.take();
        self.phase = AxisPhase::Idle;
        Some(AxisOutput::Completed { target, payload })
    }

    /// Cancels the gesture. Idempotent: a second cancel yields nothing.
    pub fn cancel(&mut self) -> Option<AxisOutput<K, P>> {
        if !self.is_active() {
            return None;
        }
        let target = self.target.take();
        self.phase = AxisPhase::Idle;
        Some(AxisOutput::Cancelled { target })
    }
}

impl<K: Copy, P> Default for AxisMachine<K, P> {
    fn default() -> Self {
        Self::new()
    }
}
