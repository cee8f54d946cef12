// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The press/hold/tap phase machine.

use smallvec::SmallVec;

/// Phase of the press machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PressPhase {
    /// No press in flight.
    Idle,
    /// Select is down; may still become a tap or a hold.
    Pressed,
    /// The hold threshold elapsed (or the external layer confirmed a hold).
    Holding,
}

/// Thresholds for press recognition, in the host's time units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PressConfig {
    /// How long select must stay down before a press becomes a hold.
    pub hold_threshold: f64,
    /// Two tap releases within this window form a double tap.
    pub double_tap_window: f64,
}

impl Default for PressConfig {
    fn default() -> Self {
        Self {
            hold_threshold: 0.5,
            double_tap_window: 0.75,
        }
    }
}

/// One transition produced by the press machine.
///
/// The payload is the gesture target captured at select-down (the probe's
/// prime focus at that moment), or `None` when select went down on nothing.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PressOutput<K> {
    /// Select went down.
    Press(Option<K>),
    /// Select went up.
    Release(Option<K>),
    /// A bare press/release with no intervening hold.
    Tap(Option<K>),
    /// A second tap within the double-tap window; replaces that tap.
    DoubleTap(Option<K>),
    /// The press crossed into a hold. Requests a focus lock.
    HoldStarted(Option<K>),
    /// The hold ended with a release.
    HoldCompleted(Option<K>),
    /// The press or hold was cancelled; no tap or completion follows.
    HoldCancelled(Option<K>),
}

impl<K: Copy> PressOutput<K> {
    /// The gesture target carried by this transition.
    #[must_use]
    pub fn target(&self) -> Option<K> {
        match self {
            Self::Press(t)
            | Self::Release(t)
            | Self::Tap(t)
            | Self::DoubleTap(t)
            | Self::HoldStarted(t)
            | Self::HoldCompleted(t)
            | Self::HoldCancelled(t) => *t,
        }
    }
}

/// Transitions emitted by one machine step.
pub type PressOutputs<K> = SmallVec<[PressOutput<K>; 2]>;

/// Press/hold/tap recognition for a single probe.
///
/// Timestamps (`now`) and elapsed time (`dt`) are supplied by the host in
/// its own monotonic time units; the hold threshold is an explicit per-tick
/// countdown, so there is nothing to suspend or poll. The machine stores the
/// target captured at select-down and reports every later transition
/// against it, which is what makes taps land on the element the user
/// pressed rather than the one under the drifted ray.
#[derive(Clone, Debug)]
pub struct PressMachine<K> {
    config: PressConfig,
    phase: PressPhase,
    target: Option<K>,
    countdown: f64,
    last_tap_release: Option<f64>,
}

impl<K: Copy + Eq> PressMachine<K> {
    /// Creates an idle machine with the given thresholds.
    #[must_use]
    pub fn new(config: PressConfig) -> Self {
        Self {
            config,
            phase: PressPhase::Idle,
            target: None,
            countdown: 0.0,
            last_tap_release: None,
        }
    }

    /// The current phase.
    #[must_use]
    pub fn phase(&self) -> PressPhase {
        self.phase
    }

    /// The target captured at select-down, while a press is in flight.
    #[must_use]
    pub fn target(&self) -> Option<K> {
        self.target
    }

    /// Whether a press or hold is in flight.
    #[must_use]
    pub fn is_engaged(&self) -> bool {
        self.phase != PressPhase::Idle
    }

    /// Select went down over `target` (the probe's prime focus).
    ///
    /// Ignored unless idle; a missed release cannot stack presses.
    pub fn select_down(&mut self, target: Option<K>) -> PressOutputs<K> {
        let mut out = PressOutputs::new();
        if self.phase == PressPhase::Idle {
            self.phase = PressPhase::Pressed;
            self.target = target;
            self.countdown = self.config.hold_threshold;
            out.push(PressOutput::Press(target));
        }
        out
    }

    /// Select went up at time `now`.
    ///
    /// From `Pressed` this recognizes a tap, or a double tap when the
    /// previous tap's release was within the configured window. From
    /// `Holding` it completes the hold.
    pub fn select_up(&mut self, now: f64) -> PressOutputs<K> {
        let mut out = PressOutputs::new();
        match self.phase {
            PressPhase::Idle => return out,
            PressPhase::Pressed => {
                out.push(PressOutput::Release(self.target));
                match self.last_tap_release {
                    Some(prev) if now - prev <= self.config.double_tap_window => {
                        self.last_tap_release = None;
                        out.push(PressOutput::DoubleTap(self.target));
                    }
                    _ => {
                        self.last_tap_release = Some(now);
                        out.push(PressOutput::Tap(self.target));
                    }
                }
            }
            PressPhase::Holding => {
                out.push(PressOutput::Release(self.target));
                out.push(PressOutput::HoldCompleted(self.target));
            }
        }
        self.phase = PressPhase::Idle;
        self.target = None;
        out
    }

    /// The external gesture layer confirmed a hold ahead of the countdown.
    pub fn hold_confirm(&mut self) -> PressOutputs<K> {
        let mut out = PressOutputs::new();
        if self.phase == PressPhase::Pressed {
            self.phase = PressPhase::Holding;
            out.push(PressOutput::HoldStarted(self.target));
        }
        out
    }

    /// Advances the hold countdown by `dt`.
    pub fn tick(&mut self, dt: f64) -> PressOutputs<K> {
        let mut out = PressOutputs::new();
        if self.phase == PressPhase::Pressed {
            self.countdown -= dt;
            if self.countdown <= 0.0 {
                self.phase = PressPhase::Holding;
                out.push(PressOutput::HoldStarted(self.target));
            }
        }
        out
    }

    /// Cancels an in-flight press or hold. Idempotent.
    ///
    /// Emits [`PressOutput::HoldCancelled`] in place of any completion; a
    /// second cancel on the same tick emits nothing.
    pub fn cancel(&mut self) -> PressOutputs<K> {
        let mut out = PressOutputs::new();
        if self.phase != PressPhase::Idle {
            out.push(PressOutput::HoldCancelled(self.target));
            self.phase = PressPhase::Idle;
            self.target = None;
        }
        out
    }
}

impl<K: Copy + Eq> Default for PressMachine<K> {
    fn default() -> Self {
        Self::new(PressConfig::default())
    }
}
