// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The gesture dispatcher: signal routing, locking, and event emission.

use alloc::boxed::Box;
use core::hash::Hash;

use canopy_ray::Ray;
use hashbrown::HashMap;
use kurbo::Vec2;
use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

use crate::axis::{AxisMachine, AxisOutput};
use crate::press::{PressConfig, PressMachine, PressOutput, PressPhase};
use crate::signals::{Signal, SignalBuffer};

/// Tagged position data carried by a gesture event.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PositionPayload {
    /// No position data for this transition.
    None,
    /// Absolute world-space position (the probe's current hit point).
    Absolute(Point3<f64>),
    /// Relative 2-axis drag offset, normalized (navigation).
    Planar(Vec2),
    /// Relative 3D displacement (manipulation).
    Spatial(Vector3<f64>),
}

/// Immutable snapshot delivered with every gesture event.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InteractionEventArgs<P> {
    /// The probe the gesture originated from.
    pub probe: P,
    /// Position data, tagged absolute or relative.
    pub position: PositionPayload,
    /// The probe's targeting ray at dispatch time.
    pub ray: Option<Ray>,
}

/// Which transition an [`InteractionEvent`] reports.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GestureKind {
    /// Select went down.
    Press,
    /// Select went up.
    Release,
    /// A bare press/release on the same target.
    Tap,
    /// Two taps inside the double-tap window.
    DoubleTap,
    /// A press crossed the hold threshold.
    HoldStarted,
    /// A hold ended with a release.
    HoldCompleted,
    /// A press or hold was cancelled.
    HoldCancelled,
    /// A navigation drag began.
    NavigationStarted,
    /// The navigation offset changed.
    NavigationUpdated,
    /// The navigation drag finished.
    NavigationCompleted,
    /// The navigation drag was abandoned.
    NavigationCancelled,
    /// A manipulation began.
    ManipulationStarted,
    /// The manipulation displacement changed.
    ManipulationUpdated,
    /// The manipulation finished.
    ManipulationCompleted,
    /// The manipulation was abandoned.
    ManipulationCancelled,
    /// The menu control went down.
    MenuPressed,
    /// The menu control went up.
    MenuReleased,
}

/// One dispatched gesture event.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InteractionEvent<P, K> {
    /// Which transition occurred.
    pub kind: GestureKind,
    /// The gesture's target node: the lock target while locked, otherwise
    /// the target captured when the gesture began. `None` for targetless
    /// events such as menu edges or a press over nothing.
    pub target: Option<K>,
    /// Snapshot of the originating probe's state.
    pub args: InteractionEventArgs<P>,
}

/// Capability interface for node-targeted gesture notifications.
///
/// Registered per node with
/// [`GestureDispatcher::set_gesture_handler`]; invoked directly, before the
/// broadcast, for every transition targeting that node.
pub trait InteractionTarget<P, K> {
    /// A gesture transition targeted this node.
    fn on_gesture(&mut self, node: &K, event: &InteractionEvent<P, K>);
}

/// Broadcast receiver for gesture events.
pub trait GestureSink<P, K> {
    /// A gesture transition occurred somewhere.
    fn gesture(&mut self, event: &InteractionEvent<P, K>);
}

/// The dispatcher's view of the focus layer.
///
/// With the `focus_adapter` feature, `canopy_focus::FocusManager`
/// implements this for its probe identifiers.
pub trait FocusControl<P, K> {
    /// The probe's current prime focus (the lock target while locked).
    fn prime_focus(&self, probe: &P) -> Option<K>;

    /// Whether the probe's focus chain currently contains `node`.
    fn is_focused(&self, probe: &P, node: &K) -> bool;

    /// The probe's targeting ray.
    fn targeting_ray(&self, probe: &P) -> Option<Ray>;

    /// The probe's current hit point (cursor position).
    fn hit_point(&self, probe: &P) -> Option<Point3<f64>>;

    /// Pin the probe's prime focus to `node`.
    fn lock(&mut self, probe: &P, node: &K);

    /// Release the probe's focus lock.
    fn unlock(&mut self, probe: &P);
}

/// Which gesture machine holds a lock request.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum LockSlot {
    Press,
    Nav,
    Manip,
}

/// Per-probe gesture state, created lazily on first use.
#[derive(Debug)]
struct ProbeGestures<K> {
    signals: SignalBuffer,
    press: PressMachine<K>,
    nav: AxisMachine<K, Vec2>,
    manip: AxisMachine<K, Vector3<f64>>,
    press_locked: bool,
    nav_locked: bool,
    manip_locked: bool,
    lock_count: u8,
}

impl<K: Copy + Eq> ProbeGestures<K> {
    fn new(config: PressConfig) -> Self {
        Self {
            signals: SignalBuffer::new(),
            press: PressMachine::new(config),
            nav: AxisMachine::new(),
            manip: AxisMachine::new(),
            press_locked: false,
            nav_locked: false,
            manip_locked: false,
            lock_count: 0,
        }
    }

    fn flag(&mut self, slot: LockSlot) -> &mut bool {
        match slot {
            LockSlot::Press => &mut self.press_locked,
            LockSlot::Nav => &mut self.nav_locked,
            LockSlot::Manip => &mut self.manip_locked,
        }
    }

    /// Records a lock request; returns true when the underlying focus lock
    /// should be taken (first request wins).
    fn acquire(&mut self, slot: LockSlot) -> bool {
        if *self.flag(slot) {
            return false;
        }
        *self.flag(slot) = true;
        self.lock_count += 1;
        self.lock_count == 1
    }

    /// Drops a lock request; returns true when the underlying focus lock
    /// should be released (last request out). Idempotent per slot.
    fn release(&mut self, slot: LockSlot) -> bool {
        if !*self.flag(slot) {
            return false;
        }
        *self.flag(slot) = false;
        self.lock_count -= 1;
        self.lock_count == 0
    }
}

/// One raw machine transition awaiting event emission.
enum Raw<K> {
    Press(PressOutput<K>),
    Nav(AxisOutput<K, Vec2>),
    Manip(AxisOutput<K, Vector3<f64>>),
    MenuDown,
    MenuUp,
}

/// Routes captured signals through per-probe gesture machines.
///
/// The dispatcher runs once per tick, after all probes have resolved and
/// before the focus manager dispatches. Per probe it: cancels gestures
/// whose target lost focus, advances the hold countdown, drains the signal
/// buffer in arrival order, applies lock side effects, and emits each
/// transition as a direct node notification followed by a broadcast.
///
/// Probes are visited in first-use order, so dispatch is reproducible.
pub struct GestureDispatcher<P, K> {
    press_config: PressConfig,
    states: alloc::vec::Vec<(P, ProbeGestures<K>)>,
    handlers: HashMap<K, Box<dyn InteractionTarget<P, K>>>,
}

impl<P, K> core::fmt::Debug for GestureDispatcher<P, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GestureDispatcher")
            .field("probes", &self.states.len())
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

impl<P: Copy + Eq, K: Copy + Eq + Hash> GestureDispatcher<P, K> {
    /// Creates a dispatcher with default press thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::with_press_config(PressConfig::default())
    }

    /// Creates a dispatcher with explicit press thresholds.
    #[must_use]
    pub fn with_press_config(press_config: PressConfig) -> Self {
        Self {
            press_config,
            states: alloc::vec::Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// The signal buffer for `probe`, created on first use.
    ///
    /// Device callbacks push into this at any time; the next
    /// [`GestureDispatcher::tick`] consumes the buffered signals.
    pub fn signals(&mut self, probe: P) -> &mut SignalBuffer {
        if let Some(pos) = self.states.iter().position(|(p, _)| *p == probe) {
            return &mut self.states[pos].1.signals;
        }
        self.states
            .push((probe, ProbeGestures::new(self.press_config)));
        let last = self.states.len() - 1;
        &mut self.states[last].1.signals
    }

    /// The press phase for `probe`, if it has gesture state.
    #[must_use]
    pub fn press_phase(&self, probe: &P) -> Option<PressPhase> {
        self.states
            .iter()
            .find(|(p, _)| p == probe)
            .map(|(_, st)| st.press.phase())
    }

    /// Registers the node-targeted gesture handler for `node`.
    ///
    /// Replaces any previous handler. Takes effect at the next tick.
    pub fn set_gesture_handler(&mut self, node: K, handler: Box<dyn InteractionTarget<P, K>>) {
        self.handlers.insert(node, handler);
    }

    /// Removes the node-targeted gesture handler for `node`.
    pub fn remove_gesture_handler(&mut self, node: &K) {
        self.handlers.remove(node);
    }

    /// Drops a probe's gesture state, cancelling anything in flight.
    ///
    /// In-flight gestures emit their cancel transitions and release their
    /// locks before the state is discarded.
    pub fn remove_probe<C, S>(&mut self, probe: &P, control: &mut C, sink: &mut S)
    where
        C: FocusControl<P, K>,
        S: GestureSink<P, K>,
    {
        let Some(pos) = self.states.iter().position(|(p, _)| p == probe) else {
            return;
        };
        let (p, mut st) = self.states.remove(pos);
        let mut raw: SmallVec<[Raw<K>; 4]> = SmallVec::new();
        raw.extend(st.press.cancel().into_iter().map(Raw::Press));
        raw.extend(st.nav.cancel().map(Raw::Nav));
        raw.extend(st.manip.cancel().map(Raw::Manip));
        for r in raw {
            apply(&p, &mut st, r, control, &mut self.handlers, sink);
        }
    }

    /// Runs one gesture tick for all probes.
    ///
    /// `now` is the host's monotonic timestamp and `dt` the time elapsed
    /// since the previous tick, both in the same units as the configured
    /// thresholds.
    pub fn tick<C, S>(&mut self, now: f64, dt: f64, control: &mut C, sink: &mut S)
    where
        C: FocusControl<P, K>,
        S: GestureSink<P, K>,
    {
        let Self {
            states, handlers, ..
        } = self;
        for (probe, st) in states.iter_mut() {
            let mut raw: SmallVec<[Raw<K>; 8]> = SmallVec::new();

            // A target that lost focus forces the cancel transition before
            // anything new applies this tick.
            if let Some(t) = st.press.target()
                && !control.is_focused(probe, &t)
            {
                tracing::debug!("press target lost focus; cancelling");
                raw.extend(st.press.cancel().into_iter().map(Raw::Press));
            }
            if let Some(t) = st.nav.target()
                && !control.is_focused(probe, &t)
            {
                tracing::debug!("navigation target lost focus; cancelling");
                raw.extend(st.nav.cancel().map(Raw::Nav));
            }
            if let Some(t) = st.manip.target()
                && !control.is_focused(probe, &t)
            {
                tracing::debug!("manipulation target lost focus; cancelling");
                raw.extend(st.manip.cancel().map(Raw::Manip));
            }

            // Elapsed time advances the hold countdown.
            raw.extend(st.press.tick(dt).into_iter().map(Raw::Press));

            // Consume this tick's signals in arrival order.
            for signal in st.signals.drain() {
                match signal {
                    Signal::SelectDown => {
                        let target = control.prime_focus(probe);
                        raw.extend(st.press.select_down(target).into_iter().map(Raw::Press));
                    }
                    Signal::SelectUp => {
                        raw.extend(st.press.select_up(now).into_iter().map(Raw::Press));
                    }
                    Signal::MenuDown => raw.push(Raw::MenuDown),
                    Signal::MenuUp => raw.push(Raw::MenuUp),
                    Signal::HoldConfirm => {
                        raw.extend(st.press.hold_confirm().into_iter().map(Raw::Press));
                    }
                    Signal::Cancel => {
                        raw.extend(st.press.cancel().into_iter().map(Raw::Press));
                        raw.extend(st.nav.cancel().map(Raw::Nav));
                        raw.extend(st.manip.cancel().map(Raw::Manip));
                    }
                    Signal::NavigationStart(v) => {
                        let target = control.prime_focus(probe);
                        raw.extend(st.nav.start(target, v).map(Raw::Nav));
                    }
                    Signal::NavigationUpdate(v) => raw.extend(st.nav.update(v).map(Raw::Nav)),
                    Signal::NavigationComplete(v) => raw.extend(st.nav.complete(v).map(Raw::Nav)),
                    Signal::NavigationCancel => raw.extend(st.nav.cancel().map(Raw::Nav)),
                    Signal::ManipulationStart(v) => {
                        let target = control.prime_focus(probe);
                        raw.extend(st.manip.start(target, v).map(Raw::Manip));
                    }
                    Signal::ManipulationUpdate(v) => raw.extend(st.manip.update(v).map(Raw::Manip)),
                    Signal::ManipulationComplete(v) => {
                        raw.extend(st.manip.complete(v).map(Raw::Manip));
                    }
                    Signal::ManipulationCancel => raw.extend(st.manip.cancel().map(Raw::Manip)),
                }
            }

            for r in raw {
                apply(probe, st, r, control, handlers, sink);
            }
        }
    }
}

impl<P: Copy + Eq, K: Copy + Eq + Hash> Default for GestureDispatcher<P, K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies one transition: lock side effects, then the atomic pair of
/// direct notification and broadcast.
fn apply<P, K, C, S>(
    probe: &P,
    st: &mut ProbeGestures<K>,
    raw: Raw<K>,
    control: &mut C,
    handlers: &mut HashMap<K, Box<dyn InteractionTarget<P, K>>>,
    sink: &mut S,
) where
    P: Copy + Eq,
    K: Copy + Eq + Hash,
    C: FocusControl<P, K>,
    S: GestureSink<P, K>,
{
    let (event, release_slot) = match raw {
        Raw::Press(out) => {
            if let PressOutput::HoldStarted(Some(t)) = out
                && st.acquire(LockSlot::Press)
            {
                control.lock(probe, &t);
            }
            let release = matches!(
                out,
                PressOutput::HoldCompleted(_) | PressOutput::HoldCancelled(_)
            )
            .then_some(LockSlot::Press);
            (press_event(probe, control, &out), release)
        }
        Raw::Nav(out) => {
            if let AxisOutput::Started {
                target: Some(t), ..
            } = out
                && st.acquire(LockSlot::Nav)
            {
                control.lock(probe, &t);
            }
            let release = matches!(
                out,
                AxisOutput::Completed { .. } | AxisOutput::Cancelled { .. }
            )
            .then_some(LockSlot::Nav);
            (nav_event(probe, control, &out), release)
        }
        Raw::Manip(out) => {
            if let AxisOutput::Started {
                target: Some(t), ..
            } = out
                && st.acquire(LockSlot::Manip)
            {
                control.lock(probe, &t);
            }
            let release = matches!(
                out,
                AxisOutput::Completed { .. } | AxisOutput::Cancelled { .. }
            )
            .then_some(LockSlot::Manip);
            (manip_event(probe, control, &out), release)
        }
        Raw::MenuDown => (menu_event(probe, control, GestureKind::MenuPressed), None),
        Raw::MenuUp => (menu_event(probe, control, GestureKind::MenuReleased), None),
    };

    if let Some(t) = event.target
        && let Some(handler) = handlers.get_mut(&t)
    {
        handler.on_gesture(&t, &event);
    }
    sink.gesture(&event);

    if let Some(slot) = release_slot
        && st.release(slot)
    {
        control.unlock(probe);
    }
}

fn press_event<P, K, C>(probe: &P, control: &C, out: &PressOutput<K>) -> InteractionEvent<P, K>
where
    P: Copy,
    K: Copy,
    C: FocusControl<P, K>,
{
    let kind = match out {
        PressOutput::Press(_) => GestureKind::Press,
        PressOutput::Release(_) => GestureKind::Release,
        PressOutput::Tap(_) => GestureKind::Tap,
        PressOutput::DoubleTap(_) => GestureKind::DoubleTap,
        PressOutput::HoldStarted(_) => GestureKind::HoldStarted,
        PressOutput::HoldCompleted(_) => GestureKind::HoldCompleted,
        PressOutput::HoldCancelled(_) => GestureKind::HoldCancelled,
    };
    InteractionEvent {
        kind,
        target: out.target(),
        args: InteractionEventArgs {
            probe: *probe,
            position: control
                .hit_point(probe)
                .map_or(PositionPayload::None, PositionPayload::Absolute),
            ray: control.targeting_ray(probe),
        },
    }
}

fn nav_event<P, K, C>(
    probe: &P,
    control: &C,
    out: &AxisOutput<K, Vec2>,
) -> InteractionEvent<P, K>
where
    P: Copy,
    K: Copy,
    C: FocusControl<P, K>,
{
    let (kind, target, position) = match out {
        AxisOutput::Started { target, payload } => (
            GestureKind::NavigationStarted,
            *target,
            PositionPayload::Planar(*payload),
        ),
        AxisOutput::Updated { target, payload } => (
            GestureKind::NavigationUpdated,
            *target,
            PositionPayload::Planar(*payload),
        ),
        AxisOutput::Completed { target, payload } => (
            GestureKind::NavigationCompleted,
            *target,
            PositionPayload::Planar(*payload),
        ),
        AxisOutput::Cancelled { target } => (
            GestureKind::NavigationCancelled,
            *target,
            PositionPayload::None,
        ),
    };
    InteractionEvent {
        kind,
        target,
        args: InteractionEventArgs {
            probe: *probe,
            position,
            ray: control.targeting_ray(probe),
        },
    }
}

fn manip_event<P, K, C>(
    probe: &P,
    control: &C,
    out: &AxisOutput<K, Vector3<f64>>,
) -> InteractionEvent<P, K>
where
    P: Copy,
    K: Copy,
    C: FocusControl<P, K>,
{
    let (kind, target, position) = match out {
        AxisOutput::Started { target, payload } => (
            GestureKind::ManipulationStarted,
            *target,
            PositionPayload::Spatial(*payload),
        ),
        AxisOutput::Updated { target, payload } => (
            GestureKind::ManipulationUpdated,
            *target,
            PositionPayload::Spatial(*payload),
        ),
        AxisOutput::Completed { target, payload } => (
            GestureKind::ManipulationCompleted,
            *target,
            PositionPayload::Spatial(*payload),
        ),
        AxisOutput::Cancelled { target } => (
            GestureKind::ManipulationCancelled,
            *target,
            PositionPayload::None,
        ),
    };
    InteractionEvent {
        kind,
        target,
        args: InteractionEventArgs {
            probe: *probe,
            position,
            ray: control.targeting_ray(probe),
        },
    }
}

fn menu_event<P, K, C>(probe: &P, control: &C, kind: GestureKind) -> InteractionEvent<P, K>
where
    P: Copy,
    K: Copy,
    C: FocusControl<P, K>,
{
    InteractionEvent {
        kind,
        target: None,
        args: InteractionEventArgs {
            probe: *probe,
            position: PositionPayload::None,
            ray: control.targeting_ray(probe),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;
    use nalgebra::Point3;

    struct Control {
        prime: Option<u32>,
        chain: Vec<u32>,
        locked: Option<u32>,
        lock_calls: u32,
        unlock_calls: u32,
    }

    impl Control {
        fn aiming_at(node: u32) -> Self {
            Self {
                prime: Some(node),
                chain: alloc::vec![node],
                locked: None,
                lock_calls: 0,
                unlock_calls: 0,
            }
        }
        fn aiming_at_nothing() -> Self {
            Self {
                prime: None,
                chain: Vec::new(),
                locked: None,
                lock_calls: 0,
                unlock_calls: 0,
            }
        }
        fn drift_to(&mut self, node: u32) {
            self.prime = Some(node);
            self.chain = alloc::vec![node];
            if let Some(l) = self.locked
                && !self.chain.contains(&l)
            {
                // A locked node stays in the chain while the lock holds.
                self.chain.push(l);
            }
        }
    }

    impl FocusControl<u8, u32> for Control {
        fn prime_focus(&self, _probe: &u8) -> Option<u32> {
            self.locked.or(self.prime)
        }
        fn is_focused(&self, _probe: &u8, node: &u32) -> bool {
            self.chain.contains(node)
        }
        fn targeting_ray(&self, _probe: &u8) -> Option<Ray> {
            Some(Ray::new(Point3::origin(), -nalgebra::Vector3::z()))
        }
        fn hit_point(&self, _probe: &u8) -> Option<Point3<f64>> {
            Some(Point3::origin())
        }
        fn lock(&mut self, _probe: &u8, node: &u32) {
            self.locked = Some(*node);
            if !self.chain.contains(node) {
                self.chain.push(*node);
            }
            self.lock_calls += 1;
        }
        fn unlock(&mut self, _probe: &u8) {
            self.locked = None;
            self.unlock_calls += 1;
        }
    }

    #[derive(Default)]
    struct Log(Vec<(GestureKind, Option<u32>)>);
    impl GestureSink<u8, u32> for Log {
        fn gesture(&mut self, event: &InteractionEvent<u8, u32>) {
            self.0.push((event.kind, event.target));
        }
    }

    fn kinds(log: &Log) -> Vec<GestureKind> {
        log.0.iter().map(|(k, _)| *k).collect()
    }

    const PROBE: u8 = 1;

    #[test]
    fn tap_then_quick_tap_becomes_double_tap() {
        let mut d: GestureDispatcher<u8, u32> = GestureDispatcher::new();
        let mut control = Control::aiming_at(7);
        let mut log = Log::default();

        d.signals(PROBE).push(Signal::SelectDown);
        d.signals(PROBE).push(Signal::SelectUp);
        d.tick(0.0, 0.016, &mut control, &mut log);

        d.signals(PROBE).push(Signal::SelectDown);
        d.signals(PROBE).push(Signal::SelectUp);
        d.tick(0.5, 0.016, &mut control, &mut log);

        assert_eq!(
            kinds(&log),
            alloc::vec![
                GestureKind::Press,
                GestureKind::Release,
                GestureKind::Tap,
                GestureKind::Press,
                GestureKind::Release,
                GestureKind::DoubleTap,
            ]
        );
        assert!(log.0.iter().all(|(_, t)| *t == Some(7)));
    }

    #[test]
    fn slow_second_tap_stays_a_tap() {
        let mut d: GestureDispatcher<u8, u32> = GestureDispatcher::new();
        let mut control = Control::aiming_at(7);
        let mut log = Log::default();

        d.signals(PROBE).push(Signal::SelectDown);
        d.signals(PROBE).push(Signal::SelectUp);
        d.tick(0.0, 0.016, &mut control, &mut log);
        d.signals(PROBE).push(Signal::SelectDown);
        d.signals(PROBE).push(Signal::SelectUp);
        d.tick(1.0, 0.016, &mut control, &mut log);

        let taps = kinds(&log)
            .iter()
            .filter(|k| **k == GestureKind::Tap)
            .count();
        assert_eq!(taps, 2);
        assert!(!kinds(&log).contains(&GestureKind::DoubleTap));
    }

    #[test]
    fn hold_locks_and_completes_on_the_locked_target() {
        let mut d: GestureDispatcher<u8, u32> = GestureDispatcher::new();
        let mut control = Control::aiming_at(7);
        let mut log = Log::default();

        d.signals(PROBE).push(Signal::SelectDown);
        d.tick(0.0, 0.016, &mut control, &mut log);

        // The countdown elapses; the hold starts and locks focus to 7.
        d.tick(1.0, 1.0, &mut control, &mut log);
        assert_eq!(control.locked, Some(7));
        assert_eq!(control.lock_calls, 1);

        // The ray drifts to 9. Release still completes against 7.
        control.drift_to(9);
        d.signals(PROBE).push(Signal::SelectUp);
        d.tick(2.0, 0.016, &mut control, &mut log);

        assert!(log.0.contains(&(GestureKind::HoldStarted, Some(7))));
        assert!(log.0.contains(&(GestureKind::HoldCompleted, Some(7))));
        assert_eq!(control.unlock_calls, 1);
        assert_eq!(control.locked, None);
        // Unlocked resolution is authoritative again.
        assert_eq!(control.prime_focus(&PROBE), Some(9));
    }

    #[test]
    fn double_cancel_releases_the_lock_once() {
        let mut d: GestureDispatcher<u8, u32> = GestureDispatcher::new();
        let mut control = Control::aiming_at(7);
        let mut log = Log::default();

        d.signals(PROBE).push(Signal::SelectDown);
        d.tick(0.0, 0.016, &mut control, &mut log);
        d.tick(1.0, 1.0, &mut control, &mut log); // hold starts, lock taken

        d.signals(PROBE).push(Signal::Cancel);
        d.signals(PROBE).push(Signal::Cancel);
        d.tick(1.5, 0.016, &mut control, &mut log);

        let cancels = kinds(&log)
            .iter()
            .filter(|k| **k == GestureKind::HoldCancelled)
            .count();
        assert_eq!(cancels, 1);
        assert_eq!(control.unlock_calls, 1);
    }

    #[test]
    fn losing_focus_cancels_the_press() {
        let mut d: GestureDispatcher<u8, u32> = GestureDispatcher::new();
        let mut control = Control::aiming_at(7);
        let mut log = Log::default();

        d.signals(PROBE).push(Signal::SelectDown);
        d.tick(0.0, 0.016, &mut control, &mut log);

        // The target drops out of the probe's chain entirely.
        control.prime = None;
        control.chain.clear();
        d.tick(0.1, 0.016, &mut control, &mut log);

        assert!(log.0.contains(&(GestureKind::HoldCancelled, Some(7))));
        // A later release is a stray.
        d.signals(PROBE).push(Signal::SelectUp);
        d.tick(0.2, 0.016, &mut control, &mut log);
        assert!(!kinds(&log).contains(&GestureKind::Tap));
    }

    #[test]
    fn navigation_lifecycle_targets_the_start_node() {
        let mut d: GestureDispatcher<u8, u32> = GestureDispatcher::new();
        let mut control = Control::aiming_at(7);
        let mut log = Log::default();

        d.signals(PROBE).push(Signal::NavigationStart(Vec2::ZERO));
        d.tick(0.0, 0.016, &mut control, &mut log);
        assert_eq!(control.locked, Some(7));

        control.drift_to(9);
        d.signals(PROBE)
            .push(Signal::NavigationUpdate(Vec2::new(0.4, 0.0)));
        d.signals(PROBE)
            .push(Signal::NavigationComplete(Vec2::new(0.8, 0.0)));
        d.tick(0.5, 0.016, &mut control, &mut log);

        assert_eq!(
            log.0,
            alloc::vec![
                (GestureKind::NavigationStarted, Some(7)),
                (GestureKind::NavigationUpdated, Some(7)),
                (GestureKind::NavigationCompleted, Some(7)),
            ]
        );
        assert_eq!(control.unlock_calls, 1);
    }

    #[test]
    fn concurrent_hold_and_navigation_share_one_lock() {
        let mut d: GestureDispatcher<u8, u32> = GestureDispatcher::new();
        let mut control = Control::aiming_at(7);
        let mut log = Log::default();

        d.signals(PROBE).push(Signal::SelectDown);
        d.signals(PROBE).push(Signal::HoldConfirm);
        d.signals(PROBE).push(Signal::NavigationStart(Vec2::ZERO));
        d.tick(0.0, 0.016, &mut control, &mut log);
        assert_eq!(control.lock_calls, 1);

        // Finishing one gesture keeps the lock for the other.
        d.signals(PROBE).push(Signal::NavigationComplete(Vec2::ZERO));
        d.tick(0.5, 0.016, &mut control, &mut log);
        assert_eq!(control.unlock_calls, 0);
        assert_eq!(control.locked, Some(7));

        d.signals(PROBE).push(Signal::SelectUp);
        d.tick(1.0, 0.016, &mut control, &mut log);
        assert_eq!(control.unlock_calls, 1);
        assert_eq!(control.locked, None);
    }

    #[test]
    fn manipulation_payload_is_spatial() {
        let mut d: GestureDispatcher<u8, u32> = GestureDispatcher::new();
        let mut control = Control::aiming_at(7);

        struct Payloads(Vec<PositionPayload>);
        impl GestureSink<u8, u32> for Payloads {
            fn gesture(&mut self, event: &InteractionEvent<u8, u32>) {
                self.0.push(event.args.position);
            }
        }
        let mut sink = Payloads(Vec::new());

        let delta = nalgebra::Vector3::new(0.1, 0.2, 0.3);
        d.signals(PROBE)
            .push(Signal::ManipulationStart(nalgebra::Vector3::zeros()));
        d.signals(PROBE).push(Signal::ManipulationUpdate(delta));
        d.tick(0.0, 0.016, &mut control, &mut sink);

        assert_eq!(
            sink.0,
            alloc::vec![
                PositionPayload::Spatial(nalgebra::Vector3::zeros()),
                PositionPayload::Spatial(delta),
            ]
        );
    }

    #[test]
    fn menu_edges_broadcast_without_a_target() {
        let mut d: GestureDispatcher<u8, u32> = GestureDispatcher::new();
        let mut control = Control::aiming_at_nothing();
        let mut log = Log::default();

        d.signals(PROBE).push(Signal::MenuDown);
        d.signals(PROBE).push(Signal::MenuUp);
        d.tick(0.0, 0.016, &mut control, &mut log);

        assert_eq!(
            log.0,
            alloc::vec![
                (GestureKind::MenuPressed, None),
                (GestureKind::MenuReleased, None)
            ]
        );
    }

    #[test]
    fn signals_are_consumed_exactly_once() {
        let mut d: GestureDispatcher<u8, u32> = GestureDispatcher::new();
        let mut control = Control::aiming_at(7);
        let mut log = Log::default();

        d.signals(PROBE).push(Signal::MenuDown);
        d.tick(0.0, 0.016, &mut control, &mut log);
        assert_eq!(log.0.len(), 1);

        d.tick(0.1, 0.016, &mut control, &mut log);
        assert_eq!(log.0.len(), 1);
    }

    #[test]
    fn direct_handler_runs_before_the_broadcast() {
        let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

        struct Handler(Rc<RefCell<Vec<&'static str>>>);
        impl InteractionTarget<u8, u32> for Handler {
            fn on_gesture(&mut self, _node: &u32, event: &InteractionEvent<u8, u32>) {
                if event.kind == GestureKind::Tap {
                    self.0.borrow_mut().push("direct");
                }
            }
        }
        struct Sink(Rc<RefCell<Vec<&'static str>>>);
        impl GestureSink<u8, u32> for Sink {
            fn gesture(&mut self, event: &InteractionEvent<u8, u32>) {
                if event.kind == GestureKind::Tap {
                    self.0.borrow_mut().push("broadcast");
                }
            }
        }

        let mut d: GestureDispatcher<u8, u32> = GestureDispatcher::new();
        d.set_gesture_handler(7, Box::new(Handler(Rc::clone(&order))));
        let mut control = Control::aiming_at(7);
        let mut sink = Sink(Rc::clone(&order));

        d.signals(PROBE).push(Signal::SelectDown);
        d.signals(PROBE).push(Signal::SelectUp);
        d.tick(0.0, 0.016, &mut control, &mut sink);

        assert_eq!(&*order.borrow(), &["direct", "broadcast"]);
    }

    #[test]
    fn removing_a_probe_cancels_in_flight_gestures() {
        let mut d: GestureDispatcher<u8, u32> = GestureDispatcher::new();
        let mut control = Control::aiming_at(7);
        let mut log = Log::default();

        d.signals(PROBE).push(Signal::SelectDown);
        d.tick(0.0, 0.016, &mut control, &mut log);
        d.tick(1.0, 1.0, &mut control, &mut log); // hold + lock

        d.remove_probe(&PROBE, &mut control, &mut log);
        assert!(log.0.contains(&(GestureKind::HoldCancelled, Some(7))));
        assert_eq!(control.unlock_calls, 1);
        assert!(d.press_phase(&PROBE).is_none());
    }
}
