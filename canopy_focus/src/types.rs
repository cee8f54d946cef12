// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types: probe identifiers, capability flags, event args, sinks.

/// Identifier for a registered probe (generational).
///
/// Issued by [`FocusManager::add_probe`](crate::FocusManager::add_probe).
/// Stale identifiers (for removed probes) are rejected by lookups rather
/// than aliasing a reused slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ProbeId(pub(crate) u32, pub(crate) u32);

impl ProbeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Capability flags a device layer maintains on a probe.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ProbeFlags: u8 {
        /// The probe participates in focus resolution and dispatch.
        const CAN_INTERACT      = 0b0000_0001;
        /// The probe's select control is currently pressed.
        const SELECT_PRESSED    = 0b0000_0010;
        /// The probe's source is tracked and ready to interact.
        const INTERACTION_READY = 0b0000_0100;
    }
}

impl Default for ProbeFlags {
    fn default() -> Self {
        Self::CAN_INTERACT | Self::INTERACTION_READY
    }
}

/// What kind of input source drives a probe.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ProbeKind {
    /// Head gaze. Usually stabilized.
    Gaze,
    /// A hand or motion-controller ray.
    HandRay,
    /// An emulated pointer (e.g. mouse-driven in an editor or simulator).
    Emulated,
}

/// Immutable snapshot delivered with every focus transition.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FocusEventArgs {
    /// The probe whose chain change produced this event.
    pub probe: ProbeId,
    /// Number of probes focusing the target node, measured *after* the
    /// transition this event reports.
    pub focus_count: u32,
}

/// Capability interface for node-targeted focus notifications.
///
/// Hosts register one handler per node with
/// [`FocusManager::set_focus_handler`](crate::FocusManager::set_focus_handler);
/// the manager invokes it directly, before the broadcast to the
/// [`FocusSink`], for each transition touching that node.
pub trait FocusTarget<K> {
    /// The node gained a probe's focus. `args.focus_count` includes it.
    fn on_focus_enter(&mut self, node: &K, args: &FocusEventArgs);

    /// The node lost a probe's focus. `args.focus_count` excludes it, and is
    /// zero in the same tick the last probe left.
    fn on_focus_exit(&mut self, node: &K, args: &FocusEventArgs);
}

/// Broadcast receiver for the global dispatch passes.
///
/// Passed by the host into [`FocusManager::dispatch`](crate::FocusManager::dispatch).
/// Methods are invoked in the deterministic pass order documented there;
/// within a pass, probes are visited in registration-slot order.
pub trait FocusSink<K> {
    /// A node entered some probe's focus chain.
    fn focus_enter(&mut self, node: &K, args: &FocusEventArgs);

    /// A node left some probe's focus chain.
    fn focus_exit(&mut self, node: &K, args: &FocusEventArgs);

    /// A probe's prime focus moved off this node.
    fn prime_focus_exit(&mut self, node: &K, args: &FocusEventArgs);

    /// A probe's prime focus moved onto this node.
    fn prime_focus_enter(&mut self, node: &K, args: &FocusEventArgs);

    /// The probe's UI-interactive target changed; the old target's pointer
    /// leaves. Routed to the external UI layer. Default: ignored.
    fn pointer_exit(&mut self, probe: ProbeId, node: &K) {
        let _ = (probe, node);
    }

    /// Paired with [`FocusSink::pointer_exit`]; the new target's pointer
    /// enters. Default: ignored.
    fn pointer_enter(&mut self, probe: ProbeId, node: &K) {
        let _ = (probe, node);
    }
}
