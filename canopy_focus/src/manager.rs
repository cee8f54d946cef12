// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Global focus bookkeeping: probe registry, reference counts, dispatch.

use alloc::boxed::Box;
use alloc::vec::Vec;

use canopy_hit::{SceneGraph, SceneHitTest, UiHitTest};
use hashbrown::{HashMap, HashSet};

use crate::probe::{FocusChain, Probe};
use crate::types::{FocusEventArgs, FocusSink, FocusTarget, ProbeId};

/// Owns the registered probes and runs the global dispatch passes.
///
/// After every probe has resolved ([`FocusManager::resolve_all`]),
/// [`FocusManager::dispatch`] runs four deterministic passes:
///
/// 1. **Aggregate**: union all focus chains into the global focused set.
/// 2. **Enter**: for each probe's enter list, increment the node's focus
///    reference count, then notify (direct handler, then sink) with the
///    post-increment count.
/// 3. **Exit**: for each probe's exit list, decrement (floored at zero),
///    then notify with the post-decrement count. A node abandoned by its
///    last probe observes zero within the same tick.
/// 4. **Prime-focus changes**: for each probe whose prime focus moved,
///    raise exit/enter notifications with the now-authoritative counts, and
///    route paired pointer-exit/pointer-enter events when the probe's
///    UI-interactive target changed.
///
/// Probes are visited in registration-slot order in every pass, so dispatch
/// is reproducible. Dispatch consumes the per-probe deltas: running it again
/// without new resolution emits nothing.
///
/// Construct one manager at startup and pass it by reference; there is no
/// ambient global instance. Registration changes made between ticks take
/// effect at the next tick.
pub struct FocusManager<K> {
    probes: Vec<Option<Probe<K>>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
    counts: HashMap<K, u32>,
    handlers: HashMap<K, Box<dyn FocusTarget<K>>>,
    // Chains of probes removed since the last dispatch; their exits still owe
    // notifications and count decrements.
    orphan_exits: Vec<(ProbeId, FocusChain<K>)>,
}

impl<K> core::fmt::Debug for FocusManager<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.probes.len();
        let alive = self.probes.iter().filter(|p| p.is_some()).count();
        f.debug_struct("FocusManager")
            .field("probes_total", &total)
            .field("probes_alive", &alive)
            .field("focused_nodes", &self.counts.len())
            .finish_non_exhaustive()
    }
}

impl<K: Copy + Eq + core::hash::Hash> FocusManager<K> {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            probes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            counts: HashMap::new(),
            handlers: HashMap::new(),
            orphan_exits: Vec::new(),
        }
    }

    /// Registers a probe; it participates from the next tick.
    pub fn add_probe(&mut self, probe: Probe<K>) -> ProbeId {
        if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.probes[idx] = Some(probe);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ProbeId uses 32-bit indices by design."
            )]
            ProbeId::new(idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.probes.push(Some(probe));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ProbeId uses 32-bit indices by design."
            )]
            ProbeId::new((self.probes.len() - 1) as u32, generation)
        }
    }

    /// Removes a probe.
    ///
    /// Nodes the probe was focusing are dispatched as exits (with correct
    /// counts) on the next [`FocusManager::dispatch`].
    pub fn remove_probe(&mut self, id: ProbeId) {
        if !self.is_alive(id) {
            return;
        }
        if let Some(slot) = self.probes.get_mut(id.idx())
            && let Some(probe) = slot.as_mut()
        {
            let chain = probe.take_chain();
            if !chain.is_empty() {
                tracing::debug!(
                    nodes = chain.len(),
                    "removing probe with live focus; exits dispatch next pass"
                );
                self.orphan_exits.push((id, chain));
            }
            *slot = None;
            self.free_list.push(id.idx());
        }
    }

    fn is_alive(&self, id: ProbeId) -> bool {
        self.probes.get(id.idx()).is_some_and(Option::is_some)
            && self.generations[id.idx()] == id.1
    }

    /// Accesses a live probe.
    #[must_use]
    pub fn probe(&self, id: ProbeId) -> Option<&Probe<K>> {
        if !self.is_alive(id) {
            return None;
        }
        self.probes[id.idx()].as_ref()
    }

    /// Mutably accesses a live probe (for feeding poses and flags).
    #[must_use]
    pub fn probe_mut(&mut self, id: ProbeId) -> Option<&mut Probe<K>> {
        if !self.is_alive(id) {
            return None;
        }
        self.probes[id.idx()].as_mut()
    }

    /// Iterates live probes with their identifiers, in slot order.
    pub fn probes(&self) -> impl Iterator<Item = (ProbeId, &Probe<K>)> {
        self.probes.iter().enumerate().filter_map(|(idx, slot)| {
            slot.as_ref().map(|p| {
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "ProbeId uses 32-bit indices by design."
                )]
                let id = ProbeId::new(idx as u32, self.generations[idx]);
                (id, p)
            })
        })
    }

    /// Registers the node-targeted focus handler for `node`.
    ///
    /// Replaces any previous handler. Takes effect at the next dispatch.
    pub fn set_focus_handler(&mut self, node: K, handler: Box<dyn FocusTarget<K>>) {
        self.handlers.insert(node, handler);
    }

    /// Removes the node-targeted focus handler for `node`.
    pub fn remove_focus_handler(&mut self, node: &K) {
        self.handlers.remove(node);
    }

    /// Pins `id`'s prime focus to `node` until released.
    ///
    /// Callable by external receivers that need to hold a target during a
    /// custom interaction; gesture machinery uses the same entry point.
    pub fn lock_focus(&mut self, id: ProbeId, node: K) {
        if let Some(probe) = self.probe_mut(id) {
            probe.lock(node);
        }
    }

    /// Releases `id`'s focus lock. Idempotent.
    pub fn release_focus(&mut self, id: ProbeId) {
        if let Some(probe) = self.probe_mut(id) {
            probe.release_lock();
        }
    }

    /// The number of probes whose focus chain currently contains `node`,
    /// as of the last dispatch.
    #[must_use]
    pub fn focus_count(&self, node: &K) -> u32 {
        self.counts.get(node).copied().unwrap_or(0)
    }

    /// Whether any probe currently focuses `node`.
    #[must_use]
    pub fn is_focused(&self, node: &K) -> bool {
        self.focus_count(node) > 0
    }

    /// Resolves every live probe against the host's providers, then rebuilds
    /// its focus chain. Runs before gesture dispatch each tick.
    pub fn resolve_all<G, S, U>(&mut self, graph: &G, scene: &S, ui: &U)
    where
        G: SceneGraph<K>,
        S: SceneHitTest<K>,
        U: UiHitTest<K>,
    {
        for slot in &mut self.probes {
            if let Some(probe) = slot {
                probe.resolve(graph, scene, ui);
                probe.rebuild_chain(graph);
            }
        }
    }

    /// Runs the four dispatch passes over this tick's deltas.
    pub fn dispatch<S: FocusSink<K>>(&mut self, sink: &mut S) {
        // Pass 1: aggregate the global focused set. Counts for nodes already
        // focused last tick carry over in `self.counts`; the set bounds the
        // final retention sweep.
        let mut focused: HashSet<K> = HashSet::new();
        for slot in self.probes.iter().flatten() {
            for node in slot.chain() {
                focused.insert(*node);
            }
        }

        // Pass 2: enters. Increment before notifying so handlers never see a
        // stale count.
        for idx in 0..self.probes.len() {
            let Some(probe) = self.probes[idx].as_ref() else {
                continue;
            };
            let id = self.id_at(idx);
            // Enter lists are consumed in pass order; cloning the small
            // delta keeps the borrow on `self` short.
            let enters: FocusChain<K> = probe.enters().iter().copied().collect();
            for node in enters {
                let count = {
                    let c = self.counts.entry(node).or_insert(0);
                    *c += 1;
                    *c
                };
                let args = FocusEventArgs {
                    probe: id,
                    focus_count: count,
                };
                if let Some(handler) = self.handlers.get_mut(&node) {
                    handler.on_focus_enter(&node, &args);
                }
                sink.focus_enter(&node, &args);
            }
        }

        // Pass 3: exits, including chains orphaned by probe removal.
        // Decrement before notifying; a node abandoned by its last probe
        // reads zero here, within the same tick.
        let mut exit_batches: Vec<(ProbeId, FocusChain<K>)> =
            core::mem::take(&mut self.orphan_exits);
        for idx in 0..self.probes.len() {
            let Some(probe) = self.probes[idx].as_ref() else {
                continue;
            };
            let id = self.id_at(idx);
            let exits: FocusChain<K> = probe.exits().iter().copied().collect();
            if !exits.is_empty() {
                exit_batches.push((id, exits));
            }
        }
        for (id, exits) in exit_batches {
            for node in exits {
                let count = match self.counts.get_mut(&node) {
                    Some(c) => {
                        *c = c.saturating_sub(1);
                        *c
                    }
                    None => 0,
                };
                let args = FocusEventArgs {
                    probe: id,
                    focus_count: count,
                };
                if let Some(handler) = self.handlers.get_mut(&node) {
                    handler.on_focus_exit(&node, &args);
                }
                sink.focus_exit(&node, &args);
            }
        }

        // Pass 4: prime-focus changes and UI pointer routing. Counts are
        // authoritative by now.
        for idx in 0..self.probes.len() {
            let Some(probe) = self.probes[idx].as_ref() else {
                continue;
            };
            let id = self.id_at(idx);
            let (old, new) = (probe.previous_prime_focus(), probe.prime_focus());
            let (old_ui, new_ui) = (probe.previous_ui_target(), probe.ui_target());
            if old != new {
                if let Some(node) = old {
                    let args = FocusEventArgs {
                        probe: id,
                        focus_count: self.focus_count(&node),
                    };
                    sink.prime_focus_exit(&node, &args);
                }
                if let Some(node) = new {
                    let args = FocusEventArgs {
                        probe: id,
                        focus_count: self.focus_count(&node),
                    };
                    sink.prime_focus_enter(&node, &args);
                }
            }
            if old_ui != new_ui {
                if let Some(node) = old_ui {
                    sink.pointer_exit(id, &node);
                }
                if let Some(node) = new_ui {
                    sink.pointer_enter(id, &node);
                }
            }
        }

        // Consume the deltas and drop dead count entries.
        for slot in &mut self.probes {
            if let Some(probe) = slot {
                probe.mark_dispatched();
            }
        }
        self.counts.retain(|node, count| *count > 0 && focused.contains(node));
    }

    fn id_at(&self, idx: usize) -> ProbeId {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "ProbeId uses 32-bit indices by design."
        )]
        ProbeId::new(idx as u32, self.generations[idx])
    }
}

impl<K: Copy + Eq + core::hash::Hash> Default for FocusManager<K> {
    fn default() -> Self {
        Self::new()
    }
}
