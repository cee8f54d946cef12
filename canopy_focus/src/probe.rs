// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One ray-casting input probe: hit resolution and the per-probe focus chain.

use canopy_hit::{
    Candidate, CandidateBuf, HitHandle, HitPool, HitRecord, PreHit, SceneGraph, SceneHitTest,
    UiHitTest, select_qualifying, sort_candidates,
};
use canopy_ray::{PoseSample, Ray, RayStabilizer};
use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

use crate::types::{ProbeFlags, ProbeKind};

/// Ancestor path of qualifying nodes, prime focus first.
///
/// Chains are rebuilt every tick; the inline capacity covers typical scene
/// depths without allocating.
pub type FocusChain<K> = SmallVec<[K; 8]>;

/// Default reach of a probe's ray, in world units.
const DEFAULT_MAX_DISTANCE: f64 = 10.0;

/// One ray-based input probe.
///
/// A probe owns its ray, its current hit sample (drawn from a private
/// recycling pool), its prime focus, and its focus chain with per-tick
/// enter/exit deltas. It is fed a [`PoseSample`] per tick and queried by the
/// [`FocusManager`](crate::FocusManager) after resolution.
///
/// A probe that cannot produce a valid ray (the device is untracked, or the
/// pose was malformed) resolves a miss every tick. A miss is a normal
/// value: the hit record has no node and its point sits at the ray's maximum
/// reach, so a cursor can still be placed.
#[derive(Debug)]
pub struct Probe<K> {
    kind: ProbeKind,
    flags: ProbeFlags,
    stabilizer: Option<RayStabilizer>,
    max_distance: f64,
    pose: Option<PoseSample>,
    ray: Ray,
    pool: HitPool<K>,
    hit: Option<HitHandle>,
    // Transient record used when the pool declines to grow.
    overflow: Option<HitRecord<K>>,
    prime: Option<K>,
    prev_prime: Option<K>,
    chain: FocusChain<K>,
    prev_chain: FocusChain<K>,
    enters: FocusChain<K>,
    exits: FocusChain<K>,
    locked: Option<K>,
    ui_target: Option<K>,
    prev_ui_target: Option<K>,
}

impl<K: Copy + Eq> Probe<K> {
    /// Creates a probe of the given kind with default settings.
    #[must_use]
    pub fn new(kind: ProbeKind) -> Self {
        Self {
            kind,
            flags: ProbeFlags::default(),
            stabilizer: None,
            max_distance: DEFAULT_MAX_DISTANCE,
            pose: None,
            ray: Ray::new(Point3::origin(), -Vector3::z()),
            pool: HitPool::new(),
            hit: None,
            overflow: None,
            prime: None,
            prev_prime: None,
            chain: SmallVec::new(),
            prev_chain: SmallVec::new(),
            enters: SmallVec::new(),
            exits: SmallVec::new(),
            locked: None,
            ui_target: None,
            prev_ui_target: None,
        }
    }

    /// A stabilized head-gaze probe.
    #[must_use]
    pub fn gaze() -> Self {
        Self::new(ProbeKind::Gaze).with_stabilizer(RayStabilizer::default())
    }

    /// A hand or motion-controller ray probe.
    #[must_use]
    pub fn hand_ray() -> Self {
        Self::new(ProbeKind::HandRay)
    }

    /// An emulated pointer probe (editor or simulator input).
    #[must_use]
    pub fn emulated() -> Self {
        Self::new(ProbeKind::Emulated)
    }

    /// Attaches a ray stabilizer.
    #[must_use]
    pub fn with_stabilizer(mut self, stabilizer: RayStabilizer) -> Self {
        self.stabilizer = Some(stabilizer);
        self
    }

    /// Overrides the probe's maximum reach.
    #[must_use]
    pub fn with_max_distance(mut self, max_distance: f64) -> Self {
        self.max_distance = max_distance;
        self
    }

    /// The probe's kind.
    #[must_use]
    pub fn kind(&self) -> ProbeKind {
        self.kind
    }

    /// Current capability flags.
    #[must_use]
    pub fn flags(&self) -> ProbeFlags {
        self.flags
    }

    /// Replaces the capability flags (maintained by the device layer).
    pub fn set_flags(&mut self, flags: ProbeFlags) {
        self.flags = flags;
    }

    /// Supplies this tick's pose, or `None` when the device has no signal.
    ///
    /// The sample is consumed by the next [`Probe::resolve`]; feeding a new
    /// one replaces an unconsumed sample.
    pub fn set_pose(&mut self, pose: Option<PoseSample>) {
        self.pose = pose;
    }

    /// The ray used for the most recent resolution.
    #[must_use]
    pub fn ray(&self) -> Ray {
        self.ray
    }

    /// The current hit sample, valid until the next [`Probe::resolve`].
    ///
    /// Always present after the first resolution; a miss is a record with no
    /// node whose point sits at maximum reach.
    #[must_use]
    pub fn hit(&self) -> Option<&HitRecord<K>> {
        match self.hit {
            Some(h) => Some(self.pool.get(h)),
            None => self.overflow.as_ref(),
        }
    }

    /// World-space point for cursor placement: the hit point, or the ray's
    /// end at maximum reach before the first resolution.
    #[must_use]
    pub fn cursor_point(&self) -> Point3<f64> {
        match self.hit() {
            Some(r) => r.point,
            None => self.ray.point_at(self.max_distance),
        }
    }

    /// The prime focus resolved for the current tick.
    #[must_use]
    pub fn prime_focus(&self) -> Option<K> {
        self.prime
    }

    /// The prime focus as of the last dispatched tick.
    #[must_use]
    pub fn previous_prime_focus(&self) -> Option<K> {
        self.prev_prime
    }

    /// The current focus chain, prime focus first.
    #[must_use]
    pub fn chain(&self) -> &[K] {
        &self.chain
    }

    /// Nodes that entered the chain this tick.
    #[must_use]
    pub fn enters(&self) -> &[K] {
        &self.enters
    }

    /// Nodes that left the chain this tick.
    #[must_use]
    pub fn exits(&self) -> &[K] {
        &self.exits
    }

    /// Whether `node` is in the current focus chain.
    #[must_use]
    pub fn is_focused(&self, node: &K) -> bool {
        self.chain.contains(node)
    }

    /// The UI-interactive target (the hit node when the hit landed on UI).
    #[must_use]
    pub fn ui_target(&self) -> Option<K> {
        self.ui_target
    }

    pub(crate) fn previous_ui_target(&self) -> Option<K> {
        self.prev_ui_target
    }

    /// Pins the prime focus to `node` until [`Probe::release_lock`].
    ///
    /// While locked, candidate selection is bypassed: the lock target is the
    /// prime focus even if the ray drifts or misses. Ray and hit-point data
    /// still update for cursor placement.
    pub fn lock(&mut self, node: K) {
        self.locked = Some(node);
    }

    /// Releases a focus lock. Idempotent.
    pub fn release_lock(&mut self) {
        self.locked = None;
    }

    /// The lock target, if any.
    #[must_use]
    pub fn locked(&self) -> Option<K> {
        self.locked
    }

    /// Resolves this tick's hit: pose → ray → UI pass → 3D pass → selection.
    ///
    /// The consumed pose is validated; an absent or malformed pose resolves
    /// a miss along the last known ray (never an error). With no UI
    /// candidates, one cheap preliminary 3D query runs first: a miss or a
    /// background-layer hit short-circuits to the default miss position and
    /// skips the full query for the tick. Otherwise the bounded 3D pass runs
    /// and its candidates merge with the UI pass's for sorted, filter-gated
    /// selection.
    ///
    /// A probe without [`ProbeFlags::CAN_INTERACT`] resolves a miss without
    /// querying the providers, so its chain drains deterministically.
    pub fn resolve<G, S, U>(&mut self, graph: &G, scene: &S, ui: &U)
    where
        G: SceneGraph<K>,
        S: SceneHitTest<K>,
        U: UiHitTest<K>,
    {
        let Some(pose) = self.pose.take().and_then(PoseSample::validate) else {
            self.store_miss();
            return;
        };
        let mut ray = pose.ray();
        if let Some(stabilizer) = &mut self.stabilizer {
            ray = stabilizer.apply(ray);
        }
        self.ray = ray;

        if !self.flags.contains(ProbeFlags::CAN_INTERACT) {
            self.store_miss();
            return;
        }

        let mut candidates: CandidateBuf<K> = CandidateBuf::new();
        ui.cast_ui(&ray, self.max_distance, &mut candidates);

        // With no UI hit, a cheap preliminary query decides whether the full
        // 3D pass is worth running at all this tick.
        let run_full = if candidates.is_empty() {
            matches!(scene.probe(&ray, self.max_distance), PreHit::Foreground)
        } else {
            true
        };
        if run_full {
            scene.cast(&ray, self.max_distance, &mut candidates);
        }
        if candidates.is_empty() {
            self.store_miss();
            return;
        }

        sort_candidates(&mut candidates);
        match select_qualifying(&candidates, graph) {
            Some((idx, node)) => {
                let chosen = candidates[idx];
                self.store_hit(&chosen, node);
            }
            None => self.store_miss(),
        }
    }

    /// Rebuilds the focus chain and its enter/exit deltas for this tick.
    ///
    /// If a lock is set, the lock target is the prime focus and candidate
    /// selection is bypassed. The chain walks from the prime focus through
    /// parents, keeping only nodes that pass the filter gate (queried live
    /// at each step) and stopping at the first non-qualifying ancestor.
    pub fn rebuild_chain<G>(&mut self, graph: &G)
    where
        G: SceneGraph<K>,
    {
        core::mem::swap(&mut self.chain, &mut self.prev_chain);
        self.chain.clear();
        self.prev_prime = self.prime;
        self.prev_ui_target = self.ui_target;

        self.prime = match self.locked {
            Some(node) => Some(node),
            None => self.hit().and_then(|r| r.node),
        };

        let mut cur = self.prime;
        while let Some(node) = cur {
            if !graph.passes_filter(&node) {
                break;
            }
            self.chain.push(node);
            cur = graph.parent_of(&node);
        }

        self.enters.clear();
        self.exits.clear();
        for n in &self.chain {
            if !self.prev_chain.contains(n) {
                self.enters.push(*n);
            }
        }
        for n in &self.prev_chain {
            if !self.chain.contains(n) {
                self.exits.push(*n);
            }
        }

        self.ui_target = match self.hit() {
            Some(r) if r.ui.is_some() => r.node,
            _ => None,
        };
    }

    /// Consumes this tick's deltas after the global dispatch pass.
    ///
    /// Clears the enter/exit lists and synchronizes the previous-tick
    /// snapshots, so dispatching again without new resolution emits nothing.
    pub(crate) fn mark_dispatched(&mut self) {
        self.enters.clear();
        self.exits.clear();
        self.prev_prime = self.prime;
        self.prev_ui_target = self.ui_target;
    }

    /// Drains the current chain, used when a probe is removed mid-session.
    pub(crate) fn take_chain(&mut self) -> FocusChain<K> {
        core::mem::take(&mut self.chain)
    }

    fn store_hit(&mut self, chosen: &Candidate<K>, node: K) {
        let ui = chosen.kind.ui().copied();
        let (distance, point, normal) = (chosen.distance, chosen.point, chosen.normal);
        self.fill(|r| {
            r.node = Some(node);
            r.distance = distance;
            r.point = point;
            r.normal = normal;
            r.ui = ui;
        });
    }

    fn store_miss(&mut self) {
        let point = self.ray.point_at(self.max_distance);
        let distance = self.max_distance;
        self.fill(|r| {
            r.node = None;
            r.distance = distance;
            r.point = point;
            r.normal = Vector3::zeros();
            r.ui = None;
        });
    }

    fn fill(&mut self, write: impl FnOnce(&mut HitRecord<K>)) {
        if let Some(h) = self.hit.take() {
            self.pool.release(h);
        }
        self.overflow = None;
        match self.pool.acquire() {
            Some(h) => {
                write(self.pool.get_mut(h));
                self.hit = Some(h);
            }
            None => {
                let mut record = HitRecord::empty();
                write(&mut record);
                self.overflow = Some(record);
            }
        }
    }
}
