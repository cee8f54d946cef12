// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hit-sample records and the recycling pool.

use alloc::vec::Vec;

use kurbo::Point;
use nalgebra::{Point3, Vector3};

/// UI-specific data attached to a hit on a flat UI surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UiHitData {
    /// Render depth of the hit element. Higher draws later (nearer).
    pub depth: i32,
    /// Index of the UI raycast that produced this hit.
    pub raycast_index: u32,
    /// Texture coordinate of the hit on the UI surface.
    pub texcoord: Point,
    /// Opaque host handle to the raw UI hit (e.g. an element id).
    pub payload: u64,
    /// Whether the provider designated this as its main UI hit.
    pub primary: bool,
}

/// One resolved hit sample.
///
/// Records are owned by a [`HitPool`] and handed out by [`HitHandle`]. A
/// record is only meaningful between [`HitPool::acquire`] and
/// [`HitPool::release`]; on release its node is cleared and its numeric
/// fields are zeroed before the slot is reissued.
#[derive(Clone, Debug)]
pub struct HitRecord<K> {
    /// The node that was hit, if any.
    pub node: Option<K>,
    /// Distance from the ray origin to the hit point.
    pub distance: f64,
    /// World-space hit point.
    pub point: Point3<f64>,
    /// World-space surface normal at the hit point.
    pub normal: Vector3<f64>,
    /// UI data when the hit landed on a UI surface; `None` for 3D hits.
    pub ui: Option<UiHitData>,
}

impl<K> HitRecord<K> {
    /// A cleared record: no node, zeroed numerics, no UI data.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            node: None,
            distance: 0.0,
            point: Point3::origin(),
            normal: Vector3::zeros(),
            ui: None,
        }
    }

    /// Whether this record represents a miss.
    #[must_use]
    pub fn is_miss(&self) -> bool {
        self.node.is_none()
    }

    fn reset(&mut self) {
        self.node = None;
        self.distance = 0.0;
        self.point = Point3::origin();
        self.normal = Vector3::zeros();
        self.ui = None;
    }
}

impl<K> Default for HitRecord<K> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Handle to a pooled [`HitRecord`].
///
/// Handles are plain indices. Holding a handle past [`HitPool::release`] and
/// reading through it afterwards is a programming error: the slot may have
/// been reissued. This is documented, not runtime-checked.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct HitHandle(usize);

impl HitHandle {
    const fn idx(self) -> usize {
        self.0
    }
}

/// Fixed-bound recycling pool of hit records.
///
/// The pool grows on demand up to a configured maximum and never blocks.
/// Acquiring with the pool full returns `None`; callers fall back to a
/// transient [`HitRecord::empty`] for that tick. Released slots are reset
/// before reuse.
///
/// ## Example
///
/// ```rust
/// use canopy_hit::HitPool;
///
/// let mut pool: HitPool<u32> = HitPool::new();
/// let h = pool.acquire().unwrap();
/// pool.get_mut(h).node = Some(7);
/// pool.get_mut(h).distance = 2.5;
/// pool.release(h);
/// // The slot is reissued cleared.
/// let h2 = pool.acquire().unwrap();
/// assert!(pool.get(h2).node.is_none());
/// assert_eq!(pool.get(h2).distance, 0.0);
/// ```
#[derive(Clone, Debug)]
pub struct HitPool<K> {
    records: Vec<HitRecord<K>>,
    free: Vec<usize>,
    max_records: usize,
}

/// Default bound on pooled records; generous for a handful of probes.
const DEFAULT_MAX_RECORDS: usize = 128;

impl<K> HitPool<K> {
    /// Creates a pool with the default record bound.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max(DEFAULT_MAX_RECORDS)
    }

    /// Creates a pool bounded at `max_records` live records.
    #[must_use]
    pub fn with_max(max_records: usize) -> Self {
        Self {
            records: Vec::new(),
            free: Vec::new(),
            max_records,
        }
    }

    /// Acquires a cleared record, growing the pool if needed.
    ///
    /// Returns `None` only when the configured maximum is reached and no
    /// released slot is available. Never blocks.
    pub fn acquire(&mut self) -> Option<HitHandle> {
        if let Some(idx) = self.free.pop() {
            return Some(HitHandle(idx));
        }
        if self.records.len() < self.max_records {
            self.records.push(HitRecord::empty());
            return Some(HitHandle(self.records.len() - 1));
        }
        None
    }

    /// Releases a record back to the pool, clearing its fields.
    ///
    /// The handle must not be used again afterwards.
    pub fn release(&mut self, handle: HitHandle) {
        self.records[handle.idx()].reset();
        self.free.push(handle.idx());
    }

    /// Reads a live record.
    #[must_use]
    pub fn get(&self, handle: HitHandle) -> &HitRecord<K> {
        &self.records[handle.idx()]
    }

    /// Mutably accesses a live record.
    #[must_use]
    pub fn get_mut(&mut self, handle: HitHandle) -> &mut HitRecord<K> {
        &mut self.records[handle.idx()]
    }

    /// Number of records currently handed out.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.records.len() - self.free.len()
    }

    /// Total slots ever created (live plus free).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    /// The configured growth bound.
    #[must_use]
    pub fn max_records(&self) -> usize {
        self.max_records
    }
}

impl<K> Default for HitPool<K> {
    fn default() -> Self {
        Self::new()
    }
}
