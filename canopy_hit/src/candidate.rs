// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Merged hit candidates: ordering and filter-gated selection.

use core::cmp::Ordering;

use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

use crate::provider::SceneGraph;
use crate::record::UiHitData;

/// Inline capacity of the per-tick candidate buffer.
///
/// UI and 3D passes together rarely produce more than a handful of
/// candidates; the buffer only spills to the heap past this bound.
pub const CANDIDATE_INLINE: usize = 16;

/// Bounded per-tick candidate buffer shared by the UI and 3D passes.
pub type CandidateBuf<K> = SmallVec<[Candidate<K>; CANDIDATE_INLINE]>;

/// What kind of pass produced a candidate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CandidateKind {
    /// Produced by the bounded 3D hit-test pass.
    Spatial,
    /// Produced by the UI hit-test pass.
    Ui(UiHitData),
}

impl CandidateKind {
    /// The UI data for a UI candidate, `None` for a 3D candidate.
    #[must_use]
    pub fn ui(&self) -> Option<&UiHitData> {
        match self {
            Self::Spatial => None,
            Self::Ui(data) => Some(data),
        }
    }

    /// Whether this is the provider's designated main UI hit.
    #[must_use]
    pub fn is_primary_ui(&self) -> bool {
        matches!(self, Self::Ui(data) if data.primary)
    }
}

/// One hit candidate from either pass, before selection.
#[derive(Clone, Copy, Debug)]
pub struct Candidate<K> {
    /// The node the ray struck.
    pub node: K,
    /// Distance from the ray origin to the hit point.
    pub distance: f64,
    /// World-space hit point.
    pub point: Point3<f64>,
    /// World-space surface normal at the hit point.
    pub normal: Vector3<f64>,
    /// Which pass produced the candidate, with UI data when applicable.
    pub kind: CandidateKind,
}

/// Total order over merged candidates.
///
/// Ascending by distance. At equal distance, two UI candidates order by
/// descending render depth, then ascending raycast index. A UI and a 3D
/// candidate at equal distance compare `Equal`: their relative order is
/// whatever the stable sort preserves from the merge.
pub fn compare_candidates<K>(a: &Candidate<K>, b: &Candidate<K>) -> Ordering {
    match a.distance.partial_cmp(&b.distance) {
        Some(Ordering::Less) => Ordering::Less,
        Some(Ordering::Greater) => Ordering::Greater,
        _ => match (a.kind.ui(), b.kind.ui()) {
            (Some(ua), Some(ub)) => ub
                .depth
                .cmp(&ua.depth)
                .then(ua.raycast_index.cmp(&ub.raycast_index)),
            _ => Ordering::Equal,
        },
    }
}

/// Stable-sorts a merged candidate buffer into selection order.
pub fn sort_candidates<K>(candidates: &mut CandidateBuf<K>) {
    candidates.sort_by(compare_candidates);
}

/// Walks sorted candidates and picks the first that qualifies.
///
/// A candidate qualifies if its node, or the nearest ancestor found via
/// [`SceneGraph::parent_of`], passes [`SceneGraph::passes_filter`]. The
/// returned pair is the candidate index and the qualifying node (which may
/// be an ancestor of the struck node).
///
/// Within a run of equal-distance candidates, the provider's designated
/// main UI hit takes precedence over a 3D candidate; otherwise the run's
/// order stands.
pub fn select_qualifying<K, G>(sorted: &[Candidate<K>], graph: &G) -> Option<(usize, K)>
where
    K: Copy + Eq,
    G: SceneGraph<K>,
{
    let mut i = 0;
    while i < sorted.len() {
        // Bound the run of candidates sharing this distance.
        let d = sorted[i].distance;
        let mut j = i + 1;
        while j < sorted.len() && sorted[j].distance == d {
            j += 1;
        }

        let mut chosen: Option<(usize, K)> = None;
        for (k, candidate) in sorted.iter().enumerate().take(j).skip(i) {
            let Some(node) = qualifying_node(candidate.node, graph) else {
                continue;
            };
            if candidate.kind.is_primary_ui() {
                // The main UI hit wins its distance run outright.
                return Some((k, node));
            }
            if chosen.is_none() {
                chosen = Some((k, node));
            }
        }
        if chosen.is_some() {
            return chosen;
        }
        i = j;
    }
    None
}

/// Resolves a struck node to itself or its nearest filter-passing ancestor.
fn qualifying_node<K, G>(node: K, graph: &G) -> Option<K>
where
    K: Copy + Eq,
    G: SceneGraph<K>,
{
    let mut cur = node;
    loop {
        if graph.passes_filter(&cur) {
            return Some(cur);
        }
        match graph.parent_of(&cur) {
            Some(p) => cur = p,
            None => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn spatial(node: u32, distance: f64) -> Candidate<u32> {
        Candidate {
            node,
            distance,
            point: Point3::origin(),
            normal: Vector3::zeros(),
            kind: CandidateKind::Spatial,
        }
    }

    fn ui(node: u32, distance: f64, depth: i32, raycast_index: u32, primary: bool) -> Candidate<u32> {
        Candidate {
            node,
            distance,
            point: Point3::origin(),
            normal: Vector3::zeros(),
            kind: CandidateKind::Ui(UiHitData {
                depth,
                raycast_index,
                texcoord: kurbo::Point::ZERO,
                payload: 0,
                primary,
            }),
        }
    }

    /// Everything qualifies; no parents.
    struct Open;
    impl SceneGraph<u32> for Open {
        fn parent_of(&self, _node: &u32) -> Option<u32> {
            None
        }
        fn passes_filter(&self, _node: &u32) -> bool {
            true
        }
    }

    #[test]
    fn sorts_ascending_by_distance() {
        let mut buf: CandidateBuf<u32> = smallvec![spatial(1, 3.0), spatial(2, 1.0), spatial(3, 2.0)];
        sort_candidates(&mut buf);
        let order: alloc::vec::Vec<u32> = buf.iter().map(|c| c.node).collect();
        assert_eq!(order, alloc::vec![2, 3, 1]);
    }

    #[test]
    fn equal_distance_ui_orders_by_descending_depth_then_index() {
        let mut buf: CandidateBuf<u32> = smallvec![
            ui(1, 1.0, 2, 0, false),
            ui(2, 1.0, 7, 1, false),
            ui(3, 1.0, 7, 0, false),
        ];
        sort_candidates(&mut buf);
        let order: alloc::vec::Vec<u32> = buf.iter().map(|c| c.node).collect();
        // Depth 7 beats depth 2; within depth 7, lower raycast index first.
        assert_eq!(order, alloc::vec![3, 2, 1]);
    }

    #[test]
    fn cross_kind_equal_distance_is_stable() {
        let mut buf: CandidateBuf<u32> = smallvec![ui(1, 1.0, 0, 0, false), spatial(2, 1.0)];
        sort_candidates(&mut buf);
        assert_eq!(buf[0].node, 1);
        assert_eq!(buf[1].node, 2);

        let mut buf: CandidateBuf<u32> = smallvec![spatial(2, 1.0), ui(1, 1.0, 0, 0, false)];
        sort_candidates(&mut buf);
        assert_eq!(buf[0].node, 2);
    }

    #[test]
    fn selects_nearest_qualifying() {
        let buf: CandidateBuf<u32> = smallvec![spatial(1, 1.0), spatial(2, 2.0)];
        let (idx, node) = select_qualifying(&buf, &Open).unwrap();
        assert_eq!((idx, node), (0, 1));
    }

    #[test]
    fn non_qualifying_node_promotes_to_ancestor() {
        // 10 fails the filter but its parent 1 passes.
        struct Gated;
        impl SceneGraph<u32> for Gated {
            fn parent_of(&self, node: &u32) -> Option<u32> {
                (*node == 10).then_some(1)
            }
            fn passes_filter(&self, node: &u32) -> bool {
                *node == 1
            }
        }
        let buf: CandidateBuf<u32> = smallvec![spatial(10, 1.0)];
        let (idx, node) = select_qualifying(&buf, &Gated).unwrap();
        assert_eq!(idx, 0);
        assert_eq!(node, 1);
    }

    #[test]
    fn skips_candidates_with_no_qualifying_ancestor() {
        struct OnlyTwo;
        impl SceneGraph<u32> for OnlyTwo {
            fn parent_of(&self, _node: &u32) -> Option<u32> {
                None
            }
            fn passes_filter(&self, node: &u32) -> bool {
                *node == 2
            }
        }
        let buf: CandidateBuf<u32> = smallvec![spatial(1, 1.0), spatial(2, 2.0)];
        let (_, node) = select_qualifying(&buf, &OnlyTwo).unwrap();
        assert_eq!(node, 2);
    }

    #[test]
    fn nothing_qualifies_is_a_miss() {
        struct Closed;
        impl SceneGraph<u32> for Closed {
            fn parent_of(&self, _node: &u32) -> Option<u32> {
                None
            }
            fn passes_filter(&self, _node: &u32) -> bool {
                false
            }
        }
        let buf: CandidateBuf<u32> = smallvec![spatial(1, 1.0)];
        assert!(select_qualifying(&buf, &Closed).is_none());
    }

    #[test]
    fn primary_ui_beats_spatial_at_equal_distance() {
        // Spatial candidate sorts first (stable merge order), but the
        // primary UI hit at the same distance wins selection.
        let mut buf: CandidateBuf<u32> = smallvec![spatial(2, 1.0), ui(1, 1.0, 0, 0, true)];
        sort_candidates(&mut buf);
        let (_, node) = select_qualifying(&buf, &Open).unwrap();
        assert_eq!(node, 1);
    }

    #[test]
    fn primary_ui_does_not_beat_a_nearer_spatial_hit() {
        let mut buf: CandidateBuf<u32> = smallvec![ui(1, 2.0, 0, 0, true), spatial(2, 1.0)];
        sort_candidates(&mut buf);
        let (_, node) = select_qualifying(&buf, &Open).unwrap();
        assert_eq!(node, 2);
    }
}
