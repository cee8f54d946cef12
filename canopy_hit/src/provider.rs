// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host-boundary traits: UI hit testing, 3D hit testing, scene parentage.
//!
//! The core never owns a scene. Hosts implement these three traits and the
//! probes query them once per tick. All of them are expected to be cheap and
//! allocation-free; the 3D pass writes into a caller-owned bounded buffer.

use canopy_ray::Ray;

use crate::candidate::CandidateBuf;

/// Parent links and the active filter gate over the host's scene graph.
///
/// Both queries are consulted live on every ancestor-walk step, so filter
/// membership can change between ticks (or even between probes within a
/// tick) and the walk sees the current state.
pub trait SceneGraph<K> {
    /// The parent of `node`, or `None` at a root.
    fn parent_of(&self, node: &K) -> Option<K>;

    /// Whether `node` is currently an eligible focus target.
    fn passes_filter(&self, node: &K) -> bool;
}

/// Outcome of the cheap preliminary 3D query.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PreHit {
    /// The ray hits nothing within range.
    Miss,
    /// The ray first hits a designated background/environment layer.
    Background,
    /// The ray hits interactable geometry; run the full query.
    Foreground,
}

/// Bounded 3D hit testing against the host's scene.
pub trait SceneHitTest<K> {
    /// One cheap preliminary query.
    ///
    /// Probes use this to skip the full query on ticks where the ray points
    /// at nothing or only at the environment.
    fn probe(&self, ray: &Ray, max_distance: f64) -> PreHit;

    /// The full bounded query, appending candidates to `out`.
    ///
    /// Implementations must respect `max_distance` and should keep results
    /// within the buffer's inline capacity; the buffer spills rather than
    /// truncates if they do not.
    fn cast(&self, ray: &Ray, max_distance: f64, out: &mut CandidateBuf<K>);
}

/// UI hit testing against the host's spatial-UI layer.
pub trait UiHitTest<K> {
    /// Appends ranked UI candidates for `ray` to `out`, bounded by
    /// `max_distance`.
    ///
    /// The provider marks at most one appended candidate as its designated
    /// main hit (`UiHitData::primary`); that candidate takes precedence over
    /// a 3D candidate at the same distance during selection.
    fn cast_ui(&self, ray: &Ray, max_distance: f64, out: &mut CandidateBuf<K>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{Candidate, CandidateKind};
    use nalgebra::{Point3, Vector3};
    use smallvec::SmallVec;

    // A provider returning one fixed spatial candidate; exercises the trait
    // surface the way a host would implement it.
    struct OneWall;
    impl SceneHitTest<u32> for OneWall {
        fn probe(&self, _ray: &Ray, max_distance: f64) -> PreHit {
            if max_distance >= 5.0 {
                PreHit::Foreground
            } else {
                PreHit::Miss
            }
        }
        fn cast(&self, ray: &Ray, max_distance: f64, out: &mut CandidateBuf<u32>) {
            if max_distance >= 5.0 {
                out.push(Candidate {
                    node: 1,
                    distance: 5.0,
                    point: ray.point_at(5.0),
                    normal: Vector3::z(),
                    kind: CandidateKind::Spatial,
                });
            }
        }
    }

    #[test]
    fn probe_gates_the_full_cast() {
        let wall = OneWall;
        let ray = Ray::new(Point3::origin(), -Vector3::z());
        assert_eq!(wall.probe(&ray, 2.0), PreHit::Miss);
        assert_eq!(wall.probe(&ray, 10.0), PreHit::Foreground);

        let mut out: CandidateBuf<u32> = SmallVec::new();
        wall.cast(&ray, 10.0, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].node, 1);
    }
}
