// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Focus-control adapter for `canopy_focus`.
//!
//! With this adapter, a [`GestureDispatcher`](crate::GestureDispatcher)
//! keyed by [`ProbeId`] drives gesture locking directly against a
//! [`FocusManager`]: Hold/Navigation/Manipulation starts pin the
//! originating probe's prime focus, and terminating transitions release it.

use canopy_focus::{FocusManager, ProbeId};
use canopy_ray::Ray;
use nalgebra::Point3;

use crate::dispatcher::FocusControl;

impl<K: Copy + Eq + core::hash::Hash> FocusControl<ProbeId, K> for FocusManager<K> {
    fn prime_focus(&self, probe: &ProbeId) -> Option<K> {
        self.probe(*probe).and_then(|p| p.prime_focus())
    }

    fn is_focused(&self, probe: &ProbeId, node: &K) -> bool {
        self.probe(*probe).is_some_and(|p| p.is_focused(node))
    }

    fn targeting_ray(&self, probe: &ProbeId) -> Option<Ray> {
        self.probe(*probe).map(|p| p.ray())
    }

    fn hit_point(&self, probe: &ProbeId) -> Option<Point3<f64>> {
        self.probe(*probe).map(|p| p.cursor_point())
    }

    fn lock(&mut self, probe: &ProbeId, node: &K) {
        self.lock_focus(*probe, *node);
    }

    fn unlock(&mut self, probe: &ProbeId) {
        self.release_focus(*probe);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{GestureDispatcher, GestureKind, GestureSink, InteractionEvent};
    use crate::signals::Signal;
    use alloc::vec::Vec;
    use canopy_focus::Probe;
    use canopy_hit::{Candidate, CandidateBuf, CandidateKind, PreHit, SceneGraph, SceneHitTest, UiHitTest};
    use canopy_ray::PoseSample;
    use nalgebra::{UnitQuaternion, Vector3};

    struct Graph;
    impl SceneGraph<u32> for Graph {
        fn parent_of(&self, _node: &u32) -> Option<u32> {
            None
        }
        fn passes_filter(&self, _node: &u32) -> bool {
            true
        }
    }

    struct Scene(Option<(u32, f64)>);
    impl SceneHitTest<u32> for Scene {
        fn probe(&self, _ray: &Ray, _max: f64) -> PreHit {
            if self.0.is_some() {
                PreHit::Foreground
            } else {
                PreHit::Miss
            }
        }
        fn cast(&self, ray: &Ray, max: f64, out: &mut CandidateBuf<u32>) {
            if let Some((node, distance)) = self.0
                && distance <= max
            {
                out.push(Candidate {
                    node,
                    distance,
                    point: ray.point_at(distance),
                    normal: Vector3::z(),
                    kind: CandidateKind::Spatial,
                });
            }
        }
    }

    struct NoUi;
    impl UiHitTest<u32> for NoUi {
        fn cast_ui(&self, _ray: &Ray, _max: f64, _out: &mut CandidateBuf<u32>) {}
    }

    #[derive(Default)]
    struct Log(Vec<(GestureKind, Option<u32>)>);
    impl GestureSink<ProbeId, u32> for Log {
        fn gesture(&mut self, event: &InteractionEvent<ProbeId, u32>) {
            self.0.push((event.kind, event.target));
        }
    }

    fn resolve(mgr: &mut FocusManager<u32>, id: ProbeId, scene: &Scene) {
        mgr.probe_mut(id).unwrap().set_pose(Some(PoseSample::new(
            Point3::origin(),
            UnitQuaternion::identity(),
        )));
        mgr.resolve_all(&Graph, scene, &NoUi);
    }

    // End-to-end: a hold locked through the manager survives ray drift, and
    // the tick after release resolves the drifted target again.
    #[test]
    fn hold_through_manager_survives_drift() {
        let mut mgr: FocusManager<u32> = FocusManager::new();
        let id = mgr.add_probe(Probe::hand_ray());
        let mut gestures: GestureDispatcher<ProbeId, u32> = GestureDispatcher::new();
        let mut log = Log::default();

        // Tick 1: aim at node 1, press.
        resolve(&mut mgr, id, &Scene(Some((1, 3.0))));
        gestures.signals(id).push(Signal::SelectDown);
        gestures.tick(0.0, 0.016, &mut mgr, &mut log);

        // Tick 2: the hold threshold elapses; focus locks to 1.
        resolve(&mut mgr, id, &Scene(Some((1, 3.0))));
        gestures.tick(1.0, 1.0, &mut mgr, &mut log);
        assert_eq!(mgr.probe(id).unwrap().locked(), Some(1));

        // Tick 3: the ray drifts to node 2; the locked prime stays 1.
        resolve(&mut mgr, id, &Scene(Some((2, 3.0))));
        assert_eq!(mgr.probe(id).unwrap().prime_focus(), Some(1));
        gestures.signals(id).push(Signal::SelectUp);
        gestures.tick(2.0, 0.016, &mut mgr, &mut log);
        assert!(log.0.contains(&(GestureKind::HoldCompleted, Some(1))));
        assert_eq!(mgr.probe(id).unwrap().locked(), None);

        // Tick 4: unlocked resolution reports the drifted target.
        resolve(&mut mgr, id, &Scene(Some((2, 3.0))));
        assert_eq!(mgr.probe(id).unwrap().prime_focus(), Some(2));
    }
}
