// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end spatial interaction: gaze + hand ray over a small scene.
//!
//! This example shows how to combine:
//! - `canopy_focus` for per-probe hit resolution and global enter/exit
//!   bubbling with reference counts,
//! - `canopy_gesture` for press/hold recognition with focus locking,
//! - host-implemented providers for the scene, UI layer, and parent links.
//!
//! Run:
//! - `cargo run -p canopy_demos --example gaze_select`

use std::collections::HashMap;

use canopy_focus::{FocusEventArgs, FocusManager, FocusSink, Probe, ProbeId};
use canopy_gesture::{
    GestureDispatcher, GestureSink, InteractionEvent, Signal,
};
use canopy_hit::{
    Candidate, CandidateBuf, CandidateKind, PreHit, SceneGraph, SceneHitTest, UiHitTest,
};
use canopy_ray::{PoseSample, Ray};
use kurbo::Vec2;
use nalgebra::{Point3, UnitQuaternion, Vector3};

/// Node identifiers for this little scene.
type Node = u32;

const PANEL: Node = 1;
const BUTTON_A: Node = 10;
const BUTTON_B: Node = 11;

/// Host scene: two buttons parented to a panel, all focusable.
struct Scene {
    parents: HashMap<Node, Node>,
    // World z-plane each node's quad sits on, keyed by node.
    quads: Vec<(Node, f64, f64)>, // (node, center x, distance)
}

impl Scene {
    fn new() -> Self {
        let mut parents = HashMap::new();
        parents.insert(BUTTON_A, PANEL);
        parents.insert(BUTTON_B, PANEL);
        Self {
            parents,
            quads: vec![(BUTTON_A, -0.5, 2.0), (BUTTON_B, 0.5, 2.0)],
        }
    }
}

impl SceneGraph<Node> for Scene {
    fn parent_of(&self, node: &Node) -> Option<Node> {
        self.parents.get(node).copied()
    }
    fn passes_filter(&self, _node: &Node) -> bool {
        true
    }
}

impl SceneHitTest<Node> for Scene {
    fn probe(&self, ray: &Ray, max: f64) -> PreHit {
        let mut out = CandidateBuf::new();
        self.cast(ray, max, &mut out);
        if out.is_empty() {
            PreHit::Miss
        } else {
            PreHit::Foreground
        }
    }

    fn cast(&self, ray: &Ray, max: f64, out: &mut CandidateBuf<Node>) {
        // Quads face the probe at z = -distance; a hit needs the ray to
        // pass within 0.4 units of the quad center at that depth.
        for &(node, center_x, distance) in &self.quads {
            if distance > max {
                continue;
            }
            let at = ray.point_at(distance);
            if (at.x - center_x).abs() <= 0.4 {
                out.push(Candidate {
                    node,
                    distance,
                    point: at,
                    normal: Vector3::z(),
                    kind: CandidateKind::Spatial,
                });
            }
        }
    }
}

/// No spatial-UI layer in this demo.
struct NoUi;
impl UiHitTest<Node> for NoUi {
    fn cast_ui(&self, _ray: &Ray, _max: f64, _out: &mut CandidateBuf<Node>) {}
}

struct Printer;
impl FocusSink<Node> for Printer {
    fn focus_enter(&mut self, node: &Node, args: &FocusEventArgs) {
        println!("  focus enter  node={node} count={}", args.focus_count);
    }
    fn focus_exit(&mut self, node: &Node, args: &FocusEventArgs) {
        println!("  focus exit   node={node} count={}", args.focus_count);
    }
    fn prime_focus_exit(&mut self, node: &Node, _args: &FocusEventArgs) {
        println!("  prime exit   node={node}");
    }
    fn prime_focus_enter(&mut self, node: &Node, _args: &FocusEventArgs) {
        println!("  prime enter  node={node}");
    }
}

impl GestureSink<ProbeId, Node> for Printer {
    fn gesture(&mut self, event: &InteractionEvent<ProbeId, Node>) {
        println!("  gesture {:?} target={:?}", event.kind, event.target);
    }
}

/// Aim a pose at world x offset `x` on the z = -2 plane.
fn aim(x: f64) -> Option<PoseSample> {
    let target = Point3::new(x, 0.0, -2.0);
    let dir = (target - Point3::origin()).normalize();
    // Rotation taking -Z to the aim direction.
    let rot = UnitQuaternion::rotation_between(&-Vector3::z(), &dir)
        .unwrap_or_else(UnitQuaternion::identity);
    Some(PoseSample::new(Point3::origin(), rot))
}

fn main() {
    let scene = Scene::new();
    let mut focus: FocusManager<Node> = FocusManager::new();
    let gaze = focus.add_probe(Probe::gaze());
    let hand = focus.add_probe(Probe::hand_ray());
    let mut gestures: GestureDispatcher<ProbeId, Node> = GestureDispatcher::new();
    let mut printer = Printer;

    let dt = 1.0 / 60.0;
    let mut now = 0.0;

    // Script: both probes find button A, the hand presses and holds it,
    // drifts to button B while holding, releases, then drags B.
    let script: Vec<(&str, f64, f64, Vec<Signal>)> = vec![
        ("both probes on button A", -0.5, -0.5, vec![]),
        ("hand presses", -0.5, -0.5, vec![Signal::SelectDown]),
        ("hold threshold elapses", -0.5, -0.5, vec![]),
        ("hand drifts to B while holding", -0.5, 0.5, vec![]),
        ("hand releases", -0.5, 0.5, vec![Signal::SelectUp]),
        ("unlocked hand reports B", -0.5, 0.5, vec![]),
        (
            "hand drags B",
            -0.5,
            0.5,
            vec![
                Signal::NavigationStart(Vec2::ZERO),
                Signal::NavigationUpdate(Vec2::new(0.3, 0.0)),
                Signal::NavigationComplete(Vec2::new(0.6, 0.0)),
            ],
        ),
    ];

    for (label, gaze_x, hand_x, signals) in script {
        println!("== {label} ==");
        focus.probe_mut(gaze).unwrap().set_pose(aim(gaze_x));
        focus.probe_mut(hand).unwrap().set_pose(aim(hand_x));
        focus.resolve_all(&scene, &scene, &NoUi);

        for s in signals {
            gestures.signals(hand).push(s);
        }
        // A long step after the press makes the hold threshold elapse.
        let step = if label.starts_with("hold") { 0.6 } else { dt };
        now += step;
        gestures.tick(now, step, &mut focus, &mut printer);

        focus.dispatch(&mut printer);
    }
}
