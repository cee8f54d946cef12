// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Gaze ray stabilization.
//!
//! Head-tracked gaze rays jitter at the millimeter/milliradian level, which
//! makes small targets flicker in and out of focus. [`RayStabilizer`] applies
//! an exponential moving average to the ray's origin and direction. State is
//! explicit and advanced once per tick by [`RayStabilizer::apply`]; there are
//! no timers and nothing to poll.

use nalgebra::Vector3;

use crate::Ray;

/// Exponential smoothing filter for per-tick rays.
///
/// `smoothing` is the weight given to history, in `[0, 1)`. `0.0` passes
/// samples through unchanged; values near `1.0` respond slowly. The first
/// sample after construction or [`RayStabilizer::reset`] is passed through
/// as-is.
#[derive(Clone, Copy, Debug)]
pub struct RayStabilizer {
    smoothing: f64,
    state: Option<Ray>,
}

impl RayStabilizer {
    /// Creates a stabilizer with the given history weight.
    ///
    /// The weight is clamped into `[0, 1)`.
    #[must_use]
    pub fn new(smoothing: f64) -> Self {
        Self {
            smoothing: smoothing.clamp(0.0, 1.0 - f64::EPSILON),
            state: None,
        }
    }

    /// Feeds one raw ray and returns the smoothed ray.
    ///
    /// The input direction is normalized before blending so that a single
    /// long direction vector cannot dominate the average.
    pub fn apply(&mut self, ray: Ray) -> Ray {
        let sample = ray.normalized();
        let out = match self.state {
            None => sample,
            Some(prev) => {
                let a = self.smoothing;
                let origin = prev.origin + (sample.origin - prev.origin) * (1.0 - a);
                let blended: Vector3<f64> =
                    prev.direction * a + sample.direction * (1.0 - a);
                Ray::new(origin, blended).normalized()
            }
        };
        self.state = Some(out);
        out
    }

    /// Clears accumulated history.
    ///
    /// The next [`RayStabilizer::apply`] passes its sample through unchanged.
    pub fn reset(&mut self) {
        self.state = None;
    }
}

impl Default for RayStabilizer {
    fn default() -> Self {
        Self::new(0.65)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn first_sample_passes_through() {
        let mut s = RayStabilizer::new(0.9);
        let ray = Ray::new(Point3::new(1.0, 2.0, 3.0), Vector3::new(0.0, 0.0, -1.0));
        let out = s.apply(ray);
        assert_eq!(out.origin, ray.origin);
        assert!((out.direction - ray.direction).norm() < 1e-12);
    }

    #[test]
    fn zero_smoothing_tracks_input_exactly() {
        let mut s = RayStabilizer::new(0.0);
        s.apply(Ray::new(Point3::origin(), Vector3::new(0.0, 0.0, -1.0)));
        let next = Ray::new(Point3::new(5.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        let out = s.apply(next);
        assert!((out.origin - next.origin).norm() < 1e-12);
        assert!((out.direction - next.direction).norm() < 1e-12);
    }

    #[test]
    fn repeated_samples_converge() {
        let mut s = RayStabilizer::new(0.8);
        s.apply(Ray::new(Point3::origin(), Vector3::new(0.0, 0.0, -1.0)));
        let target = Ray::new(Point3::new(1.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        let mut out = target;
        for _ in 0..200 {
            out = s.apply(target);
        }
        assert!((out.origin - target.origin).norm() < 1e-6);
        assert!((out.direction - target.direction).norm() < 1e-6);
    }

    #[test]
    fn reset_forgets_history() {
        let mut s = RayStabilizer::new(0.9);
        s.apply(Ray::new(Point3::origin(), Vector3::new(0.0, 0.0, -1.0)));
        s.reset();
        let next = Ray::new(Point3::new(9.0, 9.0, 9.0), Vector3::new(0.0, 1.0, 0.0));
        let out = s.apply(next);
        assert_eq!(out.origin, next.origin);
    }

    #[test]
    fn smoothed_direction_stays_unit_length() {
        let mut s = RayStabilizer::new(0.5);
        s.apply(Ray::new(Point3::origin(), Vector3::new(0.0, 0.0, -1.0)));
        let out = s.apply(Ray::new(Point3::origin(), Vector3::new(0.0, 1.0, 0.0)));
        assert!((out.direction.norm() - 1.0).abs() < 1e-12);
    }
}
