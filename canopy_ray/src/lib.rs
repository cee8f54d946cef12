// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Ray: ray and pose primitives for spatial input probes.
//!
//! A spatial probe (gaze, hand ray, motion controller, emulated pointer) is
//! fed one [`PoseSample`] per tick by a device layer and derives a [`Ray`]
//! from it. This crate holds those two types plus the optional
//! [`RayStabilizer`] used to smooth noisy gaze poses.
//!
//! Device data is untrusted: a sample containing non-finite numbers (a
//! tracker dropout, an uninitialized transform) is rejected by
//! [`PoseSample::validate`] and the tick proceeds as "no signal". That is a
//! normal value here, never an error.
//!
//! ## Conventions
//!
//! - Right-handed coordinates, `-Z` is the forward aim axis, matching the
//!   usual XR device convention.
//! - Directions from [`PoseSample`] are unit length; a raw [`Ray`] does not
//!   require a normalized direction.
//!
//! ## Features
//!
//! - `std` (default): enables `std` support for `nalgebra`.
//! - `libm`: enables `no_std` builds that rely on `libm` for floating-point
//!   math.
//!
//! This crate is `no_std`.

#![no_std]

use nalgebra::{Point3, UnitQuaternion, Vector3};

mod stabilize;

pub use stabilize::RayStabilizer;

/// A ray defined by an origin point and a direction vector.
///
/// The direction does not need to be normalized, but must be non-zero for
/// the ray to be meaningful. Hit-test providers receive rays produced from
/// validated poses, which always carry unit directions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The origin of the ray.
    pub origin: Point3<f64>,
    /// The direction of the ray (not necessarily normalized).
    pub direction: Vector3<f64>,
}

impl Ray {
    /// Creates a new ray with the given origin and direction.
    #[must_use]
    pub const fn new(origin: Point3<f64>, direction: Vector3<f64>) -> Self {
        Self { origin, direction }
    }

    /// Returns the point along the ray at parameter `t`.
    ///
    /// The point is computed as `origin + t * direction`.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point3<f64> {
        self.origin + self.direction * t
    }

    /// Returns a normalized version of this ray.
    ///
    /// If the direction is (near) zero, returns the ray unchanged.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let norm = self.direction.norm();
        if norm < f64::EPSILON {
            return *self;
        }
        Self {
            origin: self.origin,
            direction: self.direction / norm,
        }
    }

    /// Returns the direction normalized to unit length.
    ///
    /// If the direction is zero, returns the zero vector.
    #[must_use]
    pub fn direction_normalized(&self) -> Vector3<f64> {
        let norm = self.direction.norm();
        if norm < f64::EPSILON {
            return Vector3::zeros();
        }
        self.direction / norm
    }
}

/// One pose delivered by a device layer for a single tick.
///
/// A pose is a position plus an orientation; the aim direction is the
/// orientation applied to the `-Z` axis. Samples are consumed by value once
/// per tick and are not retained across ticks by the core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    /// Position of the probe source in world space.
    pub position: Point3<f64>,
    /// Orientation of the probe source in world space.
    pub orientation: UnitQuaternion<f64>,
}

impl PoseSample {
    /// Creates a pose sample from a position and orientation.
    #[must_use]
    pub const fn new(position: Point3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// The forward aim direction of this pose (unit length).
    #[must_use]
    pub fn forward(&self) -> Vector3<f64> {
        self.orientation * -Vector3::z()
    }

    /// Derives the aiming ray for this pose.
    #[must_use]
    pub fn ray(&self) -> Ray {
        Ray::new(self.position, self.forward())
    }

    /// Validates the sample, rejecting non-finite device data.
    ///
    /// Returns `None` when any component of the position or orientation is
    /// not finite. Rejections are logged at debug level; callers treat a
    /// rejected sample as "no signal this tick" and retry next tick.
    #[must_use]
    pub fn validate(self) -> Option<Self> {
        let pos_ok = self.position.coords.iter().all(|c| c.is_finite());
        let rot_ok = self.orientation.coords.iter().all(|c| c.is_finite());
        if pos_ok && rot_ok {
            Some(self)
        } else {
            tracing::debug!("dropping pose sample with non-finite components");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_at_scales_direction() {
        let ray = Ray::new(Point3::origin(), Vector3::new(2.0, 0.0, 0.0));
        let p = ray.point_at(3.0);
        assert!((p.x - 6.0).abs() < 1e-12);
        assert_eq!(p.y, 0.0);
    }

    #[test]
    fn normalized_leaves_zero_direction_untouched() {
        let ray = Ray::new(Point3::origin(), Vector3::zeros());
        assert_eq!(ray.normalized(), ray);
        assert_eq!(ray.direction_normalized(), Vector3::zeros());
    }

    #[test]
    fn normalized_yields_unit_direction() {
        let ray = Ray::new(Point3::origin(), Vector3::new(3.0, 0.0, 4.0));
        let n = ray.normalized();
        assert!((n.direction.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn identity_pose_aims_down_negative_z() {
        let pose = PoseSample::new(Point3::origin(), UnitQuaternion::identity());
        let fwd = pose.forward();
        assert!((fwd - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-12);
    }

    #[test]
    fn rotated_pose_aims_rotated() {
        // Yaw 90 degrees about +Y turns -Z into -X.
        let rot = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), core::f64::consts::FRAC_PI_2);
        let pose = PoseSample::new(Point3::new(1.0, 2.0, 3.0), rot);
        let ray = pose.ray();
        assert_eq!(ray.origin, Point3::new(1.0, 2.0, 3.0));
        assert!((ray.direction - Vector3::new(-1.0, 0.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn validate_accepts_finite_pose() {
        let pose = PoseSample::new(Point3::new(0.5, 1.5, -2.0), UnitQuaternion::identity());
        assert!(pose.validate().is_some());
    }

    #[test]
    fn validate_rejects_nan_position() {
        let pose = PoseSample::new(
            Point3::new(f64::NAN, 0.0, 0.0),
            UnitQuaternion::identity(),
        );
        assert!(pose.validate().is_none());
    }

    #[test]
    fn validate_rejects_infinite_orientation() {
        let q = nalgebra::Quaternion::new(f64::INFINITY, 0.0, 0.0, 0.0);
        let pose = PoseSample::new(Point3::origin(), UnitQuaternion::new_unchecked(q));
        assert!(pose.validate().is_none());
    }
}
