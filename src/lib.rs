//! RoboFish Sim - physics core for a 2D underwater robotic fish arena
//!
//! Core modules:
//! - `sim`: Deterministic simulation (geometry, locomotion, collisions, cycle loop)
//! - `settings`: Data-driven configuration with per-field defaults
//!
//! All geometry lives in the x/z plane of a `Vec3`; the y component is
//! always zero.

pub mod settings;
pub mod sim;

pub use settings::{ConfigError, SimConfig};

use glam::Vec3;

/// Simulation constants
pub mod consts {
    /// Default cycle duration (ms)
    pub const DEFAULT_CYCLE_MS: u32 = 100;

    /// Field dimensions (mm), centered on the origin
    pub const FIELD_WIDTH: f32 = 3000.0;
    pub const FIELD_HEIGHT: f32 = 2000.0;

    /// Ball defaults
    pub const BALL_RADIUS: f32 = 58.0;
    /// Water drag on a free ball (mm/s²)
    pub const BALL_DECELERATION: f32 = 40.0;

    /// Decision code ranges
    pub const MAX_SPEED_CODE: i32 = 15;
    pub const MAX_TURN_CODE: i32 = 15;
    /// Turn code for swimming straight
    pub const STRAIGHT_TURN_CODE: i32 = 7;

    /// Fraction of a cycle over which collision responses are applied
    pub const RESPONSE_TIME_FRACTION: f32 = 0.01;
    /// Fraction of a cycle's travel rewound by the backtracking retry
    pub const BACKTRACK_FRACTION: f32 = 0.5;
    /// Extra gap left after separating interpenetrating bodies (mm)
    pub const SEPARATION_SLOP: f32 = 0.5;

    /// Below this magnitude a vector is treated as zero
    pub const VECTOR_EPSILON: f32 = 1e-6;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    if !angle.is_finite() {
        return 0.0;
    }
    if (-PI..PI).contains(&angle) {
        return angle;
    }
    let mut wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped >= PI {
        wrapped -= TAU;
    }
    wrapped
}

/// Unit vector pointing along `angle` in the x/z plane
#[inline]
pub fn heading(angle: f32) -> Vec3 {
    Vec3::new(angle.cos(), 0.0, angle.sin())
}

/// Unit vector to the left of a body facing `angle`
#[inline]
pub fn left_normal(angle: f32) -> Vec3 {
    Vec3::new(angle.sin(), 0.0, -angle.cos())
}

/// Perpendicular of a planar vector (rotated a quarter turn)
#[inline]
pub fn perp(v: Vec3) -> Vec3 {
    Vec3::new(-v.z, 0.0, v.x)
}

/// Planar cross product; positive when `b` lies clockwise-positive of `a`
/// (the same sense in which a body-direction angle increases)
#[inline]
pub fn cross_planar(a: Vec3, b: Vec3) -> f32 {
    a.x * b.z - a.z * b.x
}

/// Point in the x/z plane
#[inline]
pub fn planar(x: f32, z: f32) -> Vec3 {
    Vec3::new(x, 0.0, z)
}

/// Recover the direction angle of a planar vector.
///
/// Returns `None` for a zero-length vector. The cosine is clamped to
/// [-1, 1] before `acos` and the sign comes from the z component.
pub fn direction_of(v: Vec3) -> Option<f32> {
    let len = v.length();
    if len < consts::VECTOR_EPSILON {
        return None;
    }
    let cos = (v.x / len).clamp(-1.0, 1.0);
    let angle = cos.acos();
    Some(normalize_angle(if v.z < 0.0 { -angle } else { angle }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f32::consts::{FRAC_PI_2, PI, TAU};

    #[test]
    fn test_normalize_angle_range() {
        assert!((normalize_angle(PI) + PI).abs() < 1e-6);
        assert!((normalize_angle(3.0 * FRAC_PI_2) + FRAC_PI_2).abs() < 1e-5);
        assert_eq!(normalize_angle(0.0), 0.0);
        assert_eq!(normalize_angle(f32::NAN), 0.0);
        // Already-normalized angles pass through untouched
        assert_eq!(normalize_angle(normalize_angle(7.3)), normalize_angle(7.3));
    }

    #[test]
    fn test_direction_of_signs() {
        assert!((direction_of(planar(0.0, 1.0)).unwrap() - FRAC_PI_2).abs() < 1e-6);
        assert!((direction_of(planar(0.0, -1.0)).unwrap() + FRAC_PI_2).abs() < 1e-6);
        assert!((direction_of(planar(-2.0, 0.0)).unwrap() + PI).abs() < 1e-6);
        assert!(direction_of(Vec3::ZERO).is_none());
    }

    #[test]
    fn test_direction_of_clamps_cosine() {
        // x slightly larger than the length through rounding must not yield NaN
        let v = planar(1.0, 1e-20);
        let angle = direction_of(v).unwrap();
        assert!(angle.is_finite());
        assert!(angle.abs() < 1e-6);
    }

    #[test]
    fn test_left_normal_is_left() {
        // Facing +x, left is -z
        let left = left_normal(0.0);
        assert!((left - planar(0.0, -1.0)).length() < 1e-6);
        // Turning toward the left decreases the angle
        assert!(cross_planar(heading(0.0), left) < 0.0);
    }

    proptest! {
        #[test]
        fn prop_normalized_angle_in_range(angle in -100.0f32..100.0f32) {
            let a = normalize_angle(angle);
            prop_assert!(a >= -PI && a < PI);
        }

        #[test]
        fn prop_adding_full_turn_is_idempotent(angle in -10.0f32..10.0f32) {
            let a = normalize_angle(angle);
            let b = normalize_angle(a + TAU);
            let c = normalize_angle(b + TAU);
            let diff = normalize_angle(a - c).abs();
            prop_assert!(diff < 1e-4);
        }

        #[test]
        fn prop_direction_round_trips(angle in -3.1f32..3.1f32) {
            let recovered = direction_of(heading(angle) * 250.0).unwrap();
            prop_assert!(normalize_angle(recovered - angle).abs() < 1e-3);
        }
    }
}
