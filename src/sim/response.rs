//! Collision response
//!
//! Turns a contact into new velocities, small angular corrections and
//! position nudges. Impulses act along the contact normal only; static
//! bodies (obstacles, the border) carry zero inverse mass.

use glam::Vec3;

use super::collision::CollisionResult;
use super::geometry::rebuild_geometry;
use super::state::{Ball, Fish};
use crate::consts::{SEPARATION_SLOP, VECTOR_EPSILON};
use crate::{cross_planar, normalize_angle};

/// One participant of a contact as seen by the resolver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    /// World-space velocity (mm/s)
    pub velocity: Vec3,
    /// 1 / mass; zero for immovable bodies
    pub inverse_mass: f32,
    /// Point the lever arm is measured from
    pub center: Vec3,
}

impl Body {
    pub fn dynamic(velocity: Vec3, mass: f32, center: Vec3) -> Self {
        Self {
            velocity,
            inverse_mass: if mass > 0.0 { 1.0 / mass } else { 0.0 },
            center,
        }
    }

    /// An immovable body (obstacle or wall)
    pub fn fixed(center: Vec3) -> Self {
        Self {
            velocity: Vec3::ZERO,
            inverse_mass: 0.0,
            center,
        }
    }

    pub fn fish(fish: &Fish, mass: f32) -> Self {
        Self::dynamic(fish.world_velocity(), mass, fish.pose.position)
    }

    pub fn ball(ball: &Ball, mass: f32) -> Self {
        Self::dynamic(ball.velocity(), mass, ball.pose.position)
    }

    #[inline]
    fn is_fixed(&self) -> bool {
        self.inverse_mass <= 0.0
    }
}

/// Resolver output for one body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Response {
    /// New world-space velocity
    pub velocity: Vec3,
    /// Change in angular velocity (rad/s)
    pub angular_delta: f32,
}

impl Response {
    fn unchanged(body: &Body) -> Self {
        Self {
            velocity: body.velocity,
            angular_delta: 0.0,
        }
    }
}

/// Material parameters of a contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub restitution: f32,
    pub angular_gain: f32,
}

/// Resolve a contact between `a` and `b`. The contact normal must point
/// from `a` toward `b`. Separating pairs come back unchanged.
pub fn respond(a: &Body, b: &Body, contact: &CollisionResult, material: Material) -> (Response, Response) {
    let unchanged = (Response::unchanged(a), Response::unchanged(b));
    let inverse_sum = a.inverse_mass + b.inverse_mass;
    if !contact.hit || inverse_sum <= 0.0 || contact.normal.length_squared() < VECTOR_EPSILON {
        return unchanged;
    }

    let normal = contact.normal;
    let approach = (a.velocity - b.velocity).dot(normal);
    if approach <= 0.0 {
        return unchanged;
    }

    let impulse = (1.0 + material.restitution) * approach / inverse_sum;
    let respond_one = |body: &Body, sign: f32| {
        if body.is_fixed() {
            return Response::unchanged(body);
        }
        let delta = normal * (sign * impulse * body.inverse_mass);
        Response {
            velocity: body.velocity + delta,
            angular_delta: angular_delta(body.center, contact.point, delta, material.angular_gain),
        }
    };

    (respond_one(a, -1.0), respond_one(b, 1.0))
}

/// Spin picked up from a velocity change applied at `point`
fn angular_delta(center: Vec3, point: Vec3, delta_velocity: Vec3, gain: f32) -> f32 {
    let arm = point - center;
    gain * cross_planar(arm, delta_velocity) / arm.length_squared().max(VECTOR_EPSILON)
}

/// Apply a response to a fish over `response_time` seconds
pub fn apply_to_fish(fish: &mut Fish, response: &Response, response_time: f32) {
    let turn = response.angular_delta * response_time;
    fish.set_world_velocity(response.velocity);
    fish.velocity_direction = normalize_angle(fish.velocity_direction + turn);
    fish.pose.direction = normalize_angle(fish.pose.direction + turn);
    fish.pose.position += response.velocity * response_time;
    rebuild_geometry(fish);
}

/// Apply a response to a ball over `response_time` seconds
pub fn apply_to_ball(ball: &mut Ball, response: &Response, response_time: f32) {
    ball.set_velocity(response.velocity);
    ball.pose.position += response.velocity * response_time;
}

/// Offsets that push two overlapping bodies apart along the contact
/// normal, split by inverse mass
pub fn separation(contact: &CollisionResult, a: &Body, b: &Body) -> (Vec3, Vec3) {
    let inverse_sum = a.inverse_mass + b.inverse_mass;
    if !contact.hit || inverse_sum <= 0.0 {
        return (Vec3::ZERO, Vec3::ZERO);
    }
    let push = contact.normal * (contact.penetration.max(0.0) + SEPARATION_SLOP);
    (
        -push * (a.inverse_mass / inverse_sum),
        push * (b.inverse_mass / inverse_sum),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planar;
    use crate::sim::state::{BodyDimensions, HalfCourt, Pose};

    const ELASTIC: Material = Material {
        restitution: 1.0,
        angular_gain: 1.0,
    };

    fn contact(point: Vec3, normal: Vec3, penetration: f32) -> CollisionResult {
        CollisionResult {
            hit: true,
            point,
            normal,
            penetration,
        }
    }

    #[test]
    fn test_equal_masses_head_on_exchange() {
        let a = Body::dynamic(planar(100.0, 0.0), 4.0, planar(-50.0, 0.0));
        let b = Body::dynamic(planar(-100.0, 0.0), 4.0, planar(50.0, 0.0));
        let (ra, rb) = respond(&a, &b, &contact(Vec3::ZERO, Vec3::X, 1.0), ELASTIC);
        assert!((ra.velocity - planar(-100.0, 0.0)).length() < 1e-3);
        assert!((rb.velocity - planar(100.0, 0.0)).length() < 1e-3);
        // Contact on the line of centers produces no spin
        assert!(ra.angular_delta.abs() < 1e-6);
        assert!(rb.angular_delta.abs() < 1e-6);
    }

    #[test]
    fn test_separating_pair_unchanged() {
        let a = Body::dynamic(planar(-10.0, 0.0), 1.0, Vec3::ZERO);
        let b = Body::dynamic(planar(10.0, 0.0), 1.0, planar(20.0, 0.0));
        let (ra, rb) = respond(&a, &b, &contact(planar(10.0, 0.0), Vec3::X, 1.0), ELASTIC);
        assert_eq!(ra.velocity, a.velocity);
        assert_eq!(rb.velocity, b.velocity);
    }

    #[test]
    fn test_wall_reflects_normal_component() {
        let wall = Body::fixed(planar(100.0, 0.0));
        let ball = Body::dynamic(planar(30.0, 40.0), 1.0, planar(90.0, 0.0));
        // Wall is `a`; its normal points into the field toward the ball
        let (rw, rb) = respond(&wall, &ball, &contact(planar(100.0, 0.0), -Vec3::X, 1.0), ELASTIC);
        assert_eq!(rw.velocity, Vec3::ZERO);
        assert!((rb.velocity - planar(-30.0, 40.0)).length() < 1e-4);
        assert!((rb.velocity.length() - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_off_center_hit_spins() {
        let a = Body::dynamic(planar(0.0, 100.0), 1.0, planar(0.0, -50.0));
        let b = Body::dynamic(Vec3::ZERO, 1.0, Vec3::ZERO);
        // Contact 30 mm ahead of b's center along x, pushed along +z
        let (_, rb) = respond(&a, &b, &contact(planar(30.0, 0.0), Vec3::Z, 1.0), ELASTIC);
        assert!(rb.velocity.z > 0.0);
        // Pushing +z at a point on +x turns the body toward +z
        assert!(rb.angular_delta > 0.0);
    }

    #[test]
    fn test_separation_split_by_inverse_mass() {
        let hit = contact(Vec3::ZERO, Vec3::X, 4.0);
        let light = Body::dynamic(Vec3::ZERO, 1.0, Vec3::ZERO);
        let heavy = Body::dynamic(Vec3::ZERO, 3.0, Vec3::ZERO);
        let (da, db) = separation(&hit, &light, &heavy);
        let total = 4.0 + SEPARATION_SLOP;
        assert!((da.x + total * 0.75).abs() < 1e-4);
        assert!((db.x - total * 0.25).abs() < 1e-4);
        let (da, db) = separation(&hit, &Body::fixed(Vec3::ZERO), &light);
        assert_eq!(da, Vec3::ZERO);
        assert!((db.x - total).abs() < 1e-4);
    }

    #[test]
    fn test_apply_to_fish_keeps_team_frame() {
        let mut fish =
            Fish::new(BodyDimensions::default(), Pose::default()).on_side(HalfCourt::Right);
        let response = Response {
            velocity: planar(-200.0, 0.0),
            angular_delta: 10.0,
        };
        apply_to_fish(&mut fish, &response, 0.001);
        // Speed comes from the response; the heading is turned by 0.01 rad
        assert!((fish.world_velocity().length() - 200.0).abs() < 1e-3);
        assert!((fish.world_velocity() - response.velocity).length() < 2.5);
        assert!((fish.pose.position.x + 0.2).abs() < 1e-5);
        assert!((fish.pose.direction - 0.01).abs() < 1e-6);
        assert!((fish.geometry.body_circle.center - fish.pose.position).length() < 1e-4);
    }

    #[test]
    fn test_apply_to_fish_turns_velocity_with_body() {
        let mut fish = Fish::new(BodyDimensions::default(), Pose::default());
        let response = Response {
            velocity: planar(100.0, 0.0),
            angular_delta: 10.0,
        };
        apply_to_fish(&mut fish, &response, 0.001);
        assert!((fish.pose.direction - 0.01).abs() < 1e-6);
        assert!((fish.velocity_direction - 0.01).abs() < 1e-6);
        assert!((fish.speed - 100.0).abs() < 1e-3);
    }
}
