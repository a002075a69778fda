//! Collision detection for fish, balls, obstacles and the field border
//!
//! Stateless narrow-phase tests. Convex polygons use the separating axis
//! theorem; circles use closest-point queries. A fish is tested
//! hierarchically: whole-body circle, then body/tail circles, then each
//! convex sub-shape, reporting the deepest contact.
//!
//! Normals are unit length and point from the first shape toward the
//! second. Border tests report the normal pointing back into the field.

use glam::Vec3;

use super::geometry::FishGeometry;
use super::shapes::{Circle, Field, Obstacle};
use crate::consts::VECTOR_EPSILON;
use crate::perp;

/// Result of a collision check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResult {
    /// Whether the shapes intersect
    pub hit: bool,
    /// Contact point (if hit)
    pub point: Vec3,
    /// Contact normal, first shape toward second
    pub normal: Vec3,
    /// Penetration depth along the normal
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec3::ZERO,
            normal: Vec3::ZERO,
            penetration: 0.0,
        }
    }

    /// The same contact seen from the other shape
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            ..self
        }
    }

    /// Keep whichever of two results penetrates deeper
    fn deeper(self, other: Self) -> Self {
        match (self.hit, other.hit) {
            (true, true) if other.penetration > self.penetration => other,
            (false, true) => other,
            _ => self,
        }
    }
}

// ---------------------------------------------------------------------------
// Primitive tests
// ---------------------------------------------------------------------------

fn project(points: &[Vec3], axis: Vec3) -> (f32, f32) {
    points
        .iter()
        .map(|p| p.dot(axis))
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), d| (lo.min(d), hi.max(d)))
}

fn centroid(points: &[Vec3]) -> Vec3 {
    if points.is_empty() {
        return Vec3::ZERO;
    }
    points.iter().copied().sum::<Vec3>() / points.len() as f32
}

/// Whether a point lies inside a convex polygon of either winding
pub fn polygon_contains(polygon: &[Vec3], point: Vec3) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0.0_f32;
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        let c = crate::cross_planar(b - a, point - a);
        if c.abs() <= VECTOR_EPSILON {
            continue;
        }
        if sign == 0.0 {
            sign = c.signum();
        } else if c.signum() != sign {
            return false;
        }
    }
    true
}

/// Closest point on segment `a`-`b` to `p`
fn closest_point_on_segment(a: Vec3, b: Vec3, p: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < VECTOR_EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Convex polygon vs convex polygon (separating axis theorem)
pub fn polygon_polygon(a: &[Vec3], b: &[Vec3]) -> CollisionResult {
    let mut best_depth = f32::INFINITY;
    let mut best_axis = Vec3::ZERO;

    for polygon in [a, b] {
        let n = polygon.len();
        for i in 0..n {
            let edge = polygon[(i + 1) % n] - polygon[i];
            let axis = perp(edge).normalize_or_zero();
            if axis == Vec3::ZERO {
                continue;
            }
            let (min_a, max_a) = project(a, axis);
            let (min_b, max_b) = project(b, axis);
            if max_a <= min_b || max_b <= min_a {
                return CollisionResult::miss();
            }
            let depth = (max_a - min_b).min(max_b - min_a);
            if depth < best_depth {
                best_depth = depth;
                best_axis = axis;
            }
        }
    }

    if best_axis == Vec3::ZERO {
        return CollisionResult::miss();
    }

    let mut normal = best_axis;
    if (centroid(b) - centroid(a)).dot(normal) < 0.0 {
        normal = -normal;
    }

    // Contact point: vertices buried in the other shape, else the deepest
    // vertex of `b` along the normal
    let buried: Vec<Vec3> = b
        .iter()
        .filter(|p| polygon_contains(a, **p))
        .chain(a.iter().filter(|p| polygon_contains(b, **p)))
        .copied()
        .collect();
    let point = if buried.is_empty() {
        b.iter()
            .copied()
            .min_by(|p, q| p.dot(normal).total_cmp(&q.dot(normal)))
            .unwrap_or(Vec3::ZERO)
    } else {
        centroid(&buried)
    };

    CollisionResult {
        hit: true,
        point,
        normal,
        penetration: best_depth,
    }
}

/// Convex polygon vs circle
pub fn polygon_circle(polygon: &[Vec3], circle: &Circle) -> CollisionResult {
    let n = polygon.len();
    if n == 0 {
        return CollisionResult::miss();
    }

    let mut closest = polygon[0];
    let mut closest_dist_sq = f32::INFINITY;
    let mut closest_edge = 0;
    for i in 0..n {
        let q = closest_point_on_segment(polygon[i], polygon[(i + 1) % n], circle.center);
        let d = q.distance_squared(circle.center);
        if d < closest_dist_sq {
            closest_dist_sq = d;
            closest = q;
            closest_edge = i;
        }
    }

    let inside = polygon_contains(polygon, circle.center);
    let dist = closest_dist_sq.sqrt();
    if !inside && dist >= circle.radius {
        return CollisionResult::miss();
    }

    // Outward normal of the nearest edge, for centers on or inside the boundary
    let edge_normal = || {
        let edge = polygon[(closest_edge + 1) % n] - polygon[closest_edge];
        let mut normal = perp(edge).normalize_or_zero();
        if (closest - centroid(polygon)).dot(normal) < 0.0 {
            normal = -normal;
        }
        normal
    };

    let (normal, penetration) = if inside {
        (edge_normal(), circle.radius + dist)
    } else if dist > VECTOR_EPSILON {
        ((circle.center - closest) / dist, circle.radius - dist)
    } else {
        (edge_normal(), circle.radius)
    };

    CollisionResult {
        hit: true,
        point: closest,
        normal,
        penetration,
    }
}

/// Circle vs convex polygon
pub fn circle_polygon(circle: &Circle, polygon: &[Vec3]) -> CollisionResult {
    polygon_circle(polygon, circle).flipped()
}

/// Circle vs circle
pub fn circle_circle(a: &Circle, b: &Circle) -> CollisionResult {
    if !a.overlaps(b) {
        return CollisionResult::miss();
    }
    let offset = b.center - a.center;
    let dist = offset.length();
    let normal = if dist > VECTOR_EPSILON {
        offset / dist
    } else {
        Vec3::X
    };
    CollisionResult {
        hit: true,
        point: a.center + normal * (a.radius - (a.radius + b.radius - dist) / 2.0),
        normal,
        penetration: a.radius + b.radius - dist,
    }
}

/// How far `point` (padded by `radius`) sticks out of the field, with the
/// inward normal of the wall it crosses most
fn border_excursion(point: Vec3, radius: f32, field: &Field) -> Option<(f32, Vec3)> {
    let hw = field.half_width();
    let hh = field.half_height();
    [
        (-hw - (point.x - radius), Vec3::X),
        ((point.x + radius) - hw, -Vec3::X),
        (-hh - (point.z - radius), Vec3::Z),
        ((point.z + radius) - hh, -Vec3::Z),
    ]
    .into_iter()
    .filter(|(depth, _)| *depth > 0.0)
    .max_by(|a, b| a.0.total_cmp(&b.0))
}

/// Clamp a point onto the field rectangle
fn clamp_to_field(point: Vec3, field: &Field) -> Vec3 {
    Vec3::new(
        point.x.clamp(-field.half_width(), field.half_width()),
        0.0,
        point.z.clamp(-field.half_height(), field.half_height()),
    )
}

/// Polygon vs field border
pub fn polygon_border(polygon: &[Vec3], field: &Field) -> CollisionResult {
    polygon
        .iter()
        .filter_map(|p| border_excursion(*p, 0.0, field).map(|(depth, normal)| (*p, depth, normal)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(p, depth, normal)| CollisionResult {
            hit: true,
            point: clamp_to_field(p, field),
            normal,
            penetration: depth,
        })
        .unwrap_or_else(CollisionResult::miss)
}

/// Circle vs field border
pub fn circle_border(circle: &Circle, field: &Field) -> CollisionResult {
    match border_excursion(circle.center, circle.radius, field) {
        Some((depth, normal)) => CollisionResult {
            hit: true,
            point: clamp_to_field(circle.center - normal * circle.radius, field),
            normal,
            penetration: depth,
        },
        None => CollisionResult::miss(),
    }
}

// ---------------------------------------------------------------------------
// Entity tests
// ---------------------------------------------------------------------------

/// Fish vs fish, deepest contact over all sub-shape pairs
pub fn fish_fish(a: &FishGeometry, b: &FishGeometry) -> CollisionResult {
    if !a.whole_circle.overlaps(&b.whole_circle) {
        return CollisionResult::miss();
    }
    let mut result = CollisionResult::miss();
    for (part_a, bounds_a) in a.parts_with_bounds() {
        for (part_b, bounds_b) in b.parts_with_bounds() {
            if !bounds_a.overlaps(&bounds_b) {
                continue;
            }
            result = result.deeper(polygon_polygon(part_a, part_b));
        }
    }
    result
}

/// Fish vs circle (balls and circular obstacles)
pub fn fish_circle(fish: &FishGeometry, circle: &Circle) -> CollisionResult {
    if !fish.whole_circle.overlaps(circle) {
        return CollisionResult::miss();
    }
    let mut result = CollisionResult::miss();
    for (part, bounds) in fish.parts_with_bounds() {
        if bounds.overlaps(circle) {
            result = result.deeper(polygon_circle(part, circle));
        }
    }
    result
}

/// Fish vs ball
pub fn fish_ball(fish: &FishGeometry, ball: &Circle) -> CollisionResult {
    fish_circle(fish, ball)
}

/// Fish vs static obstacle
pub fn fish_obstacle(fish: &FishGeometry, obstacle: &Obstacle) -> CollisionResult {
    match obstacle {
        Obstacle::Circle(circle) => fish_circle(fish, circle),
        Obstacle::Rect(rect) => {
            if !fish.whole_circle.overlaps(&obstacle.bounds()) {
                return CollisionResult::miss();
            }
            let corners = rect.corners();
            let mut result = CollisionResult::miss();
            for (part, _) in fish.parts_with_bounds() {
                result = result.deeper(polygon_polygon(part, &corners));
            }
            result
        }
    }
}

/// Fish vs field border, checking every sub-shape vertex
pub fn fish_border(fish: &FishGeometry, field: &Field) -> CollisionResult {
    let points: Vec<Vec3> = fish.points().collect();
    polygon_border(&points, field)
}

/// Ball vs static obstacle
pub fn ball_obstacle(ball: &Circle, obstacle: &Obstacle) -> CollisionResult {
    match obstacle {
        Obstacle::Circle(circle) => circle_circle(ball, circle),
        Obstacle::Rect(rect) => circle_polygon(ball, &rect.corners()),
    }
}

/// Ball vs ball
pub fn ball_ball(a: &Circle, b: &Circle) -> CollisionResult {
    circle_circle(a, b)
}

/// Ball vs field border
pub fn ball_border(ball: &Circle, field: &Field) -> CollisionResult {
    circle_border(ball, field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planar;
    use crate::sim::geometry::build_geometry;
    use crate::sim::shapes::Rect;
    use crate::sim::state::{BodyDimensions, Pose};
    use proptest::prelude::*;

    fn square(cx: f32, cz: f32, half: f32) -> [Vec3; 4] {
        Rect::axis_aligned(planar(cx, cz), half, half).corners()
    }

    fn geometry(x: f32, z: f32, direction: f32, tail: [f32; 3]) -> FishGeometry {
        build_geometry(&Pose::new(x, z, direction), &BodyDimensions::default(), &tail)
    }

    #[test]
    fn test_polygon_polygon_overlap() {
        let a = square(0.0, 0.0, 10.0);
        let b = square(15.0, 0.0, 10.0);
        let result = polygon_polygon(&a, &b);
        assert!(result.hit);
        assert!((result.penetration - 5.0).abs() < 1e-4);
        assert!((result.normal - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_polygon_polygon_separated() {
        let a = square(0.0, 0.0, 10.0);
        let b = square(25.0, 3.0, 10.0);
        assert!(!polygon_polygon(&a, &b).hit);
        // Touching edges do not count
        let c = square(20.0, 0.0, 10.0);
        assert!(!polygon_polygon(&a, &c).hit);
    }

    #[test]
    fn test_polygon_contains() {
        let sq = square(0.0, 0.0, 10.0);
        assert!(polygon_contains(&sq, planar(3.0, -4.0)));
        assert!(!polygon_contains(&sq, planar(11.0, 0.0)));
        let mut reversed = sq;
        reversed.reverse();
        assert!(polygon_contains(&reversed, planar(3.0, -4.0)));
    }

    #[test]
    fn test_polygon_circle_outside_and_inside() {
        let sq = square(0.0, 0.0, 10.0);
        let near = Circle::new(planar(14.0, 0.0), 5.0);
        let result = polygon_circle(&sq, &near);
        assert!(result.hit);
        assert!((result.normal - Vec3::X).length() < 1e-5);
        assert!((result.penetration - 1.0).abs() < 1e-4);
        assert!((result.point - planar(10.0, 0.0)).length() < 1e-4);

        let far = Circle::new(planar(16.0, 0.0), 5.0);
        assert!(!polygon_circle(&sq, &far).hit);

        let inside = Circle::new(planar(0.0, 8.0), 3.0);
        let result = polygon_circle(&sq, &inside);
        assert!(result.hit);
        assert!((result.normal - Vec3::Z).length() < 1e-5);
        assert!((result.penetration - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_circle_circle() {
        let a = Circle::new(planar(0.0, 0.0), 10.0);
        let b = Circle::new(planar(0.0, 15.0), 10.0);
        let result = circle_circle(&a, &b);
        assert!(result.hit);
        assert!((result.normal - Vec3::Z).length() < 1e-6);
        assert!((result.penetration - 5.0).abs() < 1e-5);
        assert!((result.point - planar(0.0, 7.5)).length() < 1e-5);
        assert!(!circle_circle(&a, &Circle::new(planar(30.0, 0.0), 10.0)).hit);
    }

    #[test]
    fn test_circle_border_normals_point_inward() {
        let field = Field::default();
        let right = circle_border(&Circle::new(planar(1490.0, 0.0), 20.0), &field);
        assert!(right.hit);
        assert!((right.normal + Vec3::X).length() < 1e-6);
        assert!((right.penetration - 10.0).abs() < 1e-3);
        let top = circle_border(&Circle::new(planar(0.0, -995.0), 20.0), &field);
        assert!(top.hit);
        assert!((top.normal - Vec3::Z).length() < 1e-6);
        assert!(!circle_border(&Circle::new(Vec3::ZERO, 20.0), &field).hit);
    }

    #[test]
    fn test_fish_border() {
        let field = Field::default();
        assert!(!fish_border(&geometry(0.0, 0.0, 0.0, [0.0; 3]), &field).hit);
        // Nose poking through the right wall
        let result = fish_border(&geometry(1430.0, 0.0, 0.0, [0.0; 3]), &field);
        assert!(result.hit);
        assert!((result.normal + Vec3::X).length() < 1e-6);
        assert!((result.penetration - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_fish_fish_head_on() {
        let a = geometry(-85.0, 0.0, 0.0, [0.0; 3]);
        let b = geometry(85.0, 0.0, std::f32::consts::PI, [0.0; 3]);
        let result = fish_fish(&a, &b);
        assert!(result.hit);
        assert!(result.normal.x > 0.0);
        let apart = geometry(200.0, 0.0, std::f32::consts::PI, [0.0; 3]);
        assert!(!fish_fish(&a, &apart).hit);
    }

    #[test]
    fn test_fish_tail_hits_ball() {
        // Ball sitting just off the caudal fin of a fish facing +x
        let fish = geometry(0.0, 0.0, 0.0, [0.0; 3]);
        let tip = fish.caudal[0][1];
        let ball = Circle::new(tip + planar(0.0, -10.0), 15.0);
        assert!(fish_ball(&fish, &ball).hit);
        let clear = Circle::new(planar(0.0, 300.0), 15.0);
        assert!(!fish_ball(&fish, &clear).hit);
    }

    #[test]
    fn test_fish_obstacle_rect_and_circle() {
        let fish = geometry(0.0, 0.0, 0.0, [0.0; 3]);
        let wall = Obstacle::Rect(Rect::axis_aligned(planar(110.0, 0.0), 30.0, 100.0));
        let result = fish_obstacle(&fish, &wall);
        assert!(result.hit);
        assert!(result.normal.x > 0.0);
        let post = Obstacle::Circle(Circle::new(planar(0.0, 120.0), 20.0));
        assert!(!fish_obstacle(&fish, &post).hit);
    }

    #[test]
    fn test_ball_obstacle_rect_face() {
        let wall = Obstacle::Rect(Rect::axis_aligned(planar(100.0, 0.0), 20.0, 50.0));
        let ball = Circle::new(planar(72.0, 0.0), 10.0);
        let result = ball_obstacle(&ball, &wall);
        assert!(result.hit);
        // Normal runs from the ball into the obstacle
        assert!((result.normal - Vec3::X).length() < 1e-5);
        assert!((result.penetration - 2.0).abs() < 1e-4);
    }

    proptest! {
        #[test]
        fn prop_polygon_polygon_symmetric(
            ax in -50.0f32..50.0, az in -50.0f32..50.0, ar in -3.0f32..3.0,
            bx in -50.0f32..50.0, bz in -50.0f32..50.0, br in -3.0f32..3.0,
        ) {
            let a = Rect { center: planar(ax, az), half_length: 20.0, half_width: 8.0, rotation: ar }.corners();
            let b = Rect { center: planar(bx, bz), half_length: 15.0, half_width: 12.0, rotation: br }.corners();
            prop_assert_eq!(polygon_polygon(&a, &b).hit, polygon_polygon(&b, &a).hit);
        }

        #[test]
        fn prop_circle_circle_symmetric(
            x in -60.0f32..60.0, z in -60.0f32..60.0, r in 1.0f32..40.0,
        ) {
            let circle = Circle::new(planar(x, z), r);
            let other = Circle::new(planar(5.0, -3.0), 12.0);
            prop_assert_eq!(circle_circle(&circle, &other).hit, circle_circle(&other, &circle).hit);
        }

        #[test]
        fn prop_polygon_circle_matches_box_distance(
            x in -60.0f32..60.0, z in -60.0f32..60.0, r in 1.0f32..40.0,
        ) {
            // Gap from the circle center to an axis-aligned 30 mm square
            let gap = planar((x.abs() - 15.0).max(0.0), (z.abs() - 15.0).max(0.0)).length();
            prop_assume!((gap - r).abs() > 1e-3);
            let circle = Circle::new(planar(x, z), r);
            let sq = square(0.0, 0.0, 15.0);
            prop_assert_eq!(polygon_circle(&sq, &circle).hit, gap < r);
            let obstacle = Obstacle::Rect(Rect::axis_aligned(Vec3::ZERO, 15.0, 15.0));
            prop_assert_eq!(ball_obstacle(&circle, &obstacle).hit, gap < r);
        }

        #[test]
        fn prop_fish_fish_symmetric(
            x in -300.0f32..300.0, z in -200.0f32..200.0,
            direction in -3.14f32..3.14, tail in -0.8f32..0.8,
        ) {
            let a = geometry(0.0, 0.0, 0.3, [0.2, -0.1, 0.4]);
            let b = geometry(x, z, direction, [tail, -tail, tail]);
            prop_assert_eq!(fish_fish(&a, &b).hit, fish_fish(&b, &a).hit);
        }
    }
}
