//! Fish collision geometry
//!
//! Derives a fish's convex sub-shapes, silhouette outline and bounding
//! circles from its pose, body dimensions and tail joint angles. The
//! result must be rebuilt after every pose or tail change; the collision
//! detector only ever reads the latest build.
//!
//! Layout along the body axis, measured back from the front apex:
//!
//! ```text
//!  apex ── shoulders ── rear ── tail 1 ── tail 2 ── tail 3 ── caudal fin
//!         (head_length) (body_length)
//! ```

use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::shapes::{Circle, Quad, Triangle};
use super::state::{BodyDimensions, Fish, Pose};
use crate::{heading, left_normal, normalize_angle};

/// Rear half-width as a fraction of the shoulder half-width
const REAR_TAPER: f32 = 0.8;

/// Half-widths of each tail joint at its start and end, as fractions of
/// the body width
const TAIL_HALF_WIDTHS: [(f32, f32); 3] = [(0.38, 0.30), (0.30, 0.20), (0.20, 0.10)];

// Pectoral fins, fractions of the body width unless noted
/// Fin root positions along the body side (0 = shoulder, 1 = rear)
const PECTORAL_ROOT_FRONT: f32 = 0.2;
const PECTORAL_ROOT_BACK: f32 = 0.55;
const PECTORAL_SPAN: f32 = 0.45;
const PECTORAL_SWEEP: f32 = 0.35;

// Caudal fin, fractions of the body width
/// Narrow offset of the fin roots from the fin axis
const CAUDAL_ROOT_HALF: f32 = 0.12;
/// Wide offset of the fin tips from the fin axis
const CAUDAL_HALF_SPAN: f32 = 0.55;
const CAUDAL_SWEEP: f32 = 0.45;
const CAUDAL_NOTCH: f32 = 0.2;

/// Derived collision geometry of one fish
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FishGeometry {
    /// Silhouette: apex, left shoulder, left pectoral root, left caudal tip,
    /// right caudal tip, right pectoral root, right shoulder.
    ///
    /// The outline is concave, so pair tests run on the convex sub-shapes
    /// below instead. Every outline vertex is also a sub-shape vertex; only
    /// the border test reads it directly.
    pub outline: [Vec3; 7],
    /// Apex, left shoulder, left rear, right rear, right shoulder
    pub body: [Vec3; 5],
    pub tails: [Quad; 3],
    /// Left, right
    pub pectorals: [Quad; 2],
    /// Left half, right half
    pub caudal: [Triangle; 2],
    pub front_apex: Vec3,
    pub rear_center: Vec3,
    /// End point of each tail joint
    pub tail_joints: [Vec3; 3],
    pub whole_circle: Circle,
    pub body_circle: Circle,
    pub tail_circle: Circle,
}

impl FishGeometry {
    /// Convex parts covered by the body circle
    pub fn rigid_parts(&self) -> [&[Vec3]; 3] {
        [&self.body, &self.pectorals[0], &self.pectorals[1]]
    }

    /// Convex parts covered by the tail circle
    pub fn tail_parts(&self) -> [&[Vec3]; 5] {
        [
            &self.tails[0],
            &self.tails[1],
            &self.tails[2],
            &self.caudal[0],
            &self.caudal[1],
        ]
    }

    /// Every convex part paired with the bounding circle that covers it
    pub fn parts_with_bounds(&self) -> impl Iterator<Item = (&[Vec3], Circle)> {
        let body = self.body_circle;
        let tail = self.tail_circle;
        self.rigid_parts()
            .into_iter()
            .map(move |part| (part, body))
            .chain(self.tail_parts().into_iter().map(move |part| (part, tail)))
    }

    /// All sub-shape vertices followed by the outline
    pub fn points(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.parts_with_bounds()
            .flat_map(|(part, _)| part.iter().copied())
            .chain(self.outline.iter().copied())
    }
}

/// Rebuild a fish's geometry from its current pose and tail angles
pub fn rebuild_geometry(fish: &mut Fish) {
    let pose = Pose {
        position: fish.pose.position,
        direction: fish.body_direction(),
    };
    fish.geometry = build_geometry(&pose, &fish.dims, &fish.tail_angles);
}

/// Pure geometry construction from a world-space pose
pub fn build_geometry(pose: &Pose, dims: &BodyDimensions, tail_angles: &[f32; 3]) -> FishGeometry {
    let theta = pose.direction;
    let h = heading(theta);
    let left = left_normal(theta);
    let length = dims.body_length;
    let width = dims.body_width;
    let half_width = width / 2.0;

    // Body rectangle corners
    let apex = pose.position + h * (length / 2.0);
    let rear = pose.position - h * (length / 2.0);
    let shoulder = apex - h * dims.head_length.min(length);
    let shoulder_left = shoulder + left * half_width;
    let shoulder_right = shoulder - left * half_width;
    let rear_left = rear + left * half_width * REAR_TAPER;
    let rear_right = rear - left * half_width * REAR_TAPER;

    let body = [apex, shoulder_left, rear_left, rear_right, shoulder_right];

    // Pectoral fins hang off the side midpoints, swept back
    let pectoral = |side_shoulder: Vec3, side_rear: Vec3, outward: Vec3| -> Quad {
        let root_front = side_shoulder.lerp(side_rear, PECTORAL_ROOT_FRONT);
        let root_back = side_shoulder.lerp(side_rear, PECTORAL_ROOT_BACK);
        let tip_front =
            root_front + outward * (PECTORAL_SPAN * width * 0.7) - h * (PECTORAL_SWEEP * width * 0.5);
        let tip_back = root_back + outward * (PECTORAL_SPAN * width) - h * (PECTORAL_SWEEP * width);
        [root_front, tip_front, tip_back, root_back]
    };
    let pectoral_left = pectoral(shoulder_left, rear_left, left);
    let pectoral_right = pectoral(shoulder_right, rear_right, -left);

    // Tail joints, each deflected relative to the body axis
    let mut tails = [[Vec3::ZERO; 4]; 3];
    let mut tail_joints = [Vec3::ZERO; 3];
    let mut start = rear;
    for i in 0..3 {
        let axis = theta + tail_angles[i];
        let n = left_normal(axis);
        let end = start - heading(axis) * dims.tail_lengths[i];
        let (start_half, end_half) = TAIL_HALF_WIDTHS[i];
        tails[i] = [
            start + n * (start_half * width),
            end + n * (end_half * width),
            end - n * (end_half * width),
            start - n * (start_half * width),
        ];
        tail_joints[i] = end;
        start = end;
    }

    // Caudal fin. The roots are offset perpendicular to the fin axis taken
    // as an unoriented line, so past a quarter turn they land on the wrong
    // side and are mirrored back.
    let base = tail_joints[2];
    let fin_axis = normalize_angle(theta + tail_angles[2]);
    let fin_dir = heading(fin_axis);
    let line_normal = left_normal(fold_to_line(fin_axis));
    let mut root_left = base + line_normal * (CAUDAL_ROOT_HALF * width);
    let mut root_right = base - line_normal * (CAUDAL_ROOT_HALF * width);
    if fin_axis.abs() > FRAC_PI_2 {
        std::mem::swap(&mut root_left, &mut root_right);
    }
    let side = (root_left - root_right).normalize_or_zero();
    let spread = (CAUDAL_HALF_SPAN - CAUDAL_ROOT_HALF) * width;
    let sweep = fin_dir * (CAUDAL_SWEEP * width);
    let tip_left = root_left + side * spread - sweep;
    let tip_right = root_right - side * spread - sweep;
    let notch = base - fin_dir * (CAUDAL_NOTCH * width);
    let caudal = [[base, tip_left, notch], [base, notch, tip_right]];

    let outline = [
        apex,
        shoulder_left,
        pectoral_left[3],
        tip_left,
        tip_right,
        pectoral_right[3],
        shoulder_right,
    ];

    // Bounding circles sit at fixed offsets along the body axis
    let tail_total: f32 = dims.tail_lengths.iter().sum();
    let caudal_reach = (CAUDAL_SWEEP * CAUDAL_SWEEP + CAUDAL_HALF_SPAN * CAUDAL_HALF_SPAN).sqrt() * width;
    let tail_reach = tail_total + caudal_reach.max(TAIL_HALF_WIDTHS[0].0 * width);

    let rigid_points = body
        .iter()
        .chain(pectoral_left.iter())
        .chain(pectoral_right.iter());
    let farthest = |center: Vec3| {
        rigid_points
            .clone()
            .map(|p| center.distance(*p))
            .fold(0.0_f32, f32::max)
    };

    let body_center = apex - h * (length / 2.0);
    let body_circle = Circle::new(body_center, farthest(body_center));

    let tail_center = apex - h * (length + tail_reach / 2.0);
    let tail_circle = Circle::new(tail_center, tail_reach * 1.5);

    let whole_center = apex - h * ((length + tail_reach) / 2.0);
    let whole_radius = farthest(whole_center).max((length - tail_reach).abs() / 2.0 + tail_reach);
    let whole_circle = Circle::new(whole_center, whole_radius);

    FishGeometry {
        outline,
        body,
        tails,
        pectorals: [pectoral_left, pectoral_right],
        caudal,
        front_apex: apex,
        rear_center: rear,
        tail_joints,
        whole_circle,
        body_circle,
        tail_circle,
    }
}

/// Fold an angle onto [-π/2, π/2], treating it as a line direction
fn fold_to_line(angle: f32) -> f32 {
    if angle > FRAC_PI_2 {
        angle - PI
    } else if angle < -FRAC_PI_2 {
        angle + PI
    } else {
        angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cross_planar, planar};
    use proptest::prelude::*;

    fn fish_at(x: f32, z: f32, direction: f32, tail: [f32; 3]) -> Fish {
        let mut fish = Fish::new(BodyDimensions::default(), Pose::new(x, z, direction));
        fish.set_tail_angles(tail);
        fish
    }

    #[test]
    fn test_sub_shape_vertex_counts() {
        let fish = fish_at(120.0, -40.0, 0.7, [0.2, -0.1, 0.3]);
        let g = &fish.geometry;
        assert_eq!(g.outline.len(), 7);
        assert_eq!(g.body.len(), 5);
        assert_eq!(g.tails.len(), 3);
        assert!(g.tails.iter().all(|t| t.len() == 4));
        assert_eq!(g.pectorals.len(), 2);
        assert!(g.pectorals.iter().all(|p| p.len() == 4));
        assert_eq!(g.caudal.len(), 2);
        assert!(g.caudal.iter().all(|c| c.len() == 3));
    }

    #[test]
    fn test_straight_fish_layout() {
        let fish = fish_at(0.0, 0.0, 0.0, [0.0; 3]);
        let g = &fish.geometry;
        let dims = BodyDimensions::default();
        assert!((g.front_apex - planar(dims.body_length / 2.0, 0.0)).length() < 1e-4);
        assert!((g.rear_center - planar(-dims.body_length / 2.0, 0.0)).length() < 1e-4);
        let tail_total: f32 = dims.tail_lengths.iter().sum();
        let tail_end = -dims.body_length / 2.0 - tail_total;
        assert!((g.tail_joints[2] - planar(tail_end, 0.0)).length() < 1e-3);
        // Left of a fish facing +x is -z
        assert!(g.body[1].z < 0.0 && g.body[4].z > 0.0);
        assert!(g.pectorals[0][2].z < g.body[1].z);
        assert!(g.caudal[0][1].z < 0.0 && g.caudal[1][2].z > 0.0);
        assert_eq!(g.outline[0], g.front_apex);
        assert_eq!(g.outline[3], g.caudal[0][1]);
        assert_eq!(g.outline[4], g.caudal[1][2]);
    }

    #[test]
    fn test_outline_vertices_lie_on_sub_shapes() {
        let fish = fish_at(120.0, -40.0, 0.7, [0.3, -0.5, 0.9]);
        let geometry = &fish.geometry;
        for vertex in geometry.outline {
            assert!(
                geometry
                    .parts_with_bounds()
                    .any(|(part, _)| part.contains(&vertex))
            );
        }
    }

    #[test]
    fn test_geometry_follows_pose() {
        let mut fish = fish_at(0.0, 0.0, 0.0, [0.0; 3]);
        let before = fish.geometry.clone();
        fish.set_pose(Pose::new(100.0, 50.0, 0.0));
        let shift = planar(100.0, 50.0);
        for (a, b) in before.outline.iter().zip(fish.geometry.outline.iter()) {
            assert!((*a + shift - *b).length() < 1e-3);
        }
    }

    #[test]
    fn test_caudal_mirror_keeps_left_root_on_left() {
        // Headings just either side of a quarter turn
        for direction in [1.5_f32, 1.65, -1.5, -1.65, 3.0, -3.0] {
            let fish = fish_at(0.0, 0.0, direction, [0.0; 3]);
            let g = &fish.geometry;
            let base = g.tail_joints[2];
            let axis = heading(direction);
            assert!(cross_planar(axis, g.caudal[0][1] - base) < 0.0, "left tip at {direction}");
            assert!(cross_planar(axis, g.caudal[1][2] - base) > 0.0, "right tip at {direction}");
        }
    }

    #[test]
    fn test_fold_to_line() {
        assert_eq!(fold_to_line(0.3), 0.3);
        assert!((fold_to_line(2.0) - (2.0 - PI)).abs() < 1e-6);
        assert!((fold_to_line(-2.0) - (PI - 2.0)).abs() < 1e-6);
        assert_eq!(fold_to_line(-FRAC_PI_2), -FRAC_PI_2);
    }

    proptest! {
        #[test]
        fn prop_rebuild_is_deterministic(
            x in -1500.0f32..1500.0,
            z in -1000.0f32..1000.0,
            direction in -3.14f32..3.14,
            a1 in -1.0f32..1.0,
            a2 in -1.0f32..1.0,
            a3 in -1.0f32..1.0,
        ) {
            let pose = Pose::new(x, z, direction);
            let dims = BodyDimensions::default();
            let first = build_geometry(&pose, &dims, &[a1, a2, a3]);
            let second = build_geometry(&pose, &dims, &[a1, a2, a3]);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_bounding_circles_contain_parts(
            direction in -3.14f32..3.14,
            a1 in -1.57f32..1.57,
            a2 in -1.57f32..1.57,
            a3 in -1.57f32..1.57,
        ) {
            let fish = fish_at(200.0, -100.0, direction, [a1, a2, a3]);
            let g = &fish.geometry;
            for part in g.rigid_parts() {
                for p in part {
                    prop_assert!(g.body_circle.center.distance(*p) <= g.body_circle.radius + 1e-2);
                }
            }
            for part in g.tail_parts() {
                for p in part {
                    prop_assert!(g.tail_circle.center.distance(*p) <= g.tail_circle.radius + 1e-2);
                }
            }
            for p in g.points() {
                prop_assert!(g.whole_circle.center.distance(p) <= g.whole_circle.radius + 1e-2);
            }
        }
    }
}
