//! World state and core simulation types
//!
//! Every entity is created once at setup and mutated in place each cycle.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::geometry::{FishGeometry, rebuild_geometry};
use super::shapes::{Circle, Field, Obstacle};
use crate::consts::*;
use crate::{direction_of, heading, normalize_angle, planar};

/// Position plus body direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position in the x/z plane (y is always zero)
    pub position: Vec3,
    /// Body direction (radians, normalized to [-π, π))
    pub direction: f32,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            direction: 0.0,
        }
    }
}

impl Pose {
    pub fn new(x: f32, z: f32, direction: f32) -> Self {
        Self {
            position: planar(x, z),
            direction: normalize_angle(direction),
        }
    }
}

/// Speed and turn codes for one fish for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub speed_code: i32,
    pub turn_code: i32,
}

impl Default for Decision {
    fn default() -> Self {
        Self {
            speed_code: 0,
            turn_code: STRAIGHT_TURN_CODE,
        }
    }
}

impl Decision {
    pub fn new(speed_code: i32, turn_code: i32) -> Self {
        Self {
            speed_code,
            turn_code,
        }
    }

    /// Clamp both codes into `[0, max]`
    pub fn clamped(self, max_speed_code: i32, max_turn_code: i32) -> Self {
        Self {
            speed_code: self.speed_code.clamp(0, max_speed_code.max(0)),
            turn_code: self.turn_code.clamp(0, max_turn_code.max(0)),
        }
    }
}

/// Which half of the field a team defends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HalfCourt {
    #[default]
    Left,
    Right,
}

impl HalfCourt {
    /// Sign applied to every pose increment of the team's fish
    #[inline]
    pub fn flag(self) -> f32 {
        match self {
            HalfCourt::Left => 1.0,
            HalfCourt::Right => -1.0,
        }
    }
}

/// Fixed body dimensions of a fish (mm)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyDimensions {
    /// Length of the rigid body section, front apex to rear
    pub body_length: f32,
    pub body_width: f32,
    /// Distance from the front apex to the shoulders
    pub head_length: f32,
    pub tail_lengths: [f32; 3],
}

impl Default for BodyDimensions {
    fn default() -> Self {
        Self {
            body_length: 180.0,
            body_width: 80.0,
            head_length: 50.0,
            tail_lengths: [50.0, 45.0, 40.0],
        }
    }
}

/// Something a fish touched during the current cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionTag {
    Fish(FishId),
    Ball(usize),
    Obstacle(usize),
    Border,
}

/// Address of a fish within the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FishId {
    pub team: usize,
    pub fish: usize,
}

impl FishId {
    pub fn new(team: usize, fish: usize) -> Self {
        Self { team, fish }
    }
}

/// String key/value pairs passed through to external strategy code.
/// Iterates in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DynamicVars(BTreeMap<String, String>);

impl DynamicVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Set a value, returning the previous one
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An articulated fish agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fish {
    pub pose: Pose,
    /// Pose at the start of the current cycle
    pub prev_pose: Pose,
    /// Velocity magnitude (mm/s)
    pub speed: f32,
    /// Velocity direction (radians)
    pub velocity_direction: f32,
    /// Angular velocity (rad/s)
    pub angular_velocity: f32,
    /// Tail joint deflections relative to the body axis (radians)
    pub tail_angles: [f32; 3],
    pub dims: BodyDimensions,
    /// Last clamped decision applied by the integrator
    pub decision: Decision,
    /// Half-court of the owning team
    #[serde(default)]
    pub side: HalfCourt,
    pub geometry: FishGeometry,
    /// Collisions detected in the current cycle (each tag at most once)
    pub tags: Vec<CollisionTag>,
    #[serde(default)]
    pub vars: DynamicVars,
}

impl Fish {
    pub fn new(dims: BodyDimensions, pose: Pose) -> Self {
        let mut fish = Self {
            pose,
            prev_pose: pose,
            speed: 0.0,
            velocity_direction: pose.direction,
            angular_velocity: 0.0,
            tail_angles: [0.0; 3],
            dims,
            decision: Decision::default(),
            side: HalfCourt::Left,
            geometry: FishGeometry::default(),
            tags: Vec::new(),
            vars: DynamicVars::new(),
        };
        rebuild_geometry(&mut fish);
        fish
    }

    /// Place the fish in a half-court and rebuild its geometry
    pub fn on_side(mut self, side: HalfCourt) -> Self {
        self.side = side;
        rebuild_geometry(&mut self);
        self
    }

    /// Sign applied to every pose increment
    #[inline]
    pub fn half_flag(&self) -> f32 {
        self.side.flag()
    }

    /// Direction the body faces in the world. The right half-court's
    /// frame is mirrored, so its stored angles face the other way.
    pub fn body_direction(&self) -> f32 {
        match self.side {
            HalfCourt::Left => self.pose.direction,
            HalfCourt::Right => normalize_angle(self.pose.direction + std::f32::consts::PI),
        }
    }

    /// Move the fish and rebuild its geometry
    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = Pose {
            position: pose.position,
            direction: normalize_angle(pose.direction),
        };
        rebuild_geometry(self);
    }

    /// Set the tail joint angles and rebuild the geometry
    pub fn set_tail_angles(&mut self, angles: [f32; 3]) {
        self.tail_angles = angles;
        rebuild_geometry(self);
    }

    /// Stored velocity vector (in the team's half-court frame)
    pub fn velocity(&self) -> Vec3 {
        heading(self.velocity_direction) * self.speed
    }

    /// Velocity as it moves the fish in the world
    pub fn world_velocity(&self) -> Vec3 {
        self.velocity() * self.half_flag()
    }

    /// Set the velocity from a world-space vector. A zero vector keeps the
    /// previous direction and zeroes the speed.
    pub fn set_world_velocity(&mut self, velocity: Vec3) {
        let stored = velocity * self.half_flag();
        self.speed = stored.length();
        if let Some(direction) = direction_of(stored) {
            self.velocity_direction = direction;
        }
    }

    pub fn tag(&mut self, tag: CollisionTag) {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    pub fn clear_tags(&mut self) {
        self.tags.clear();
    }

    pub fn has_tag(&self, tag: CollisionTag) -> bool {
        self.tags.contains(&tag)
    }
}

/// A free-floating ball
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub pose: Pose,
    pub prev_pose: Pose,
    /// Velocity magnitude (mm/s)
    pub speed: f32,
    /// Velocity direction (radians)
    pub velocity_direction: f32,
    pub radius: f32,
}

impl Ball {
    pub fn new(position: Vec3, radius: f32) -> Self {
        let pose = Pose {
            position,
            direction: 0.0,
        };
        Self {
            pose,
            prev_pose: pose,
            speed: 0.0,
            velocity_direction: 0.0,
            radius,
        }
    }

    pub fn circle(&self) -> Circle {
        Circle::new(self.pose.position, self.radius)
    }

    pub fn velocity(&self) -> Vec3 {
        heading(self.velocity_direction) * self.speed
    }

    /// Set the velocity from a vector; a zero vector keeps the direction
    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.speed = velocity.length();
        if let Some(direction) = direction_of(velocity) {
            self.velocity_direction = direction;
        }
    }
}

/// A roster of fish sharing a half-court
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub side: HalfCourt,
    pub fish: Vec<Fish>,
    #[serde(default)]
    pub vars: DynamicVars,
}

impl Team {
    pub fn new(name: impl Into<String>, side: HalfCourt) -> Self {
        Self {
            name: name.into(),
            side,
            fish: Vec::new(),
            vars: DynamicVars::new(),
        }
    }

    /// Add a fish to the roster, moving it into the team's half-court
    pub fn add_fish(&mut self, fish: Fish) {
        self.fish.push(fish.on_side(self.side));
    }
}

/// Everything the cycle loop mutates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    pub teams: Vec<Team>,
    pub balls: Vec<Ball>,
    pub obstacles: Vec<Obstacle>,
    pub field: Field,
    /// Completed cycles
    pub cycle: u64,
    #[serde(default)]
    pub vars: DynamicVars,
}

impl World {
    pub fn new(field: Field) -> Self {
        Self {
            teams: Vec::new(),
            balls: Vec::new(),
            obstacles: Vec::new(),
            field,
            cycle: 0,
            vars: DynamicVars::new(),
        }
    }

    /// All fish addresses in team-then-index order
    pub fn fish_ids(&self) -> Vec<FishId> {
        self.teams
            .iter()
            .enumerate()
            .flat_map(|(t, team)| (0..team.fish.len()).map(move |f| FishId::new(t, f)))
            .collect()
    }

    pub fn fish(&self, id: FishId) -> Option<&Fish> {
        self.teams.get(id.team)?.fish.get(id.fish)
    }

    pub fn fish_mut(&mut self, id: FishId) -> Option<&mut Fish> {
        self.teams.get_mut(id.team)?.fish.get_mut(id.fish)
    }

    /// Borrow two distinct fish mutably
    pub fn fish_pair_mut(&mut self, a: FishId, b: FishId) -> Option<(&mut Fish, &mut Fish)> {
        if a == b {
            return None;
        }
        if a.team == b.team {
            let roster = &mut self.teams.get_mut(a.team)?.fish;
            return pair_mut(roster, a.fish, b.fish);
        }
        let (team_a, team_b) = pair_mut(&mut self.teams, a.team, b.team)?;
        Some((team_a.fish.get_mut(a.fish)?, team_b.fish.get_mut(b.fish)?))
    }
}

/// Borrow two distinct elements of a slice mutably
pub(crate) fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> Option<(&mut T, &mut T)> {
    if a == b || a >= items.len() || b >= items.len() {
        return None;
    }
    if a < b {
        let (lo, hi) = items.split_at_mut(b);
        Some((&mut lo[a], &mut hi[0]))
    } else {
        let (lo, hi) = items.split_at_mut(a);
        Some((&mut hi[0], &mut lo[b]))
    }
}
