//! Deterministic simulation module
//!
//! All physics lives here. This module must be pure and deterministic:
//! - Fixed cycle duration only
//! - Stable iteration order (team, fish, ball, obstacle index)
//! - No rendering or platform dependencies

pub mod collision;
pub mod gait;
pub mod geometry;
pub mod locomotion;
pub mod response;
pub mod scenario;
pub mod shapes;
pub mod state;
pub mod tick;

pub use collision::CollisionResult;
pub use geometry::{FishGeometry, build_geometry, rebuild_geometry};
pub use locomotion::{CycleContext, integrate_ball, integrate_fish};
pub use scenario::{FreeSwim, ObstacleCourse, Scenario, ScenarioKind, Simulation, scenario_for};
pub use shapes::{Circle, Field, Obstacle, Rect};
pub use state::{
    Ball, BodyDimensions, CollisionTag, Decision, DynamicVars, Fish, FishId, HalfCourt, Pose,
    Team, World,
};
pub use tick::{TickInput, tick};
