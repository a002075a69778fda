//! Locomotion integrator
//!
//! Advances fish and balls by one cycle. A fish's pose is stepped with the
//! velocity decided in the previous cycle; only afterwards does the new
//! decision set the velocity, so every decision takes effect with a
//! one-cycle lag.

use super::geometry::rebuild_geometry;
use super::response::Material;
use super::state::{Ball, Decision, Fish};
use crate::consts::RESPONSE_TIME_FRACTION;
use crate::heading;
use crate::normalize_angle;
use crate::settings::SimConfig;

/// Per-cycle context handed to the integrator and the resolver
#[derive(Debug, Clone, Copy)]
pub struct CycleContext<'a> {
    pub config: &'a SimConfig,
    /// Cycle duration (s)
    pub cycle_seconds: f32,
}

impl<'a> CycleContext<'a> {
    pub fn new(config: &'a SimConfig) -> Self {
        Self {
            config,
            cycle_seconds: config.cycle_seconds(),
        }
    }

    /// Time over which a collision response is applied (s)
    #[inline]
    pub fn response_time(&self) -> f32 {
        self.cycle_seconds * RESPONSE_TIME_FRACTION
    }

    pub fn material(&self) -> Material {
        Material {
            restitution: self.config.restitution,
            angular_gain: self.config.angular_gain,
        }
    }

    /// Clamp a decision into the configured code ranges
    pub fn clamp(&self, decision: Decision) -> Decision {
        decision.clamped(self.config.speed_code_limit(), self.config.turn_code_limit())
    }

    /// Speed for a clamped speed code (mm/s)
    pub fn speed_for(&self, decision: Decision) -> f32 {
        self.config
            .speed_table
            .get(decision.speed_code as usize)
            .copied()
            .unwrap_or(0.0)
    }

    /// Angular velocity for a clamped turn code (rad/s)
    pub fn turn_rate_for(&self, decision: Decision) -> f32 {
        self.config
            .turn_table
            .get(decision.turn_code as usize)
            .copied()
            .unwrap_or(0.0)
    }
}

/// Advance a fish by one cycle and apply its new decision.
///
/// Every pose increment is multiplied by the fish's half-court flag (+1
/// left, -1 right).
pub fn integrate_fish(fish: &mut Fish, decision: Decision, ctx: &CycleContext) {
    let dt = ctx.cycle_seconds;
    let half_flag = fish.half_flag();
    fish.prev_pose = fish.pose;

    // Pose first, from last cycle's velocity
    fish.pose.position += heading(fish.velocity_direction) * (fish.speed * dt * half_flag);
    let turn = fish.angular_velocity * dt * half_flag;
    fish.pose.direction = normalize_angle(fish.pose.direction + turn);
    fish.velocity_direction = normalize_angle(fish.velocity_direction + turn);

    // Then the new decision; thrust acts along the body axis
    let decision = ctx.clamp(decision);
    fish.decision = decision;
    fish.speed = ctx.speed_for(decision);
    fish.angular_velocity = ctx.turn_rate_for(decision);
    fish.velocity_direction = fish.pose.direction;

    rebuild_geometry(fish);
}

/// Advance a ball along its velocity, slowing it by water drag
pub fn integrate_ball(ball: &mut Ball, ctx: &CycleContext) {
    let dt = ctx.cycle_seconds;
    ball.prev_pose = ball.pose;
    ball.pose.position += heading(ball.velocity_direction) * (ball.speed * dt);
    ball.speed = (ball.speed - ctx.config.ball_deceleration * dt).max(0.0);
}
