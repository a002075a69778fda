//! Fixed-cycle simulation tick
//!
//! Runs the per-cycle pipeline in a fixed order: locomotion, then the
//! collision passes. Iteration order (team, fish index, ball index,
//! obstacle index) is part of the observable behaviour.

use std::f32::consts::FRAC_PI_2;

use glam::Vec3;

use super::collision::{
    CollisionResult, ball_ball, ball_border, ball_obstacle, fish_ball, fish_border, fish_fish,
    fish_obstacle,
};
use super::gait;
use super::geometry::rebuild_geometry;
use super::locomotion::{CycleContext, integrate_ball, integrate_fish};
use super::response::{Body, apply_to_ball, apply_to_fish, respond, separation};
use super::state::{Ball, CollisionTag, Decision, Fish, FishId, World, pair_mut};
use crate::settings::SimConfig;

/// Per-cycle input from the strategy layer
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Decisions indexed by [team][fish]; a missing entry stops the fish
    pub decisions: Vec<Vec<Decision>>,
    /// Tail joint angles indexed by [team][fish], used when the built-in
    /// gait is off. A missing entry keeps the current angles.
    pub tail_angles: Vec<Vec<[f32; 3]>>,
}

impl TickInput {
    pub fn decision(&self, id: FishId) -> Decision {
        self.decisions
            .get(id.team)
            .and_then(|team| team.get(id.fish))
            .copied()
            .unwrap_or_default()
    }

    pub fn tail_angles(&self, id: FishId) -> Option<[f32; 3]> {
        self.tail_angles
            .get(id.team)
            .and_then(|team| team.get(id.fish))
            .copied()
    }
}

/// Advance the world by one cycle
pub fn tick(world: &mut World, input: &TickInput, config: &SimConfig) {
    let ctx = CycleContext::new(config);

    swim(world, input, &ctx);

    for team in &mut world.teams {
        for fish in &mut team.fish {
            fish.clear_tags();
        }
    }

    resolve_balls_vs_obstacles(world, &ctx);
    resolve_ball_pairs(world, &ctx);

    let ids = world.fish_ids();
    for (i, &id) in ids.iter().enumerate() {
        for index in 0..world.obstacles.len() {
            resolve_fish_obstacle(world, id, index, &ctx);
        }
        for &other in &ids[i + 1..] {
            resolve_fish_pair(world, id, other, &ctx);
        }
        for index in 0..world.balls.len() {
            resolve_fish_ball(world, id, index, &ctx);
        }
        check_fish_border(world, id);
    }

    resolve_balls_vs_border(world, &ctx);
    // Second sweep catches balls pushed into obstacles by fish and walls
    resolve_balls_vs_obstacles(world, &ctx);

    world.cycle += 1;
}

/// Locomotion for every fish and ball
fn swim(world: &mut World, input: &TickInput, ctx: &CycleContext) {
    let cycle = world.cycle;
    for (t, team) in world.teams.iter_mut().enumerate() {
        for (f, fish) in team.fish.iter_mut().enumerate() {
            let id = FishId::new(t, f);
            let decision = input.decision(id);
            if ctx.config.built_in_gait {
                fish.tail_angles = gait::tail_angles(decision, cycle, ctx);
            } else if let Some(angles) = input.tail_angles(id) {
                // Non-finite joint angles keep the current ones
                for (current, angle) in fish.tail_angles.iter_mut().zip(angles) {
                    if angle.is_finite() {
                        *current = angle.clamp(-FRAC_PI_2, FRAC_PI_2);
                    }
                }
            }
            integrate_fish(fish, decision, ctx);
        }
    }
    for ball in &mut world.balls {
        integrate_ball(ball, ctx);
    }
}

fn nudge_fish(fish: &mut Fish, offset: Vec3) {
    if offset != Vec3::ZERO {
        fish.pose.position += offset;
        rebuild_geometry(fish);
    }
}

/// Rewind both fish part of a cycle along their velocity and test again.
/// If the rewound pair is clear, the original poses come back and the
/// original contact stands; otherwise the rewound poses are kept.
fn backtrack_fish_pair(
    a: &mut Fish,
    b: &mut Fish,
    contact: CollisionResult,
    ctx: &CycleContext,
) -> CollisionResult {
    let rewind = ctx.cycle_seconds * ctx.config.backtrack_fraction;
    let (pose_a, pose_b) = (a.pose, b.pose);
    let (back_a, back_b) = (-a.world_velocity() * rewind, -b.world_velocity() * rewind);
    nudge_fish(a, back_a);
    nudge_fish(b, back_b);

    let retry = fish_fish(&a.geometry, &b.geometry);
    if retry.hit {
        return retry;
    }
    a.set_pose(pose_a);
    b.set_pose(pose_b);
    contact
}

/// Same retry for a fish against a ball
fn backtrack_fish_ball(
    fish: &mut Fish,
    ball: &mut Ball,
    contact: CollisionResult,
    ctx: &CycleContext,
) -> CollisionResult {
    let rewind = ctx.cycle_seconds * ctx.config.backtrack_fraction;
    let (fish_pose, ball_pose) = (fish.pose, ball.pose);
    let back = -fish.world_velocity() * rewind;
    nudge_fish(fish, back);
    ball.pose.position -= ball.velocity() * rewind;

    let retry = fish_ball(&fish.geometry, &ball.circle());
    if retry.hit {
        return retry;
    }
    fish.set_pose(fish_pose);
    ball.pose = ball_pose;
    contact
}

fn resolve_fish_pair(world: &mut World, a_id: FishId, b_id: FishId, ctx: &CycleContext) {
    let Some((a, b)) = world.fish_pair_mut(a_id, b_id) else {
        return;
    };
    let contact = fish_fish(&a.geometry, &b.geometry);
    if !contact.hit {
        return;
    }
    a.tag(CollisionTag::Fish(b_id));
    b.tag(CollisionTag::Fish(a_id));

    let contact = backtrack_fish_pair(a, b, contact, ctx);
    let mass = ctx.config.fish_mass;
    let (body_a, body_b) = (Body::fish(a, mass), Body::fish(b, mass));
    let (ra, rb) = respond(&body_a, &body_b, &contact, ctx.material());
    apply_to_fish(a, &ra, ctx.response_time());
    apply_to_fish(b, &rb, ctx.response_time());

    let retest = fish_fish(&a.geometry, &b.geometry);
    if retest.hit {
        let (da, db) = separation(&retest, &body_a, &body_b);
        nudge_fish(a, da);
        nudge_fish(b, db);
    }
    log::debug!(
        "fish {:?} hit fish {:?} at {:?} (depth {:.1})",
        a_id,
        b_id,
        contact.point,
        contact.penetration
    );
}

fn resolve_fish_ball(world: &mut World, id: FishId, index: usize, ctx: &CycleContext) {
    let Some(fish) = world
        .teams
        .get_mut(id.team)
        .and_then(|team| team.fish.get_mut(id.fish))
    else {
        return;
    };
    let Some(ball) = world.balls.get_mut(index) else {
        return;
    };
    let contact = fish_ball(&fish.geometry, &ball.circle());
    if !contact.hit {
        return;
    }
    fish.tag(CollisionTag::Ball(index));

    let contact = backtrack_fish_ball(fish, ball, contact, ctx);
    let body_fish = Body::fish(fish, ctx.config.fish_mass);
    let body_ball = Body::ball(ball, ctx.config.ball_mass);
    let (rf, rb) = respond(&body_fish, &body_ball, &contact, ctx.material());
    apply_to_fish(fish, &rf, ctx.response_time());
    apply_to_ball(ball, &rb, ctx.response_time());

    let retest = fish_ball(&fish.geometry, &ball.circle());
    if retest.hit {
        let (df, db) = separation(&retest, &body_fish, &body_ball);
        nudge_fish(fish, df);
        ball.pose.position += db;
    }
    log::debug!("fish {:?} hit ball {} at {:?}", id, index, contact.point);
}

fn resolve_fish_obstacle(world: &mut World, id: FishId, index: usize, ctx: &CycleContext) {
    let Some(&obstacle) = world.obstacles.get(index) else {
        return;
    };
    let Some(fish) = world.fish_mut(id) else {
        return;
    };
    let contact = fish_obstacle(&fish.geometry, &obstacle);
    if !contact.hit {
        return;
    }
    fish.tag(CollisionTag::Obstacle(index));

    let body_fish = Body::fish(fish, ctx.config.fish_mass);
    let wall = Body::fixed(obstacle.center());
    let (rf, _) = respond(&body_fish, &wall, &contact, ctx.material());
    apply_to_fish(fish, &rf, ctx.response_time());

    let retest = fish_obstacle(&fish.geometry, &obstacle);
    if retest.hit {
        let (df, _) = separation(&retest, &body_fish, &wall);
        nudge_fish(fish, df);
    }
    log::debug!("fish {:?} hit obstacle {} at {:?}", id, index, contact.point);
}

/// Border contacts are recorded but not resolved
fn check_fish_border(world: &mut World, id: FishId) {
    let field = world.field;
    let Some(fish) = world.fish_mut(id) else {
        return;
    };
    let contact = fish_border(&fish.geometry, &field);
    if contact.hit {
        fish.tag(CollisionTag::Border);
        rebuild_geometry(fish);
        log::debug!("fish {:?} touched the border at {:?}", id, contact.point);
    }
}

fn resolve_balls_vs_obstacles(world: &mut World, ctx: &CycleContext) {
    let mass = ctx.config.ball_mass;
    for (b, ball) in world.balls.iter_mut().enumerate() {
        for (o, obstacle) in world.obstacles.iter().enumerate() {
            let contact = ball_obstacle(&ball.circle(), obstacle);
            if !contact.hit {
                continue;
            }
            let body = Body::ball(ball, mass);
            let wall = Body::fixed(obstacle.center());
            let (response, _) = respond(&body, &wall, &contact, ctx.material());
            apply_to_ball(ball, &response, ctx.response_time());

            let retest = ball_obstacle(&ball.circle(), obstacle);
            if retest.hit {
                let (offset, _) = separation(&retest, &body, &wall);
                ball.pose.position += offset;
            }
            log::debug!("ball {} hit obstacle {} at {:?}", b, o, contact.point);
        }
    }
}

fn resolve_ball_pairs(world: &mut World, ctx: &CycleContext) {
    let mass = ctx.config.ball_mass;
    let count = world.balls.len();
    for i in 0..count {
        for j in i + 1..count {
            let Some((a, b)) = pair_mut(&mut world.balls, i, j) else {
                continue;
            };
            let contact = ball_ball(&a.circle(), &b.circle());
            if !contact.hit {
                continue;
            }
            let (body_a, body_b) = (Body::ball(a, mass), Body::ball(b, mass));
            let (ra, rb) = respond(&body_a, &body_b, &contact, ctx.material());
            apply_to_ball(a, &ra, ctx.response_time());
            apply_to_ball(b, &rb, ctx.response_time());

            let retest = ball_ball(&a.circle(), &b.circle());
            if retest.hit {
                let (da, db) = separation(&retest, &body_a, &body_b);
                a.pose.position += da;
                b.pose.position += db;
            }
            log::debug!("ball {} hit ball {} at {:?}", i, j, contact.point);
        }
    }
}

fn resolve_balls_vs_border(world: &mut World, ctx: &CycleContext) {
    let mass = ctx.config.ball_mass;
    let field = world.field;
    for (b, ball) in world.balls.iter_mut().enumerate() {
        let contact = ball_border(&ball.circle(), &field);
        if !contact.hit {
            continue;
        }
        // The wall is the first body; its normal points into the field
        let wall = Body::fixed(contact.point);
        let body = Body::ball(ball, mass);
        let (_, response) = respond(&wall, &body, &contact, ctx.material());
        apply_to_ball(ball, &response, ctx.response_time());

        let retest = ball_border(&ball.circle(), &field);
        if retest.hit {
            let (_, offset) = separation(&retest, &wall, &body);
            ball.pose.position += offset;
        }
        log::debug!("ball {} hit the border at {:?}", b, contact.point);
    }
}
