//! Built-in tail gait
//!
//! A travelling sine wave down the three tail joints. Amplitude and beat
//! frequency grow with the speed code; the turn code adds a steady bend.
//! A fish told to stop and swim straight holds its tail still.

use std::f32::consts::{FRAC_PI_3, TAU};

use super::locomotion::CycleContext;
use super::state::Decision;
use crate::consts::STRAIGHT_TURN_CODE;

/// Peak deflection of the last joint at full speed (radians)
const MAX_AMPLITUDE: f32 = 0.5;
/// Share of the amplitude carried by each joint, root to tip
const JOINT_WEIGHTS: [f32; 3] = [0.4, 0.7, 1.0];
/// Beat frequency range (Hz)
const MIN_FREQUENCY: f32 = 0.8;
const MAX_FREQUENCY: f32 = 2.5;
/// Phase delay between neighbouring joints (radians)
const PHASE_LAG: f32 = 0.9;
/// Steady bend at the sharpest turn code (radians)
const MAX_BEND: f32 = 0.35;
/// No joint bends further than this
const JOINT_LIMIT: f32 = FRAC_PI_3;

/// Tail joint angles for `decision` at `cycle`
pub fn tail_angles(decision: Decision, cycle: u64, ctx: &CycleContext) -> [f32; 3] {
    let decision = ctx.clamp(decision);
    let speed_limit = ctx.config.speed_code_limit().max(1) as f32;
    let turn_span = (ctx.config.turn_code_limit() - STRAIGHT_TURN_CODE)
        .max(STRAIGHT_TURN_CODE)
        .max(1) as f32;

    let effort = decision.speed_code as f32 / speed_limit;
    let turn = ((decision.turn_code - STRAIGHT_TURN_CODE) as f32 / turn_span).clamp(-1.0, 1.0);
    if effort == 0.0 && turn == 0.0 {
        return [0.0; 3];
    }

    let frequency = MIN_FREQUENCY + (MAX_FREQUENCY - MIN_FREQUENCY) * effort;
    let time = cycle as f64 * ctx.cycle_seconds as f64;
    // Keep the phase small before dropping to f32 so long runs stay smooth
    let phase = ((time * frequency as f64).fract() * TAU as f64) as f32;
    let amplitude = MAX_AMPLITUDE * effort;
    // Bend the tail away from the turn
    let bend = -turn * MAX_BEND;

    let mut angles = [0.0; 3];
    for (i, angle) in angles.iter_mut().enumerate() {
        let wave = (phase - PHASE_LAG * i as f32).sin();
        *angle = (amplitude * JOINT_WEIGHTS[i] * wave + bend * JOINT_WEIGHTS[i])
            .clamp(-JOINT_LIMIT, JOINT_LIMIT);
    }
    angles
}
