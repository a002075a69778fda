//! Simulation configuration
//!
//! Loaded from JSON. Every field has a default, so a partial or empty
//! document still yields a usable configuration; values that make no
//! physical sense are replaced with defaults by [`SimConfig::sanitized`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::sim::scenario::ScenarioKind;
use crate::sim::shapes::{Field, Obstacle};
use crate::sim::state::BodyDimensions;

/// Speed for each speed code (mm/s)
pub const DEFAULT_SPEED_TABLE: [f32; 16] = [
    0.0, 15.0, 35.0, 55.0, 75.0, 95.0, 115.0, 135.0, 155.0, 175.0, 195.0, 215.0, 235.0, 255.0,
    275.0, 300.0,
];

/// Angular velocity for each turn code (rad/s); code 7 swims straight,
/// lower codes turn left
pub const DEFAULT_TURN_TABLE: [f32; 16] = [
    -1.2, -1.0, -0.8, -0.6, -0.4, -0.25, -0.1, 0.0, 0.1, 0.25, 0.4, 0.6, 0.8, 1.0, 1.2, 1.4,
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Static configuration of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Cycle duration (ms)
    pub cycle_ms: u32,
    pub field: Field,
    pub fish: BodyDimensions,
    pub team_count: usize,
    pub fish_per_team: usize,
    pub ball_count: usize,
    pub ball_radius: f32,
    /// Upper bound of the speed code (may be narrower than the table)
    pub max_speed_code: i32,
    /// Upper bound of the turn code
    pub max_turn_code: i32,
    pub speed_table: Vec<f32>,
    pub turn_table: Vec<f32>,
    /// Constant deceleration of a free ball (mm/s²)
    pub ball_deceleration: f32,
    /// Coefficient of restitution for every contact
    pub restitution: f32,
    pub fish_mass: f32,
    pub ball_mass: f32,
    /// Scale of the spin produced by off-center contacts
    pub angular_gain: f32,
    /// Fraction of a cycle's travel rewound by the backtracking retry
    pub backtrack_fraction: f32,
    /// Drive tail angles from the built-in gait instead of external input
    pub built_in_gait: bool,
    pub scenario: ScenarioKind,
    pub obstacles: Vec<Obstacle>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            cycle_ms: DEFAULT_CYCLE_MS,
            field: Field::default(),
            fish: BodyDimensions::default(),
            team_count: 2,
            fish_per_team: 2,
            ball_count: 1,
            ball_radius: BALL_RADIUS,
            max_speed_code: MAX_SPEED_CODE,
            max_turn_code: MAX_TURN_CODE,
            speed_table: DEFAULT_SPEED_TABLE.to_vec(),
            turn_table: DEFAULT_TURN_TABLE.to_vec(),
            ball_deceleration: BALL_DECELERATION,
            restitution: 1.0,
            fish_mass: 4.0,
            ball_mass: 1.0,
            angular_gain: 1.0,
            backtrack_fraction: BACKTRACK_FRACTION,
            built_in_gait: true,
            scenario: ScenarioKind::default(),
            obstacles: Vec::new(),
        }
    }
}

impl SimConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load a config file, falling back to defaults on any failure
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("{} ({}), using default config", e, path.display());
                Self::default()
            }
        }
    }

    /// Replace nonsensical values with defaults
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();

        fn positive(value: &mut f32, fallback: f32, name: &str) {
            if !(value.is_finite() && *value > 0.0) {
                log::warn!("Invalid {} ({}), using default {}", name, value, fallback);
                *value = fallback;
            }
        }
        fn non_negative(value: &mut f32, fallback: f32, name: &str) {
            if !(value.is_finite() && *value >= 0.0) {
                log::warn!("Invalid {} ({}), using default {}", name, value, fallback);
                *value = fallback;
            }
        }

        if self.cycle_ms == 0 {
            log::warn!("Invalid cycle_ms (0), using default {}", defaults.cycle_ms);
            self.cycle_ms = defaults.cycle_ms;
        }
        positive(&mut self.field.width, defaults.field.width, "field width");
        positive(&mut self.field.height, defaults.field.height, "field height");
        positive(&mut self.fish.body_length, defaults.fish.body_length, "body_length");
        positive(&mut self.fish.body_width, defaults.fish.body_width, "body_width");
        positive(&mut self.fish.head_length, defaults.fish.head_length, "head_length");
        for (i, length) in self.fish.tail_lengths.iter_mut().enumerate() {
            positive(length, defaults.fish.tail_lengths[i], "tail length");
        }
        positive(&mut self.ball_radius, defaults.ball_radius, "ball_radius");
        positive(&mut self.fish_mass, defaults.fish_mass, "fish_mass");
        positive(&mut self.ball_mass, defaults.ball_mass, "ball_mass");
        non_negative(&mut self.ball_deceleration, defaults.ball_deceleration, "ball_deceleration");
        non_negative(&mut self.angular_gain, defaults.angular_gain, "angular_gain");
        if !(0.0..=1.0).contains(&self.restitution) {
            log::warn!("Invalid restitution ({}), using default", self.restitution);
            self.restitution = defaults.restitution;
        }
        if !(0.0..=1.0).contains(&self.backtrack_fraction) {
            log::warn!(
                "Invalid backtrack_fraction ({}), using default",
                self.backtrack_fraction
            );
            self.backtrack_fraction = defaults.backtrack_fraction;
        }
        if self.speed_table.is_empty() || self.speed_table.iter().any(|v| !v.is_finite() || *v < 0.0) {
            log::warn!("Invalid speed_table, using default");
            self.speed_table = defaults.speed_table;
        }
        if self.turn_table.is_empty() || self.turn_table.iter().any(|v| !v.is_finite()) {
            log::warn!("Invalid turn_table, using default");
            self.turn_table = defaults.turn_table;
        }
        self
    }

    /// Cycle duration in seconds
    pub fn cycle_seconds(&self) -> f32 {
        self.cycle_ms as f32 / 1000.0
    }

    /// Largest usable speed code (bounded by the table)
    pub fn speed_code_limit(&self) -> i32 {
        self.max_speed_code
            .min(self.speed_table.len() as i32 - 1)
            .max(0)
    }

    /// Largest usable turn code (bounded by the table)
    pub fn turn_code_limit(&self) -> i32 {
        self.max_turn_code
            .min(self.turn_table.len() as i32 - 1)
            .max(0)
    }
}
