//! Scenarios and the simulation driver
//!
//! A scenario decides how the field and teams are laid out on reset and
//! may inspect the world after every cycle. Rule logic proper (scoring,
//! goals, half swaps) lives outside this crate; the bundled scenarios only
//! place entities and keep simple statistics.

use serde::{Deserialize, Serialize};

use super::shapes::{Circle, Obstacle, Rect};
use super::state::{Ball, CollisionTag, Fish, HalfCourt, Pose, Team, World};
use super::tick::{TickInput, tick};
use crate::planar;
use crate::settings::SimConfig;

/// Scenario selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Open water with the configured obstacles
    #[default]
    FreeSwim,
    /// A fixed layout of walls and posts
    ObstacleCourse,
}

/// Setup and per-cycle hooks of a scenario
pub trait Scenario {
    fn name(&self) -> &'static str;

    /// Place the field, obstacles and balls
    fn reset_field(&self, world: &mut World, config: &SimConfig);

    /// Create teams and place their fish
    fn reset_teams(&self, world: &mut World, config: &SimConfig);

    /// Runs once after every physics cycle
    fn process_rules(&mut self, _world: &mut World) {}
}

pub fn scenario_for(kind: ScenarioKind) -> Box<dyn Scenario> {
    match kind {
        ScenarioKind::FreeSwim => Box::new(FreeSwim),
        ScenarioKind::ObstacleCourse => Box::new(ObstacleCourse::default()),
    }
}

/// Balls in a column through the center of the field
fn place_balls(world: &mut World, config: &SimConfig) {
    let spacing = config.ball_radius * 3.0;
    let offset = (config.ball_count as f32 - 1.0) / 2.0;
    world.balls = (0..config.ball_count)
        .map(|i| Ball::new(planar(0.0, (i as f32 - offset) * spacing), config.ball_radius))
        .collect();
}

/// Teams alternate half-courts; fish line up across their half facing
/// the center line
fn place_teams(world: &mut World, config: &SimConfig) {
    let field = world.field;
    let rows = config.fish_per_team as f32 + 1.0;
    world.teams = (0..config.team_count)
        .map(|t| {
            let side = if t % 2 == 0 {
                HalfCourt::Left
            } else {
                HalfCourt::Right
            };
            // Teams sharing a half stand one body length further back
            let depth = field.half_width() / 2.0 + (t / 2) as f32 * config.fish.body_length * 2.0;
            let x = -depth * side.flag();
            let mut team = Team::new(format!("Team {}", t + 1), side);
            for f in 0..config.fish_per_team {
                let z = -field.half_height() + field.height * (f as f32 + 1.0) / rows;
                team.add_fish(Fish::new(config.fish, Pose::new(x, z, 0.0)));
            }
            team
        })
        .collect();
}

/// Open water: only the configured obstacles
#[derive(Debug, Default)]
pub struct FreeSwim;

impl Scenario for FreeSwim {
    fn name(&self) -> &'static str {
        "free swim"
    }

    fn reset_field(&self, world: &mut World, config: &SimConfig) {
        world.field = config.field;
        world.obstacles = config.obstacles.clone();
        place_balls(world, config);
    }

    fn reset_teams(&self, world: &mut World, config: &SimConfig) {
        place_teams(world, config);
    }
}

/// Walls and posts scattered across the field; counts obstacle contacts
#[derive(Debug, Default)]
pub struct ObstacleCourse {
    contacts: u64,
}

impl ObstacleCourse {
    /// Built-in layout scaled to the field
    fn layout(config: &SimConfig) -> Vec<Obstacle> {
        let hw = config.field.half_width();
        let hh = config.field.half_height();
        vec![
            Obstacle::Rect(Rect::axis_aligned(planar(0.0, -hh * 0.6), hw * 0.05, hh * 0.2)),
            Obstacle::Rect(Rect::axis_aligned(planar(0.0, hh * 0.6), hw * 0.05, hh * 0.2)),
            Obstacle::Rect(Rect {
                center: planar(-hw * 0.3, 0.0),
                half_length: hw * 0.1,
                half_width: hh * 0.03,
                rotation: std::f32::consts::FRAC_PI_4,
            }),
            Obstacle::Rect(Rect {
                center: planar(hw * 0.3, 0.0),
                half_length: hw * 0.1,
                half_width: hh * 0.03,
                rotation: -std::f32::consts::FRAC_PI_4,
            }),
            Obstacle::Circle(Circle::new(planar(-hw * 0.25, -hh * 0.55), hh * 0.06)),
            Obstacle::Circle(Circle::new(planar(hw * 0.25, hh * 0.55), hh * 0.06)),
        ]
    }
}

impl Scenario for ObstacleCourse {
    fn name(&self) -> &'static str {
        "obstacle course"
    }

    fn reset_field(&self, world: &mut World, config: &SimConfig) {
        world.field = config.field;
        world.obstacles = if config.obstacles.is_empty() {
            Self::layout(config)
        } else {
            config.obstacles.clone()
        };
        place_balls(world, config);
    }

    fn reset_teams(&self, world: &mut World, config: &SimConfig) {
        place_teams(world, config);
    }

    fn process_rules(&mut self, world: &mut World) {
        for team in &mut world.teams {
            let mut team_contacts = 0;
            for fish in &team.fish {
                team_contacts += fish
                    .tags
                    .iter()
                    .filter(|tag| matches!(tag, CollisionTag::Obstacle(_)))
                    .count() as u64;
            }
            if team_contacts > 0 {
                let total = team
                    .vars
                    .get("obstacle_contacts")
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(0)
                    + team_contacts;
                team.vars.set("obstacle_contacts", total.to_string());
                self.contacts += team_contacts;
            }
        }
        world.vars.set("obstacle_contacts", self.contacts.to_string());
    }
}

/// A world, its configuration and the active scenario
pub struct Simulation {
    pub world: World,
    pub config: SimConfig,
    scenario: Box<dyn Scenario>,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        let mut sim = Self {
            world: World::new(config.field),
            scenario: scenario_for(config.scenario),
            config,
        };
        sim.reset();
        sim
    }

    /// Rebuild the world from the scenario
    pub fn reset(&mut self) {
        self.scenario = scenario_for(self.config.scenario);
        self.world = World::new(self.config.field);
        self.scenario.reset_field(&mut self.world, &self.config);
        self.scenario.reset_teams(&mut self.world, &self.config);
        log::info!(
            "Reset '{}': {} teams, {} balls, {} obstacles",
            self.scenario.name(),
            self.world.teams.len(),
            self.world.balls.len(),
            self.world.obstacles.len()
        );
    }

    /// Advance one cycle, then apply the scenario's rules
    pub fn step(&mut self, input: &TickInput) {
        tick(&mut self.world, input, &self.config);
        self.scenario.process_rules(&mut self.world);
    }

    pub fn scenario_name(&self) -> &'static str {
        self.scenario.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::Decision;

    #[test]
    fn test_free_swim_layout() {
        let sim = Simulation::new(SimConfig::default());
        let world = &sim.world;
        assert_eq!(sim.scenario_name(), "free swim");
        assert_eq!(world.teams.len(), 2);
        assert_eq!(world.teams[0].side, HalfCourt::Left);
        assert_eq!(world.teams[1].side, HalfCourt::Right);
        assert_eq!(world.balls.len(), 1);
        assert!(world.obstacles.is_empty());
        for team in &world.teams {
            assert_eq!(team.fish.len(), 2);
            for fish in &team.fish {
                assert_eq!(fish.side, team.side);
                assert!(world.field.contains(fish.pose.position));
                // Everyone starts on their own half facing the center line
                let apex = fish.geometry.front_apex.x.abs();
                assert!(apex < fish.pose.position.x.abs());
            }
        }
    }

    #[test]
    fn test_obstacle_course_uses_builtin_layout() {
        let config = SimConfig {
            scenario: ScenarioKind::ObstacleCourse,
            ..SimConfig::default()
        };
        let sim = Simulation::new(config);
        assert_eq!(sim.scenario_name(), "obstacle course");
        assert_eq!(sim.world.obstacles.len(), 6);
        for obstacle in &sim.world.obstacles {
            assert!(sim.world.field.contains(obstacle.center()));
        }
    }

    #[test]
    fn test_obstacle_course_counts_contacts() {
        let config = SimConfig {
            scenario: ScenarioKind::ObstacleCourse,
            team_count: 1,
            fish_per_team: 1,
            ball_count: 0,
            built_in_gait: false,
            ..SimConfig::default()
        };
        let mut sim = Simulation::new(config);
        // Park the fish against the first wall
        let wall = sim.world.obstacles[0].center();
        sim.world.teams[0].fish[0].set_pose(Pose::new(wall.x - 120.0, wall.z, 0.0));
        let input = TickInput {
            decisions: vec![vec![Decision::new(6, 7)]],
            ..TickInput::default()
        };
        for _ in 0..10 {
            sim.step(&input);
        }
        let count: u64 = sim
            .world
            .vars
            .get("obstacle_contacts")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        assert!(count > 0);
        assert_eq!(
            sim.world.teams[0].vars.get("obstacle_contacts"),
            sim.world.vars.get("obstacle_contacts")
        );
    }

    #[test]
    fn test_reset_restores_layout() {
        let mut sim = Simulation::new(SimConfig::default());
        let start = sim.world.teams[0].fish[0].pose;
        let input = TickInput {
            decisions: vec![vec![Decision::new(12, 9); 2]; 2],
            ..TickInput::default()
        };
        for _ in 0..5 {
            sim.step(&input);
        }
        assert_ne!(sim.world.teams[0].fish[0].pose, start);
        sim.reset();
        assert_eq!(sim.world.teams[0].fish[0].pose, start);
        assert_eq!(sim.world.cycle, 0);
    }
}
