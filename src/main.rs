//! RoboFish Sim entry point
//!
//! Headless demo driver: loads a config, runs the arena with a seeded
//! random controller and reports what happened.
//!
//! Usage: `robofish-sim [CONFIG.json] [--cycles N] [--seed S] [--dump]`

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use robofish_sim::SimConfig;
    use robofish_sim::sim::{CollisionTag, Decision, Simulation, TickInput, World};

    const DEFAULT_CYCLES: u64 = 600;
    const DEFAULT_SEED: u64 = 12345;
    /// Cycles a random decision is held before a new one is drawn
    const HOLD_CYCLES: u64 = 10;

    pub struct Options {
        pub config_path: Option<String>,
        pub cycles: u64,
        pub seed: u64,
        pub dump: bool,
    }

    impl Options {
        pub fn parse(args: impl Iterator<Item = String>) -> Self {
            let mut options = Self {
                config_path: None,
                cycles: DEFAULT_CYCLES,
                seed: DEFAULT_SEED,
                dump: false,
            };
            let mut args = args.peekable();
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--cycles" => {
                        options.cycles = parse_or(args.next(), DEFAULT_CYCLES, "--cycles")
                    }
                    "--seed" => options.seed = parse_or(args.next(), DEFAULT_SEED, "--seed"),
                    "--dump" => options.dump = true,
                    _ if options.config_path.is_none() && !arg.starts_with("--") => {
                        options.config_path = Some(arg)
                    }
                    _ => log::warn!("Ignoring argument '{}'", arg),
                }
            }
            options
        }
    }

    fn parse_or(value: Option<String>, fallback: u64, flag: &str) -> u64 {
        match value.as_deref().map(str::parse) {
            Some(Ok(parsed)) => parsed,
            _ => {
                log::warn!("{} needs a number, using {}", flag, fallback);
                fallback
            }
        }
    }

    /// Random decisions, redrawn every few cycles
    struct RandomController {
        rng: Pcg32,
        current: Vec<Vec<Decision>>,
    }

    impl RandomController {
        fn new(seed: u64) -> Self {
            Self {
                rng: Pcg32::seed_from_u64(seed),
                current: Vec::new(),
            }
        }

        fn decide(&mut self, world: &World, config: &SimConfig) -> TickInput {
            if world.cycle % HOLD_CYCLES == 0 || self.current.len() != world.teams.len() {
                let max_speed = config.speed_code_limit();
                let max_turn = config.turn_code_limit();
                self.current = world
                    .teams
                    .iter()
                    .map(|team| {
                        team.fish
                            .iter()
                            .map(|_| {
                                Decision::new(
                                    self.rng.random_range(0..=max_speed),
                                    self.rng.random_range(0..=max_turn),
                                )
                            })
                            .collect()
                    })
                    .collect();
            }
            TickInput {
                decisions: self.current.clone(),
                ..TickInput::default()
            }
        }
    }

    #[derive(Default)]
    struct Tally {
        fish: u64,
        ball: u64,
        obstacle: u64,
        border: u64,
    }

    impl Tally {
        fn count(&mut self, world: &World) {
            for fish in world.teams.iter().flat_map(|team| team.fish.iter()) {
                for tag in &fish.tags {
                    match tag {
                        CollisionTag::Fish(_) => self.fish += 1,
                        CollisionTag::Ball(_) => self.ball += 1,
                        CollisionTag::Obstacle(_) => self.obstacle += 1,
                        CollisionTag::Border => self.border += 1,
                    }
                }
            }
        }
    }

    pub fn run(options: Options) {
        let config = match &options.config_path {
            Some(path) => SimConfig::load_or_default(path),
            None => SimConfig::default(),
        };
        let mut sim = Simulation::new(config);
        let mut controller = RandomController::new(options.seed);
        let mut tally = Tally::default();

        log::info!(
            "Running '{}' for {} cycles (seed {}, {} ms per cycle)",
            sim.scenario_name(),
            options.cycles,
            options.seed,
            sim.config.cycle_ms
        );

        for _ in 0..options.cycles {
            let input = controller.decide(&sim.world, &sim.config);
            sim.step(&input);
            tally.count(&sim.world);
        }

        log::info!(
            "Done after {} cycles: {} fish-fish, {} fish-ball, {} fish-obstacle, {} border tags",
            sim.world.cycle,
            tally.fish,
            tally.ball,
            tally.obstacle,
            tally.border
        );
        for (i, ball) in sim.world.balls.iter().enumerate() {
            log::info!(
                "Ball {} at ({:.0}, {:.0}) moving {:.0} mm/s",
                i,
                ball.pose.position.x,
                ball.pose.position.z,
                ball.speed
            );
        }

        if options.dump {
            match serde_json::to_string_pretty(&sim.world) {
                Ok(json) => println!("{json}"),
                Err(e) => log::error!("Failed to serialize world: {}", e),
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("RoboFish Sim starting...");
    demo::run(demo::Options::parse(std::env::args().skip(1)));
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is the wasm surface; there is no wasm binary
}
