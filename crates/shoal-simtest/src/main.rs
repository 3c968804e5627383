//! Shoal Headless Simulation Harness
//!
//! Runs flocks in-process against a demo reef and checks the invariants
//! that must hold every tick. No rendering.
//!
//! Usage:
//!   cargo run -p shoal-simtest
//!   cargo run -p shoal-simtest -- --verbose
//!   cargo run -p shoal-simtest -- --config flock.json --ticks 2000

use serde::Serialize;
use shoal_core::prelude::*;

const DT: f32 = 0.02;
const DEFAULT_TICKS: u32 = 1000;
/// Slack allowed outside the containment box while agents turn back
const CONTAINMENT_SLACK: f32 = 5.0;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

struct Options {
    verbose: bool,
    config_path: Option<String>,
    ticks: u32,
}

impl Options {
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let value_of = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1))
                .cloned()
        };
        Self {
            verbose: args.iter().any(|a| a == "--verbose"),
            config_path: value_of("--config"),
            ticks: value_of("--ticks")
                .and_then(|t| t.parse().ok())
                .unwrap_or(DEFAULT_TICKS),
        }
    }
}

#[derive(Serialize)]
struct RunReport {
    mode: String,
    ticks: u32,
    dt: f32,
    stats: FlockStats,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let options = Options::from_args();
    println!("=== Shoal Simulation Harness ===\n");

    let config = match &options.config_path {
        Some(path) => match FlockConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path, e);
                std::process::exit(2);
            }
        },
        None => FlockConfig {
            seed: Some(0x5EED),
            ..Default::default()
        },
    };

    let mut results = Vec::new();
    let mut reports = Vec::new();

    // 1. Config repair
    results.extend(validate_config(options.verbose));

    // 2. Spawning
    results.extend(validate_spawn(&config, options.verbose));

    // 3. Long runs in both update modes
    for mode in [UpdateMode::Sequential, UpdateMode::DoubleBuffered] {
        let mut run_config = config.clone();
        run_config.update_mode = mode;
        let (run_results, report) = validate_long_run(run_config, options.ticks, options.verbose);
        results.extend(run_results);
        reports.extend(report);
    }

    // 4. Single-agent reactions
    results.extend(validate_reactions(&config, options.verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || options.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    if options.verbose {
        match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("\n{}", json),
            Err(e) => log::error!("Failed to serialize run reports: {}", e),
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn demo_reef() -> ObstacleField {
    ObstacleField::new()
        .with(Obstacle::sphere(Vec3::new(0.0, -9.0, 0.0), 3.0))
        .with(Obstacle::sphere(Vec3::new(9.0, -6.0, -7.0), 2.0))
        .with(Obstacle::sphere(Vec3::new(-8.0, -13.0, 8.0), 2.5))
        .with(Obstacle::cuboid(BoundingBox::new(
            Vec3::new(-16.0, -18.0, -16.0),
            Vec3::new(-10.0, -11.0, -10.0),
        )))
        .with(Obstacle::cuboid(BoundingBox::new(
            Vec3::new(10.0, -18.0, 6.0),
            Vec3::new(14.0, -8.0, 18.0),
        )))
}

/// Threat circling the reef once every ~25 seconds
fn threat_at(tick: u32) -> Vec3 {
    let angle = tick as f32 * DT * 0.25;
    Vec3::new(12.0 * angle.cos(), -8.0, 12.0 * angle.sin())
}

// ── 1. Config ───────────────────────────────────────────────────────────

fn validate_config(verbose: bool) -> Vec<TestResult> {
    println!("--- Config ---");
    let mut results = Vec::new();

    let json = r#"{ "min_speed": 5.0, "max_speed": 1.0, "cohesion_weight": -2.0,
                    "tuning": { "fov_half_angle_deg": 270.0 } }"#;
    match FlockConfig::from_json_str(json) {
        Ok(config) => {
            results.push(TestResult {
                name: "config_speed_order".into(),
                passed: config.min_speed <= config.max_speed,
                detail: format!("speed range {}..{}", config.min_speed, config.max_speed),
            });
            results.push(TestResult {
                name: "config_negative_weight".into(),
                passed: config.cohesion_weight == 0.0,
                detail: format!("cohesion weight repaired to {}", config.cohesion_weight),
            });
            results.push(TestResult {
                name: "config_fov_clamped".into(),
                passed: config.tuning.fov_half_angle_deg <= 180.0,
                detail: format!("fov half-angle {}", config.tuning.fov_half_angle_deg),
            });
        }
        Err(e) => results.push(TestResult {
            name: "config_parse".into(),
            passed: false,
            detail: format!("{}", e),
        }),
    }

    let inverted = r#"{ "spawn_volume": { "min": { "x": 1.0, "y": 0.0, "z": 0.0 },
                                         "max": { "x": -1.0, "y": 0.0, "z": 0.0 } } }"#;
    let rejected = matches!(FlockConfig::from_json_str(inverted), Err(ConfigError::Invalid(_)));
    results.push(TestResult {
        name: "config_inverted_volume".into(),
        passed: rejected,
        detail: if rejected {
            "inverted spawn volume rejected".into()
        } else {
            "inverted spawn volume accepted".into()
        },
    });

    if verbose {
        println!("  {} config checks", results.len());
    }
    results
}

// ── 2. Spawn ────────────────────────────────────────────────────────────

fn validate_spawn(config: &FlockConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Spawn ---");
    let mut results = Vec::new();

    let registry = match FlockRegistry::from_config(config.clone()) {
        Ok(r) => r,
        Err(e) => {
            results.push(TestResult {
                name: "spawn_init".into(),
                passed: false,
                detail: format!("{}", e),
            });
            return results;
        }
    };

    let states = registry.agent_states();
    results.push(TestResult {
        name: "spawn_count".into(),
        passed: states.len() == config.flock_size as usize,
        detail: format!("{} of {} agents spawned", states.len(), config.flock_size),
    });

    let volume = registry.config().spawn_volume;
    let outside = states.iter().filter(|s| !volume.contains(&s.position)).count();
    results.push(TestResult {
        name: "spawn_in_volume".into(),
        passed: outside == 0,
        detail: format!("{} agents outside the spawn volume", outside),
    });

    let (min, max) = (config.min_speed, config.max_speed);
    let shared = registry.shared_speed();
    results.push(TestResult {
        name: "spawn_shared_speed".into(),
        passed: shared >= min && shared <= max,
        detail: format!("initial shared speed {:.3}", shared),
    });

    if verbose {
        println!("  centroid {:?}", registry.stats().centroid);
    }
    results
}

// ── 3. Long run ─────────────────────────────────────────────────────────

fn validate_long_run(
    config: FlockConfig,
    ticks: u32,
    verbose: bool,
) -> (Vec<TestResult>, Option<RunReport>) {
    let mode = format!("{:?}", config.update_mode);
    println!("--- Long run ({}) ---", mode);
    let mut results = Vec::new();

    let mut registry = match FlockRegistry::from_config(config) {
        Ok(r) => r,
        Err(e) => {
            results.push(TestResult {
                name: format!("{}_init", mode),
                passed: false,
                detail: format!("{}", e),
            });
            return (results, None);
        }
    };

    let reef = demo_reef();
    log::info!("{} run over a reef of {} obstacles", mode, reef.len());
    let limits = registry.config().containment;
    let (min, max) = (registry.config().min_speed, registry.config().max_speed);

    let mut speed_violations = 0usize;
    let mut non_finite = 0usize;
    let mut escapes = 0usize;
    let mut worst_escape = 0.0f32;

    for tick in 0..ticks {
        let env = Environment::new(&reef).with_threat(threat_at(tick));
        registry.tick(DT, &env);

        for agent in registry.agent_states() {
            let speed = agent.velocity.length();
            if speed < min - 1.0e-4 || speed > max + 1.0e-4 {
                speed_violations += 1;
            }
            if !agent.position.is_finite() || !agent.velocity.is_finite() {
                non_finite += 1;
            }
            let overshoot = (agent.position.x.abs() - limits.bounds_distance)
                .max(agent.position.z.abs() - limits.bounds_distance)
                .max(agent.position.y - limits.upper_limit)
                .max(limits.lower_limit - agent.position.y);
            if overshoot > CONTAINMENT_SLACK {
                escapes += 1;
                worst_escape = worst_escape.max(overshoot);
            }
        }

        if verbose && tick % 250 == 0 {
            let stats = registry.stats();
            println!(
                "  tick {:5}: centroid ({:6.2}, {:6.2}, {:6.2}) mean speed {:.3}",
                tick, stats.centroid.x, stats.centroid.y, stats.centroid.z, stats.mean_speed
            );
        }
    }

    results.push(TestResult {
        name: format!("{}_speed_bounds", mode),
        passed: speed_violations == 0,
        detail: format!("{} out-of-range speed samples", speed_violations),
    });
    results.push(TestResult {
        name: format!("{}_finite_state", mode),
        passed: non_finite == 0,
        detail: format!("{} non-finite samples", non_finite),
    });
    results.push(TestResult {
        name: format!("{}_containment", mode),
        passed: escapes == 0,
        detail: format!("{} escapes, worst {:.2} past the limits", escapes, worst_escape),
    });

    let stats = registry.stats();
    results.push(TestResult {
        name: format!("{}_population_alive", mode),
        passed: stats.live == stats.population,
        detail: format!("{}/{} live after {} ticks", stats.live, stats.population, stats.ticks),
    });

    let report = RunReport {
        mode,
        ticks,
        dt: DT,
        stats,
    };
    (results, Some(report))
}

// ── 4. Reactions ────────────────────────────────────────────────────────

fn validate_reactions(config: &FlockConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Reactions ---");
    let mut results = Vec::new();

    let lone = FlockConfig {
        flock_size: 0,
        ..config.clone()
    };

    // Rock dead ahead
    if let Ok(mut registry) = FlockRegistry::new(lone.clone()) {
        let fish = registry.add_agent(Vec3::new(0.0, -8.0, 0.0), Vec3::FORWARD, 2.0);
        let rock = ObstacleField::new().with(Obstacle::sphere(Vec3::new(0.0, -8.0, 3.0), 1.0));
        registry.tick(0.1, &Environment::new(&rock));
        let turned = registry
            .agent_state(fish)
            .map(|s| s.forward.angle_to(&Vec3::FORWARD))
            .unwrap_or(0.0);
        results.push(TestResult {
            name: "reaction_obstacle".into(),
            passed: turned > 5.0,
            detail: format!("turned {:.1} degrees in one tick", turned),
        });
    }

    // Threat to the right
    if let Ok(mut registry) = FlockRegistry::new(lone) {
        let fish = registry.add_agent(Vec3::new(0.0, -8.0, 0.0), Vec3::FORWARD, 2.0);
        let env = Environment::open_water().with_threat(Vec3::new(3.0, -8.0, 0.0));
        registry.tick(0.1, &env);
        let vx = registry.agent_state(fish).map(|s| s.velocity.x).unwrap_or(0.0);
        results.push(TestResult {
            name: "reaction_threat".into(),
            passed: vx < 0.0,
            detail: format!("lateral velocity {:.3} away from threat", vx),
        });
    }

    if verbose {
        println!("  {} reaction checks", results.len());
    }
    results
}
