//! Headless Battle Runner
//!
//! Plays a scenario many times with a random player policy against the
//! built-in enemy AI and prints aggregate results for balance checks.

use battle_grid::battle::{simulate_battle, BattleOutcome, BattleResult, RandomPolicy, Scenario};
use battle_grid::core::config::{config, set_config, EngineConfig};
use battle_grid::data::GameData;
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

/// Headless Battle Runner - seeded batches of automated battles
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Run a scenario repeatedly and report win rates")]
struct Args {
    /// Directory holding units.toml, abilities.toml, status_effects.toml and tags.toml
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Scenario file to play
    #[arg(long, default_value = "data/scenarios/outpost.toml")]
    scenario: PathBuf,

    /// Optional engine.toml overriding the default tunables
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of battles to run
    #[arg(long, default_value_t = 100)]
    battles: u64,

    /// Base seed; battle i uses seed + i
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Log every turn at debug level
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// One battle in the batch
#[derive(Serialize)]
struct BattleRun {
    seed: u64,
    #[serde(flatten)]
    result: BattleResult,
}

/// JSON output structure
#[derive(Serialize)]
struct BatchReport {
    scenario: String,
    battles: u64,
    wins: usize,
    losses: usize,
    unresolved: usize,
    win_rate: f32,
    average_turns: f32,
    base_seed: u64,
    results: Vec<BattleRun>,
}

impl BatchReport {
    fn new(scenario: &str, base_seed: u64, results: Vec<BattleRun>) -> Self {
        let count = |outcome: BattleOutcome| {
            results
                .iter()
                .filter(|r| r.result.outcome == outcome)
                .count()
        };
        let wins = count(BattleOutcome::Victory);
        let losses = count(BattleOutcome::Defeat);
        let unresolved = count(BattleOutcome::Unresolved);
        let battles = results.len();
        let (win_rate, average_turns) = if battles == 0 {
            (0.0, 0.0)
        } else {
            let turns: u32 = results.iter().map(|r| r.result.turns).sum();
            (
                wins as f32 / battles as f32,
                turns as f32 / battles as f32,
            )
        };
        Self {
            scenario: scenario.to_string(),
            battles: battles as u64,
            wins,
            losses,
            unresolved,
            win_rate,
            average_turns,
            base_seed,
            results,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // RUST_LOG wins over the built-in levels
    let default_filter = if args.verbose {
        "battle_grid=debug"
    } else {
        "battle_grid=info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    if let Some(path) = &args.config {
        match EngineConfig::load_from_toml(path) {
            Ok(engine_config) => {
                if set_config(engine_config).is_err() {
                    tracing::warn!("Engine config already initialized, ignoring {}", path.display());
                }
            }
            Err(e) => {
                eprintln!("Failed to load config '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        }
    }

    let data = match GameData::load_from_dir(&args.data_dir) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Failed to load data from '{}': {}", args.data_dir.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let scenario = match Scenario::load_from_toml(&args.scenario) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("Failed to load scenario '{}': {}", args.scenario.display(), e);
            return ExitCode::FAILURE;
        }
    };

    // Surface formation errors once instead of per battle
    let initial = match scenario.initialize(&data) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Scenario '{}' is invalid: {}", scenario.name, e);
            return ExitCode::FAILURE;
        }
    };

    let base_seed = args.seed.unwrap_or_else(rand::random);
    let max_turns = config().max_turns;
    tracing::info!(
        "Running {} battles of '{}' (seed {}, max {} turns)",
        args.battles,
        scenario.name,
        base_seed,
        max_turns
    );

    let results: Vec<BattleRun> = (0..args.battles)
        .into_par_iter()
        .map(|i| {
            let seed = base_seed.wrapping_add(i);
            let mut policy = RandomPolicy::new(ChaCha8Rng::seed_from_u64(seed));
            let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1 << 32));
            let end = simulate_battle(&data, initial.clone(), &mut policy, &mut rng, max_turns);
            BattleRun {
                seed,
                result: BattleResult::from_state(&end),
            }
        })
        .collect();

    let report = BatchReport::new(&scenario.name, base_seed, results);

    match args.format.as_str() {
        "text" => print_text(&report),
        "json" => print_json(&report),
        other => {
            eprintln!("Unknown format '{}', defaulting to json", other);
            print_json(&report);
        }
    }
    ExitCode::SUCCESS
}

fn print_json(report: &BatchReport) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize report: {}", e),
    }
}

fn print_text(report: &BatchReport) {
    println!("Battle Report: {}", report.scenario);
    println!("=============");
    println!("Battles: {}", report.battles);
    println!(
        "Wins: {}  Losses: {}  Unresolved: {}",
        report.wins, report.losses, report.unresolved
    );
    println!("Win rate: {:.1}%", report.win_rate * 100.0);
    println!("Average turns: {:.1}", report.average_turns);
    println!("Base seed: {}", report.base_seed);
}
