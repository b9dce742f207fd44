//! Command-line driver for the tournament simulator.
//!
//! Loads a roster and a probability matrix from disk, runs one tournament or
//! a Monte-Carlo batch, and writes the result as JSON.

mod config;
mod logging;

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

use anyhow::{Context, Error, bail};
use chrono::{DateTime, Utc};
use ctrlc::set_handler;
use log::{info, warn};
use pico_args::Arguments;
use serde::Serialize;
use tourney_sim::{
    PairingStyle, ProbabilityMatrix, Roster, SimulationConfig, SimulationError,
    TournamentSimulator, monte_carlo::SimulationStatistics,
};

use crate::{
    config::{CliConfig, CliOverrides, parse_seed_order},
    logging::ProgressLogger,
};

const HELP: &str = "\
Simulate a 16-team Swiss + double-elimination tournament

USAGE:
  ts_cli [OPTIONS]

OPTIONS:
  --teams      FILE        Roster JSON                    [default: env TS_TEAMS or teams.json]
  --matrix     FILE        Win probability matrix JSON    [default: env TS_MATRIX or prob_matrix.json]
  --sims       N           Number of tournaments          [default: env TS_NUM_SIMULATIONS or 1000]
  --seed       S           Base random seed               [default: env TS_SEED or 42]
  --pairing    STYLE       Round-1 pairing: 1v16|adjacent [default: env TS_PAIRING or 1v16]
  --seed-order IDS         Comma-separated team ids, strongest first
  --output     FILE        Write JSON here instead of stdout

FLAGS:
  --fixed-seeding          Pair Round 1 from the seed order instead of shuffling
  --roster-seeds           Take the seed order from the roster's seed fields
  --parallel               Run trials on all cores with per-trial streams
  --retain-runs            Include every run log in the batch report
  --single                 Simulate one tournament and write its full log
  -v, --verbose            Debug logging
  -h, --help               Print help information

ENVIRONMENT:
  TS_TEAMS, TS_MATRIX, TS_OUTPUT, TS_NUM_SIMULATIONS, TS_SEED, TS_PAIRING,
  TS_SEED_ORDER, TS_RANDOM_SEEDING, TS_PARALLEL, TS_RETAIN_RUNS,
  TS_ROSTER_SEEDS, TS_VERBOSE, RUST_LOG
  (A .env file in the working directory is loaded first)
";

/// Exit status used when Ctrl-C stops a batch
const EXIT_CANCELLED: i32 = 130;

/// JSON document written by the driver
#[derive(Serialize)]
struct Output<T: Serialize> {
    generated_at: DateTime<Utc>,
    started_at: DateTime<Utc>,
    mode: &'static str,
    seed: u32,
    config: SimulationConfig,
    result: T,
}

fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = CliOverrides {
        teams: pargs.opt_value_from_str::<_, PathBuf>("--teams")?,
        matrix: pargs.opt_value_from_str::<_, PathBuf>("--matrix")?,
        output: pargs.opt_value_from_str::<_, PathBuf>("--output")?,
        num_simulations: pargs.opt_value_from_str("--sims")?,
        seed: pargs.opt_value_from_str("--seed")?,
        pairing_style: pargs.opt_value_from_str::<_, PairingStyle>("--pairing")?,
        seed_order: pargs.opt_value_from_fn("--seed-order", parse_seed_order)?,
        fixed_seeding: pargs.contains("--fixed-seeding"),
        roster_seeds: pargs.contains("--roster-seeds"),
        parallel: pargs.contains("--parallel"),
        retain_runs: pargs.contains("--retain-runs"),
        single: pargs.contains("--single"),
        verbose: pargs.contains(["-v", "--verbose"]),
    };
    let remaining = pargs.finish();

    logging::init(overrides.verbose);
    if !remaining.is_empty() {
        warn!("Ignoring unrecognized arguments: {remaining:?}");
    }

    let config = CliConfig::from_env(overrides)?;
    config.validate()?;

    // Ctrl-C stops a batch at the next trial boundary.
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    set_handler(move || flag.store(true, Ordering::Relaxed))?;

    let roster = Roster::from_path(&config.teams)
        .with_context(|| format!("Failed to load roster from {}", config.teams.display()))?;
    let matrix = ProbabilityMatrix::from_path(&config.matrix)
        .with_context(|| format!("Failed to load matrix from {}", config.matrix.display()))?;
    info!(
        "Loaded {} teams and {} matchup probabilities",
        roster.len(),
        matrix.len()
    );

    let mut sim_config = config.simulation.clone();
    if config.roster_seeds {
        match roster.seed_order_from_seeds() {
            Some(order) => sim_config.seed_order = Some(order),
            None => bail!("--roster-seeds given but no team in the roster has a seed"),
        }
    }
    sim_config.validate_for(&roster)?;

    let mut sim = TournamentSimulator::new(roster, matrix, config.seed);
    let started_at = Utc::now();
    let start = Instant::now();

    if config.single {
        let mut progress = ProgressLogger::new(1);
        let run = sim.simulate_once(&sim_config, &mut progress)?;
        logging::log_timing("Tournament", start.elapsed(), 1);
        info!("Champion: {} ({})", run.champion.name, run.champion.id);
        let output = Output {
            generated_at: Utc::now(),
            started_at,
            mode: "single",
            seed: config.seed,
            config: sim_config,
            result: run,
        };
        return write_output(config.output.as_deref(), &output);
    }

    let mut progress = ProgressLogger::new(sim_config.num_simulations);
    let report = match sim.run_batch(&sim_config, &mut progress, Some(cancel.as_ref())) {
        Ok(report) => report,
        Err(SimulationError::Cancelled { completed }) => {
            warn!("Cancelled after {completed} tournaments; no report written");
            std::process::exit(EXIT_CANCELLED);
        }
        Err(e) => return Err(e.into()),
    };
    logging::log_timing("Batch", start.elapsed(), report.runs_completed);

    print_title_odds(&report.statistics)?;
    let output = Output {
        generated_at: Utc::now(),
        started_at,
        mode: if sim_config.parallel {
            "monte_carlo_parallel"
        } else {
            "monte_carlo"
        },
        seed: config.seed,
        config: sim_config,
        result: report,
    };
    write_output(config.output.as_deref(), &output)
}

/// Write pretty JSON to `path`, or to stdout when no path is given
fn write_output<T: Serialize>(path: Option<&Path>, output: &T) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(output)?;
    match path {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}

/// Title odds table on stderr, so stdout stays valid JSON
fn print_title_odds(stats: &SimulationStatistics) -> Result<(), Error> {
    let mut err = io::stderr().lock();
    writeln!(err, "Title odds over {} tournaments:", stats.num_simulations)?;
    for (rank, odds) in stats.title_odds.iter().enumerate() {
        writeln!(
            err,
            "  {:>2}. {:<24} {:>6.2}%",
            rank + 1,
            odds.team,
            odds.win_prob * 100.0
        )?;
    }
    Ok(())
}
