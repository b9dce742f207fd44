//! # Tourney Sim
//!
//! A deterministic simulator for a 16-team esports tournament: a five-round
//! Swiss stage, a best-of-3 play-in round, and an eight-team double-elimination
//! playoff with a best-of-5 Grand Final.
//!
//! Every random decision is drawn from one linear-congruential stream, so a
//! given seed, roster, probability matrix and configuration always produce
//! the same [`TournamentRun`]. Monte-Carlo batches aggregate many runs into
//! [`SimulationStatistics`], either on the simulator's own stream or in
//! parallel with one derived stream per trial.
//!
//! ## Core Modules
//!
//! - [`rng`]: the random stream and per-trial seed derivation
//! - [`input`]: teams, rosters and the head-to-head probability matrix
//! - [`series`]: best-of-N series resolution
//! - [`swiss`], [`ranking`], [`elimination`], [`playoffs`]: the four stages
//! - [`simulator`]: one full tournament
//! - [`monte_carlo`]: batches and statistics
//!
//! ## Example
//!
//! ```
//! use tourney_sim::{NoProgress, ProbabilityMatrix, SimulationConfig, Team, TournamentSimulator};
//!
//! let teams = (1..=16).map(|i| Team::new(i, format!("Team {i}"))).collect();
//! let mut sim = TournamentSimulator::from_teams(teams, ProbabilityMatrix::new(), 42).unwrap();
//!
//! let run = sim.simulate_once(&SimulationConfig::default(), &mut NoProgress).unwrap();
//! assert_eq!(run.playoffs.seeds.len(), 8);
//! ```

pub mod config;
pub mod elimination;
pub mod errors;
pub mod input;
pub mod models;
pub mod monte_carlo;
pub mod playoffs;
pub mod ranking;
pub mod rng;
pub mod series;
pub mod simulator;
pub mod swiss;

pub use config::{DEFAULT_NUM_SIMULATIONS, DEFAULT_SEED, PairingStyle, SimulationConfig};
pub use errors::{SimResult, SimulationError};
pub use input::{ProbabilityMatrix, Roster, Team, TeamId};
pub use models::{PairKey, Record, SeriesResult, TeamRef, TournamentRun};
pub use monte_carlo::{MonteCarloReport, PlayoffStage, SimulationStatistics, StatCounters};
pub use rng::{Lcg, derive_trial_seed};
pub use series::BestOf;
pub use simulator::{NoProgress, ProgressObserver, TournamentContext, TournamentSimulator};
