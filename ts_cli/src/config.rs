//! Command-line configuration management.
//!
//! Consolidates all environment variable reads and layers CLI flags on top.
//! Precedence: flag, then `TS_*` environment variable, then default.

use std::path::PathBuf;
use tourney_sim::{
    DEFAULT_NUM_SIMULATIONS, DEFAULT_SEED, PairingStyle, SimulationConfig, TeamId,
};

/// Values supplied on the command line; `None` defers to the environment
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub teams: Option<PathBuf>,
    pub matrix: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub num_simulations: Option<usize>,
    pub seed: Option<u32>,
    pub pairing_style: Option<PairingStyle>,
    pub seed_order: Option<Vec<TeamId>>,
    /// Switches only ever turn behaviour on
    pub fixed_seeding: bool,
    pub roster_seeds: bool,
    pub parallel: bool,
    pub retain_runs: bool,
    pub single: bool,
    pub verbose: bool,
}

/// Complete driver configuration
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Roster JSON path
    pub teams: PathBuf,
    /// Probability matrix JSON path
    pub matrix: PathBuf,
    /// Output file; stdout when absent
    pub output: Option<PathBuf>,
    /// Base seed of the simulator's random stream
    pub seed: u32,
    /// Derive the seed order from the roster's `seed` fields
    pub roster_seeds: bool,
    /// Write one tournament run instead of a batch report
    pub single: bool,
    pub simulation: SimulationConfig,
}

impl CliConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `overrides` - Values taken from command-line flags
    ///
    /// # Errors
    ///
    /// Returns error if a pairing style or seed order variable cannot be parsed
    pub fn from_env(overrides: CliOverrides) -> Result<Self, ConfigError> {
        let teams = overrides
            .teams
            .or_else(|| std::env::var("TS_TEAMS").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("teams.json"));

        let matrix = overrides
            .matrix
            .or_else(|| std::env::var("TS_MATRIX").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("prob_matrix.json"));

        let output = overrides
            .output
            .or_else(|| std::env::var("TS_OUTPUT").ok().map(PathBuf::from));

        let pairing_style = match overrides.pairing_style {
            Some(style) => style,
            None => match std::env::var("TS_PAIRING") {
                Ok(v) => v.parse::<PairingStyle>().map_err(|e| ConfigError::Invalid {
                    var: "TS_PAIRING".to_string(),
                    reason: e.to_string(),
                })?,
                Err(_) => PairingStyle::default(),
            },
        };

        let seed_order = match overrides.seed_order {
            Some(order) => Some(order),
            None => match std::env::var("TS_SEED_ORDER") {
                Ok(v) => Some(parse_seed_order(&v).map_err(|reason| ConfigError::Invalid {
                    var: "TS_SEED_ORDER".to_string(),
                    reason,
                })?),
                Err(_) => None,
            },
        };

        let random_seeding =
            !overrides.fixed_seeding && parse_env_or("TS_RANDOM_SEEDING", true);

        let simulation = SimulationConfig {
            random_seeding,
            pairing_style,
            seed_order,
            num_simulations: overrides
                .num_simulations
                .unwrap_or_else(|| parse_env_or("TS_NUM_SIMULATIONS", DEFAULT_NUM_SIMULATIONS)),
            verbose: overrides.verbose || parse_env_or("TS_VERBOSE", false),
            parallel: overrides.parallel || parse_env_or("TS_PARALLEL", false),
            retain_runs: overrides.retain_runs || parse_env_or("TS_RETAIN_RUNS", false),
        };

        Ok(CliConfig {
            teams,
            matrix,
            output,
            seed: overrides
                .seed
                .unwrap_or_else(|| parse_env_or("TS_SEED", DEFAULT_SEED)),
            roster_seeds: overrides.roster_seeds || parse_env_or("TS_ROSTER_SEEDS", false),
            single: overrides.single,
            simulation,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.num_simulations == 0 {
            return Err(ConfigError::Invalid {
                var: "TS_NUM_SIMULATIONS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if !self.simulation.random_seeding
            && self.simulation.seed_order().is_none()
            && !self.roster_seeds
        {
            return Err(ConfigError::MissingRequired {
                var: "TS_SEED_ORDER".to_string(),
                hint: "Fixed seeding needs --seed-order 1,2,... or --roster-seeds".to_string(),
            });
        }

        if self.simulation.seed_order.is_some() && self.roster_seeds {
            return Err(ConfigError::Invalid {
                var: "TS_ROSTER_SEEDS".to_string(),
                reason: "Cannot be combined with an explicit seed order".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse a comma-separated list of team ids
pub fn parse_seed_order(s: &str) -> Result<Vec<TeamId>, String> {
    let order = s
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<TeamId>()
                .map_err(|_| format!("'{t}' is not a team id"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if order.is_empty() {
        return Err("seed order is empty".to_string());
    }
    Ok(order)
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
