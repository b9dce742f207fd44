//! Simulation configuration.

use crate::{
    errors::{SimResult, SimulationError},
    input::{Roster, TeamId},
};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, str::FromStr};

/// Base seed used when none is supplied
pub const DEFAULT_SEED: u32 = 42;

/// Default number of Monte-Carlo trials
pub const DEFAULT_NUM_SIMULATIONS: usize = 1000;

/// How an ordered group of teams is split into pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PairingStyle {
    /// First vs last, moving inward
    #[default]
    #[serde(rename = "1v16")]
    OneVsSixteen,
    /// Consecutive pairs
    #[serde(rename = "adjacent")]
    Adjacent,
}

impl PairingStyle {
    /// Split `ordered` into pairs; `ordered` must have even length
    pub fn pair<T: Copy>(&self, ordered: &[T]) -> Vec<(T, T)> {
        let n = ordered.len();
        match self {
            PairingStyle::OneVsSixteen => (0..n / 2)
                .map(|i| (ordered[i], ordered[n - 1 - i]))
                .collect(),
            PairingStyle::Adjacent => ordered
                .chunks_exact(2)
                .map(|pair| (pair[0], pair[1]))
                .collect(),
        }
    }
}

impl fmt::Display for PairingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairingStyle::OneVsSixteen => write!(f, "1v16"),
            PairingStyle::Adjacent => write!(f, "adjacent"),
        }
    }
}

impl FromStr for PairingStyle {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1v16" => Ok(PairingStyle::OneVsSixteen),
            "adjacent" => Ok(PairingStyle::Adjacent),
            other => Err(SimulationError::Configuration(format!(
                "unknown pairing style '{other}' (expected '1v16' or 'adjacent')"
            ))),
        }
    }
}

/// Configuration for single runs and Monte-Carlo batches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Shuffle the Round-1 order each run instead of using `seed_order`
    pub random_seeding: bool,
    pub pairing_style: PairingStyle,
    /// Externally supplied order, strongest first
    pub seed_order: Option<Vec<TeamId>>,
    pub num_simulations: usize,
    /// Extra logging only; never changes results
    pub verbose: bool,
    /// Run trials on the rayon pool with per-trial streams
    pub parallel: bool,
    /// Keep every run log in the batch report
    pub retain_runs: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            random_seeding: true,
            pairing_style: PairingStyle::OneVsSixteen,
            seed_order: None,
            num_simulations: DEFAULT_NUM_SIMULATIONS,
            verbose: false,
            parallel: false,
            retain_runs: false,
        }
    }
}

impl SimulationConfig {
    /// Fixed seeding from an explicit order
    pub fn seeded(seed_order: Vec<TeamId>, pairing_style: PairingStyle) -> Self {
        Self {
            random_seeding: false,
            pairing_style,
            seed_order: Some(seed_order),
            ..Self::default()
        }
    }

    pub fn with_simulations(mut self, num_simulations: usize) -> Self {
        self.num_simulations = num_simulations;
        self
    }

    /// Non-empty seed order, if any
    pub fn seed_order(&self) -> Option<&[TeamId]> {
        self.seed_order.as_deref().filter(|order| !order.is_empty())
    }

    /// Check the configuration on its own
    pub fn validate(&self) -> SimResult<()> {
        if self.num_simulations == 0 {
            return Err(SimulationError::Configuration(
                "num_simulations must be at least 1".to_string(),
            ));
        }
        if !self.random_seeding && self.seed_order().is_none() {
            return Err(SimulationError::Configuration(
                "random_seeding is off but no seed_order was provided".to_string(),
            ));
        }
        Ok(())
    }

    /// Check the configuration against the roster it will drive
    pub fn validate_for(&self, roster: &Roster) -> SimResult<()> {
        self.validate()?;
        if let Some(order) = self.seed_order() {
            let mut seen = HashSet::with_capacity(order.len());
            for &id in order {
                if !roster.contains(id) {
                    return Err(SimulationError::Configuration(format!(
                        "seed_order references unknown team {id}"
                    )));
                }
                if !seen.insert(id) {
                    return Err(SimulationError::Configuration(format!(
                        "seed_order lists team {id} twice"
                    )));
                }
            }
        }
        Ok(())
    }
}
