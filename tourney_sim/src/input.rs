//! Team roster and win-probability matrix, as handed over by the data loader.
//!
//! Both inputs usually arrive as JSON. The matrix is keyed by team id, and
//! since JSON object keys are strings the ids are normalized back to integers
//! here, before any lookup happens.

use crate::errors::{SimResult, SimulationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::HashMap, fs, path::Path};

/// Team ID type
pub type TeamId = i64;

/// Probability used for any pairing missing from the matrix
pub const DEFAULT_WIN_PROBABILITY: f64 = 0.5;

/// A participating team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Stable external id
    #[serde(rename = "team_id", alias = "id")]
    pub id: TeamId,
    /// Display name
    pub name: String,
    /// Optional external seed (1 = strongest)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
    /// How the team qualified (direct invite, regional qualifier, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invitation_type: Option<String>,
}

impl Team {
    pub fn new(id: TeamId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            seed: None,
            invitation_type: None,
        }
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RosterFile {
    Wrapped { teams: Vec<Team> },
    Bare(Vec<Team>),
}

/// Ordered, read-only team roster
///
/// Roster order matters: teams are bucketed and paired in this order, so a
/// different order gives a different (but still reproducible) simulation.
#[derive(Debug, Clone)]
pub struct Roster {
    teams: Vec<Team>,
    index: HashMap<TeamId, usize>,
}

impl Roster {
    /// Build a roster, rejecting duplicate ids
    pub fn new(teams: Vec<Team>) -> SimResult<Self> {
        let mut index = HashMap::with_capacity(teams.len());
        for (pos, team) in teams.iter().enumerate() {
            if index.insert(team.id, pos).is_some() {
                return Err(SimulationError::InvalidInput(format!(
                    "duplicate team id {} ({})",
                    team.id, team.name
                )));
            }
        }
        Ok(Self { teams, index })
    }

    /// Parse `{"teams": [...]}` or a bare array of teams
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let teams = match serde_json::from_str::<RosterFile>(json)? {
            RosterFile::Wrapped { teams } | RosterFile::Bare(teams) => teams,
        };
        Self::new(teams)
    }

    pub fn from_path(path: impl AsRef<Path>) -> SimResult<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Team ids in roster order
    pub fn ids(&self) -> Vec<TeamId> {
        self.teams.iter().map(|t| t.id).collect()
    }

    pub fn contains(&self, id: TeamId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: TeamId) -> Option<&Team> {
        self.index.get(&id).map(|&pos| &self.teams[pos])
    }

    /// Position of a team in roster order
    pub fn position(&self, id: TeamId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Display name, falling back to `#id` for unknown ids
    pub fn name_of(&self, id: TeamId) -> String {
        self.get(id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| format!("#{id}"))
    }

    /// Seed order derived from the optional `seed` field
    ///
    /// Seeded teams come first by ascending seed; unseeded teams follow in
    /// roster order. Returns `None` when no team carries a seed.
    pub fn seed_order_from_seeds(&self) -> Option<Vec<TeamId>> {
        if self.teams.iter().all(|t| t.seed.is_none()) {
            return None;
        }
        let mut ordered: Vec<&Team> = self.teams.iter().collect();
        // Stable: equal seeds and unseeded teams keep roster order
        ordered.sort_by_key(|t| (t.seed.is_none(), t.seed.unwrap_or(u32::MAX)));
        Some(ordered.into_iter().map(|t| t.id).collect())
    }
}

/// Pairwise win probabilities: `get(a, b)` is the chance that `a` beats `b`
///
/// The matrix is not assumed symmetric and `get(a, b)` is never derived from
/// `get(b, a)`. Missing entries, including the diagonal, read as 0.5.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbabilityMatrix {
    entries: HashMap<(TeamId, TeamId), f64>,
}

impl ProbabilityMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `P(a beats b)`, clamped into `[0, 1]`
    pub fn insert(&mut self, a: TeamId, b: TeamId, probability: f64) -> SimResult<()> {
        if probability.is_nan() {
            return Err(SimulationError::InvalidInput(format!(
                "probability for {a} vs {b} is NaN"
            )));
        }
        self.entries.insert((a, b), probability.clamp(0.0, 1.0));
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, a: TeamId, b: TeamId, probability: f64) -> SimResult<Self> {
        self.insert(a, b, probability)?;
        Ok(self)
    }

    /// `P(a beats b)`, 0.5 when unknown
    pub fn get(&self, a: TeamId, b: TeamId) -> f64 {
        if a == b {
            return DEFAULT_WIN_PROBABILITY;
        }
        self.entries
            .get(&(a, b))
            .copied()
            .unwrap_or(DEFAULT_WIN_PROBABILITY)
    }

    pub fn contains(&self, a: TeamId, b: TeamId) -> bool {
        self.entries.contains_key(&(a, b))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build from an already-parsed nested map
    pub fn from_nested(nested: &HashMap<TeamId, HashMap<TeamId, f64>>) -> SimResult<Self> {
        let mut matrix = Self::new();
        for (&a, row) in nested {
            for (&b, &p) in row {
                matrix.insert(a, b, p)?;
            }
        }
        Ok(matrix)
    }

    /// Parse `{"<idA>": {"<idB>": p, ...}, ...}` with string keys
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        let Value::Object(rows) = value else {
            return Err(SimulationError::InvalidInput(
                "probability matrix must be a JSON object".to_string(),
            ));
        };

        let mut matrix = Self::new();
        for (a_key, row) in &rows {
            let a = parse_team_key(a_key)?;
            let Value::Object(cells) = row else {
                return Err(SimulationError::InvalidInput(format!(
                    "matrix row for team {a} must be an object"
                )));
            };
            for (b_key, cell) in cells {
                let b = parse_team_key(b_key)?;
                let p = cell.as_f64().ok_or_else(|| {
                    SimulationError::InvalidInput(format!(
                        "probability for {a} vs {b} is not a number: {cell}"
                    ))
                })?;
                matrix.insert(a, b, p)?;
            }
        }
        Ok(matrix)
    }

    pub fn from_path(path: impl AsRef<Path>) -> SimResult<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }
}

fn parse_team_key(key: &str) -> SimResult<TeamId> {
    key.trim().parse::<TeamId>().map_err(|_| {
        SimulationError::InvalidInput(format!("matrix key '{key}' is not an integer team id"))
    })
}
