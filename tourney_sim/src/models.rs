//! Data models for one simulated tournament.
//!
//! Every log level is an immutable record built bottom-up: games into a
//! series, series into a Swiss round or bracket phase, phases into a
//! [`TournamentRun`]. Per-team values are stored as lists of entries instead
//! of maps keyed by id so that ids stay integers in JSON.

use crate::input::TeamId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{cmp::Ordering, fmt, str::FromStr};

/// Win/loss record, also the Swiss bucket key
///
/// Ordering follows pairing priority: more wins first, then fewer losses.
/// Serializes as `"w-l"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Record {
    pub wins: u8,
    pub losses: u8,
}

impl Record {
    pub const fn new(wins: u8, losses: u8) -> Self {
        Self { wins, losses }
    }

    /// Series played so far
    pub fn played(&self) -> u8 {
        self.wins + self.losses
    }
}

impl Ord for Record {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .wins
            .cmp(&self.wins)
            .then_with(|| self.losses.cmp(&other.losses))
    }
}

impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.wins, self.losses)
    }
}

impl FromStr for Record {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (wins, losses) = s
            .split_once('-')
            .ok_or_else(|| format!("record '{s}' is not of the form W-L"))?;
        let wins = wins
            .parse()
            .map_err(|_| format!("record '{s}' has invalid wins"))?;
        let losses = losses
            .parse()
            .map_err(|_| format!("record '{s}' has invalid losses"))?;
        Ok(Self { wins, losses })
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Unordered pair of teams, stored as `(min, max)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey(TeamId, TeamId);

impl PairKey {
    pub fn new(a: TeamId, b: TeamId) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }

    pub fn low(&self) -> TeamId {
        self.0
    }

    pub fn high(&self) -> TeamId {
        self.1
    }
}

/// Team id with its display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: TeamId,
    pub name: String,
}

/// One game inside a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    /// Game number, 1-indexed
    pub game: u8,
    /// Probability that side A wins, as used for this game
    #[serde(rename = "pA")]
    pub p_a: f64,
    pub winner: TeamId,
    #[serde(rename = "scoreA_running")]
    pub score_a_running: u8,
    #[serde(rename = "scoreB_running")]
    pub score_b_running: u8,
}

/// A resolved best-of-N series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesResult {
    pub label: String,
    pub best_of: u8,
    #[serde(rename = "A")]
    pub a: TeamRef,
    #[serde(rename = "B")]
    pub b: TeamRef,
    pub games: Vec<GameResult>,
    /// Games won by (A, B)
    pub final_score: (u8, u8),
    pub winner: TeamRef,
}

impl SeriesResult {
    pub fn winner_id(&self) -> TeamId {
        self.winner.id
    }

    pub fn loser_id(&self) -> TeamId {
        if self.winner.id == self.a.id {
            self.b.id
        } else {
            self.a.id
        }
    }

    pub fn participants(&self) -> [TeamId; 2] {
        [self.a.id, self.b.id]
    }
}

/// A scheduled match between two teams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    #[serde(rename = "A")]
    pub a: TeamId,
    #[serde(rename = "B")]
    pub b: TeamId,
}

impl Pairing {
    pub fn new(a: TeamId, b: TeamId) -> Self {
        Self { a, b }
    }

    pub fn key(&self) -> PairKey {
        PairKey::new(self.a, self.b)
    }
}

/// Team record at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub team_id: TeamId,
    pub wins: u8,
    pub losses: u8,
}

impl TeamRecord {
    pub fn record(&self) -> Record {
        Record::new(self.wins, self.losses)
    }
}

/// Teams sharing one record before a round is paired
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSnapshot {
    pub record: Record,
    pub team_ids: Vec<TeamId>,
    pub team_names: Vec<String>,
}

/// One Swiss round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwissRoundRecord {
    pub round: u8,
    /// Buckets as they stood before pairing, strongest record first
    pub buckets: Vec<BucketSnapshot>,
    pub pairings: Vec<Pairing>,
    pub matches: Vec<SeriesResult>,
    /// Cumulative records of every team after the round, in roster order
    pub records_after: Vec<TeamRecord>,
    /// Buckets that had no rematch-free pairing and were paired anyway
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rematch_buckets: Vec<Record>,
}

/// Swiss settings echoed into the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwissSettings {
    pub random_seeding: bool,
    pub pairing_style: String,
    pub seed_order: Vec<TeamId>,
}

/// Buchholz score of one team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuchholzScore {
    pub team_id: TeamId,
    pub score: u32,
}

/// Final Swiss standings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedOrder {
    /// Every team id, best first
    pub order: Vec<TeamId>,
    /// Buchholz scores, in `order`
    pub buchholz: Vec<BuchholzScore>,
}

impl RankedOrder {
    /// 0-indexed rank of a team
    pub fn rank_of(&self, team_id: TeamId) -> Option<usize> {
        self.order.iter().position(|&t| t == team_id)
    }

    pub fn buchholz_of(&self, team_id: TeamId) -> Option<u32> {
        self.buchholz
            .iter()
            .find(|b| b.team_id == team_id)
            .map(|b| b.score)
    }
}

/// Complete Swiss stage log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwissLog {
    pub rounds: Vec<SwissRoundRecord>,
    pub records_final: Vec<TeamRecord>,
    pub rank: RankedOrder,
    pub config: SwissSettings,
}

/// Play-in round among Swiss ranks 4-13
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EliminationResult {
    pub pairings: Vec<Pairing>,
    pub matches: Vec<SeriesResult>,
    /// Winners in pairing order
    pub winners: Vec<TeamId>,
}

/// Upper bracket trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpperBracketLog {
    #[serde(rename = "QF")]
    pub quarterfinals: Vec<SeriesResult>,
    #[serde(rename = "SF")]
    pub semifinals: Vec<SeriesResult>,
    #[serde(rename = "Final")]
    pub final_match: SeriesResult,
}

/// Lower bracket trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowerBracketLog {
    #[serde(rename = "R1")]
    pub round1: Vec<SeriesResult>,
    #[serde(rename = "R2")]
    pub round2: Vec<SeriesResult>,
    #[serde(rename = "QF")]
    pub quarterfinal: SeriesResult,
    #[serde(rename = "Final")]
    pub final_match: SeriesResult,
}

/// Double-elimination playoff trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayoffLog {
    /// The 8 playoff teams in Swiss order, strongest first
    pub seeds: Vec<TeamId>,
    #[serde(rename = "UB")]
    pub upper: UpperBracketLog,
    #[serde(rename = "LB")]
    pub lower: LowerBracketLog,
    #[serde(rename = "GF")]
    pub grand_final: SeriesResult,
}

/// Full log of one simulated tournament
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentRun {
    pub teams: Vec<TeamRef>,
    pub swiss: SwissLog,
    pub elimination_round: EliminationResult,
    pub playoffs: PlayoffLog,
    pub champion: TeamRef,
}

impl TournamentRun {
    pub fn champion_id(&self) -> TeamId {
        self.champion.id
    }
}
