//! Swiss group stage: five fixed rounds of same-record pairings.
//!
//! Round 1 pairs all sixteen teams from either a shuffle or the configured
//! seed order. Rounds 2-5 bucket teams by exact record and pair inside each
//! bucket, strongest record first, avoiding rematches where possible.

use crate::{
    config::{PairingStyle, SimulationConfig},
    errors::{SimResult, SimulationError},
    input::TeamId,
    models::{
        BucketSnapshot, PairKey, Pairing, Record, SeriesResult, SwissRoundRecord, SwissSettings,
        TeamRecord,
    },
    rng::Lcg,
    series::{match_label, play_bo3},
    simulator::{ProgressObserver, TournamentContext},
};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Rounds in the Swiss stage
pub const SWISS_ROUNDS: u8 = 5;

/// Teams in the Swiss stage
pub const SWISS_FIELD_SIZE: usize = 16;

/// Wins or losses at which a team stops being paired
pub const ELIMINATION_THRESHOLD: u8 = 4;

/// Shuffles tried per bucket before allowing a rematch
pub const PAIRING_ATTEMPTS: usize = 200;

/// How a bucket ended up paired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingMethod {
    /// Seed order with the configured style, no rematches
    Seeded,
    /// Random shuffle found on the given attempt (1-indexed)
    Shuffled { attempt: usize },
    /// Every shuffle hit a rematch; paired sequentially
    RematchFallback,
}

/// Pairs chosen for one bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketPairing {
    pub pairs: Vec<(TeamId, TeamId)>,
    pub method: PairingMethod,
}

/// Running records, opponent history and played pairs
#[derive(Debug, Clone)]
pub struct SwissState {
    team_order: Vec<TeamId>,
    records: HashMap<TeamId, Record>,
    opponents: HashMap<TeamId, Vec<TeamId>>,
    played: HashSet<PairKey>,
}

impl SwissState {
    /// Everyone at 0-0, in the given order
    pub fn new(team_ids: &[TeamId]) -> Self {
        Self {
            team_order: team_ids.to_vec(),
            records: team_ids.iter().map(|&t| (t, Record::default())).collect(),
            opponents: team_ids.iter().map(|&t| (t, Vec::new())).collect(),
            played: HashSet::new(),
        }
    }

    pub fn team_ids(&self) -> &[TeamId] {
        &self.team_order
    }

    pub fn record(&self, team_id: TeamId) -> Record {
        self.records.get(&team_id).copied().unwrap_or_default()
    }

    /// Opponents faced, in round order
    pub fn opponents(&self, team_id: TeamId) -> &[TeamId] {
        self.opponents.get(&team_id).map_or(&[], Vec::as_slice)
    }

    pub fn has_played(&self, a: TeamId, b: TeamId) -> bool {
        self.played.contains(&PairKey::new(a, b))
    }

    pub fn played_pairs(&self) -> &HashSet<PairKey> {
        &self.played
    }

    /// Still below the win and loss thresholds
    pub fn is_active(&self, team_id: TeamId) -> bool {
        let r = self.record(team_id);
        r.wins < ELIMINATION_THRESHOLD && r.losses < ELIMINATION_THRESHOLD
    }

    /// Teams grouped by record, strongest record first, members in team order
    pub fn buckets(&self, active_only: bool) -> BTreeMap<Record, Vec<TeamId>> {
        let mut buckets: BTreeMap<Record, Vec<TeamId>> = BTreeMap::new();
        for &t in &self.team_order {
            if active_only && !self.is_active(t) {
                continue;
            }
            buckets.entry(self.record(t)).or_default().push(t);
        }
        buckets
    }

    /// Record of every team, in team order
    pub fn snapshot(&self) -> Vec<TeamRecord> {
        self.team_order
            .iter()
            .map(|&t| {
                let r = self.record(t);
                TeamRecord {
                    team_id: t,
                    wins: r.wins,
                    losses: r.losses,
                }
            })
            .collect()
    }

    /// Fold a finished series into the records and history
    pub fn apply(&mut self, series: &SeriesResult) {
        let (a, b) = (series.a.id, series.b.id);
        let winner = series.winner_id();
        let loser = series.loser_id();

        self.played.insert(PairKey::new(a, b));
        self.records.entry(winner).or_default().wins += 1;
        self.records.entry(loser).or_default().losses += 1;
        self.opponents.entry(a).or_default().push(b);
        self.opponents.entry(b).or_default().push(a);
    }
}

/// Result of the Swiss stage
#[derive(Debug, Clone)]
pub struct SwissStage {
    pub state: SwissState,
    pub rounds: Vec<SwissRoundRecord>,
    pub settings: SwissSettings,
}

/// Play all five Swiss rounds
pub fn run_swiss_stage(
    ctx: &TournamentContext,
    rng: &mut Lcg,
    config: &SimulationConfig,
    progress: &mut dyn ProgressObserver,
) -> SimResult<SwissStage> {
    let mut state = SwissState::new(&ctx.roster().ids());
    let mut rounds = Vec::with_capacity(usize::from(SWISS_ROUNDS));

    for round in 1..=SWISS_ROUNDS {
        progress.on_progress(0, &format!("Swiss Stage - Round {round}"));
        let stage = format!("Swiss round {round}");

        let buckets = state.buckets(false);
        let snapshot = buckets
            .iter()
            .map(|(&record, ids)| BucketSnapshot {
                record,
                team_ids: ids.clone(),
                team_names: ids.iter().map(|&t| ctx.name_of(t)).collect(),
            })
            .collect();

        let mut rematch_buckets = Vec::new();
        let pairs = if round == 1 {
            pair_opening_round(rng, &state, config)?
        } else {
            let mut pairs = Vec::with_capacity(SWISS_FIELD_SIZE / 2);
            for (record, group) in state.buckets(true) {
                if group.len() % 2 != 0 {
                    return Err(SimulationError::structural(
                        stage,
                        format!("bucket {record} has odd size {}", group.len()),
                    ));
                }
                let paired = pair_bucket(
                    rng,
                    &group,
                    state.played_pairs(),
                    config.seed_order(),
                    config.pairing_style,
                );
                if paired.method == PairingMethod::RematchFallback {
                    warn!("{stage}: no rematch-free pairing for bucket {record}, allowing rematches");
                    rematch_buckets.push(record);
                }
                pairs.extend(paired.pairs);
            }
            pairs
        };

        let mut matches = Vec::with_capacity(pairs.len());
        for (idx, &(a, b)) in pairs.iter().enumerate() {
            let label = match_label(ctx, &format!("Swiss R{round} M{}", idx + 1), a, b);
            let series = play_bo3(ctx, rng, a, b, label);
            state.apply(&series);
            matches.push(series);
        }

        debug!("{stage}: played {} matches", matches.len());
        rounds.push(SwissRoundRecord {
            round,
            buckets: snapshot,
            pairings: pairs.iter().map(|&(a, b)| Pairing::new(a, b)).collect(),
            matches,
            records_after: state.snapshot(),
            rematch_buckets,
        });
    }

    let settings = SwissSettings {
        random_seeding: config.random_seeding,
        pairing_style: config.pairing_style.to_string(),
        seed_order: config.seed_order().map(<[TeamId]>::to_vec).unwrap_or_default(),
    };
    Ok(SwissStage {
        state,
        rounds,
        settings,
    })
}

/// Round 1: all sixteen teams from 0-0
fn pair_opening_round(
    rng: &mut Lcg,
    state: &SwissState,
    config: &SimulationConfig,
) -> SimResult<Vec<(TeamId, TeamId)>> {
    let field = state
        .buckets(true)
        .remove(&Record::default())
        .unwrap_or_default();
    if field.len() != SWISS_FIELD_SIZE || state.team_ids().len() != SWISS_FIELD_SIZE {
        return Err(SimulationError::structural(
            "Swiss round 1",
            format!(
                "expected all {SWISS_FIELD_SIZE} teams at 0-0, got {} of {}",
                field.len(),
                state.team_ids().len()
            ),
        ));
    }

    let ordered = if config.random_seeding {
        rng.shuffle(&field)
    } else {
        let order = config.seed_order().ok_or_else(|| {
            SimulationError::Configuration(
                "random_seeding is off but no seed_order was provided".to_string(),
            )
        })?;
        let mut listed = HashSet::with_capacity(order.len());
        if let Some(dup) = order.iter().find(|&&t| !listed.insert(t)) {
            return Err(SimulationError::Configuration(format!(
                "seed_order lists team {dup} twice"
            )));
        }
        let ordered: Vec<TeamId> = order
            .iter()
            .copied()
            .filter(|t| field.contains(t))
            .collect();
        if ordered.len() != field.len() {
            return Err(SimulationError::Configuration(format!(
                "seed_order covers {} of the {} Swiss teams",
                ordered.len(),
                field.len()
            )));
        }
        ordered
    };

    Ok(config.pairing_style.pair(&ordered))
}

/// Pair one same-record bucket
///
/// Tries the seed order first, then up to [`PAIRING_ATTEMPTS`] shuffles
/// looking for a rematch-free split, and finally pairs sequentially with
/// rematches allowed. `bucket` must have even length.
pub fn pair_bucket(
    rng: &mut Lcg,
    bucket: &[TeamId],
    played: &HashSet<PairKey>,
    seed_order: Option<&[TeamId]>,
    style: PairingStyle,
) -> BucketPairing {
    let rematch_free = |pairs: &[(TeamId, TeamId)]| {
        pairs
            .iter()
            .all(|&(a, b)| !played.contains(&PairKey::new(a, b)))
    };

    if let Some(order) = seed_order {
        let ordered: Vec<TeamId> = order
            .iter()
            .copied()
            .filter(|t| bucket.contains(t))
            .collect();
        if ordered.len() == bucket.len() {
            let pairs = style.pair(&ordered);
            if rematch_free(&pairs) {
                return BucketPairing {
                    pairs,
                    method: PairingMethod::Seeded,
                };
            }
        }
    }

    for attempt in 1..=PAIRING_ATTEMPTS {
        let shuffled = rng.shuffle(bucket);
        let pairs = PairingStyle::Adjacent.pair(&shuffled);
        if rematch_free(&pairs) {
            return BucketPairing {
                pairs,
                method: PairingMethod::Shuffled { attempt },
            };
        }
    }

    BucketPairing {
        pairs: PairingStyle::Adjacent.pair(bucket),
        method: PairingMethod::RematchFallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::PairingStyle,
        input::{ProbabilityMatrix, Roster, Team},
        simulator::NoProgress,
    };

    fn ctx(n: i64) -> TournamentContext {
        let teams = (1..=n).map(|i| Team::new(i, format!("Team {i}"))).collect();
        TournamentContext::new(Roster::new(teams).unwrap(), ProbabilityMatrix::new())
    }

    #[test]
    fn test_round_one_fixed_1v16() {
        let ctx = ctx(16);
        let config = SimulationConfig::seeded((1..=16).collect(), PairingStyle::OneVsSixteen);
        let mut rng = Lcg::new(42);
        let stage = run_swiss_stage(&ctx, &mut rng, &config, &mut NoProgress).unwrap();

        let expected: Vec<Pairing> = (1..=8).map(|i| Pairing::new(i, 17 - i)).collect();
        assert_eq!(stage.rounds[0].pairings, expected);
    }

    #[test]
    fn test_round_one_fixed_adjacent() {
        let ctx = ctx(16);
        let order: Vec<TeamId> = (1..=16).rev().collect();
        let config = SimulationConfig::seeded(order, PairingStyle::Adjacent);
        let mut rng = Lcg::new(42);
        let stage = run_swiss_stage(&ctx, &mut rng, &config, &mut NoProgress).unwrap();

        let expected: Vec<Pairing> = (0..8)
            .map(|i| Pairing::new(16 - 2 * i, 15 - 2 * i))
            .collect();
        assert_eq!(stage.rounds[0].pairings, expected);
    }

    #[test]
    fn test_record_distribution() {
        let ctx = ctx(16);
        let config = SimulationConfig::default();
        let mut rng = Lcg::new(7);
        let stage = run_swiss_stage(&ctx, &mut rng, &config, &mut NoProgress).unwrap();

        assert_eq!(stage.rounds.len(), 5);
        let sizes: Vec<usize> = stage.rounds.iter().map(|r| r.matches.len()).collect();
        // 4-0 and 0-4 sit out the last round
        assert_eq!(sizes, vec![8, 8, 8, 8, 7]);

        let mut finals: BTreeMap<Record, usize> = BTreeMap::new();
        for t in 1..=16 {
            let r = stage.state.record(t);
            assert!(r.played() == 5 || r.wins == 4 || r.losses == 4);
            assert_eq!(stage.state.opponents(t).len(), usize::from(r.played()));
            *finals.entry(r).or_default() += 1;
        }
        let expected: BTreeMap<Record, usize> = [
            (Record::new(4, 0), 1),
            (Record::new(4, 1), 2),
            (Record::new(3, 2), 5),
            (Record::new(2, 3), 5),
            (Record::new(1, 4), 2),
            (Record::new(0, 4), 1),
        ]
        .into_iter()
        .collect();
        assert_eq!(finals, expected);

        let last = &stage.rounds[4];
        assert!(last.buckets.iter().any(|b| b.record == Record::new(4, 0)));
    }

    #[test]
    fn test_bucket_snapshots_before_pairing() {
        let ctx = ctx(16);
        let mut rng = Lcg::new(3);
        let stage =
            run_swiss_stage(&ctx, &mut rng, &SimulationConfig::default(), &mut NoProgress).unwrap();

        let r1 = &stage.rounds[0];
        assert_eq!(r1.buckets.len(), 1);
        assert_eq!(r1.buckets[0].record, Record::new(0, 0));
        assert_eq!(r1.buckets[0].team_ids.len(), 16);

        let r2 = &stage.rounds[1];
        let records: Vec<Record> = r2.buckets.iter().map(|b| b.record).collect();
        assert_eq!(records, vec![Record::new(1, 0), Record::new(0, 1)]);
        assert!(r2.buckets.iter().all(|b| b.team_ids.len() == 8));
        assert_eq!(r2.buckets[0].team_names[0], ctx.name_of(r2.buckets[0].team_ids[0]));
    }

    #[test]
    fn test_round_one_requires_sixteen() {
        let ctx = ctx(14);
        let mut rng = Lcg::new(1);
        let err = run_swiss_stage(&ctx, &mut rng, &SimulationConfig::default(), &mut NoProgress)
            .unwrap_err();
        assert!(err.is_structural());
        assert!(err.to_string().contains("Swiss round 1"));
    }

    #[test]
    fn test_round_one_requires_seed_order() {
        let ctx = ctx(16);
        let config = SimulationConfig {
            random_seeding: false,
            ..SimulationConfig::default()
        };
        let mut rng = Lcg::new(1);
        let err = run_swiss_stage(&ctx, &mut rng, &config, &mut NoProgress).unwrap_err();
        assert!(matches!(err, SimulationError::Configuration(_)));
    }

    #[test]
    fn test_partial_seed_order_rejected() {
        let ctx = ctx(16);
        let config = SimulationConfig::seeded((1..=10).collect(), PairingStyle::Adjacent);
        let mut rng = Lcg::new(1);
        assert!(run_swiss_stage(&ctx, &mut rng, &config, &mut NoProgress).is_err());
    }

    #[test]
    fn test_duplicate_seed_order_rejected_at_round_one() {
        let ctx = ctx(16);
        let mut order: Vec<TeamId> = (1..=16).collect();
        order[1] = 1;
        let config = SimulationConfig::seeded(order, PairingStyle::OneVsSixteen);
        let mut rng = Lcg::new(1);
        let err = run_swiss_stage(&ctx, &mut rng, &config, &mut NoProgress).unwrap_err();
        assert!(matches!(err, SimulationError::Configuration(_)));
        assert!(err.to_string().contains("team 1 twice"));
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn test_pair_bucket_prefers_seed_order() {
        let mut rng = Lcg::new(5);
        let played = HashSet::new();
        let result = pair_bucket(
            &mut rng,
            &[4, 3, 2, 1],
            &played,
            Some(&[1, 2, 3, 4, 5, 6]),
            PairingStyle::OneVsSixteen,
        );
        assert_eq!(result.method, PairingMethod::Seeded);
        assert_eq!(result.pairs, vec![(1, 4), (2, 3)]);
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn test_pair_bucket_avoids_rematch() {
        let mut rng = Lcg::new(5);
        let played: HashSet<PairKey> = [PairKey::new(1, 4)].into_iter().collect();
        let result = pair_bucket(
            &mut rng,
            &[1, 2, 3, 4],
            &played,
            Some(&[1, 2, 3, 4]),
            PairingStyle::OneVsSixteen,
        );
        assert!(matches!(result.method, PairingMethod::Shuffled { .. }));
        for &(a, b) in &result.pairs {
            assert!(!played.contains(&PairKey::new(a, b)));
        }
    }

    #[test]
    fn test_pair_bucket_checks_both_orientations() {
        // Rematch-free splits left: 1-3/2-4 and 1-4/2-3
        let played: HashSet<PairKey> = [PairKey::new(2, 1), PairKey::new(4, 3)]
            .into_iter()
            .collect();
        for seed in 0..50 {
            let mut rng = Lcg::new(seed);
            let result = pair_bucket(&mut rng, &[1, 2, 3, 4], &played, None, PairingStyle::Adjacent);
            for &(a, b) in &result.pairs {
                assert!(!played.contains(&PairKey::new(a, b)));
            }
        }
    }

    #[test]
    fn test_pair_bucket_rematch_fallback() {
        let mut rng = Lcg::new(9);
        let played: HashSet<PairKey> = [PairKey::new(1, 2)].into_iter().collect();
        let result = pair_bucket(&mut rng, &[1, 2], &played, None, PairingStyle::Adjacent);
        assert_eq!(result.method, PairingMethod::RematchFallback);
        assert_eq!(result.pairs, vec![(1, 2)]);
        // one draw per shuffle of a two-team bucket
        assert_eq!(rng.draws(), PAIRING_ATTEMPTS as u64);
    }

    #[test]
    fn test_state_apply() {
        let ctx = ctx(2);
        let mut state = SwissState::new(&[1, 2]);
        let mut rng = Lcg::new(1);
        let series = play_bo3(&ctx, &mut rng, 1, 2, "t".to_string());
        state.apply(&series);

        assert!(state.has_played(2, 1));
        assert_eq!(state.record(series.winner_id()), Record::new(1, 0));
        assert_eq!(state.record(series.loser_id()), Record::new(0, 1));
        assert_eq!(state.opponents(1), &[2]);
        assert_eq!(state.opponents(2), &[1]);
    }
}
