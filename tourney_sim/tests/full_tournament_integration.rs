//! Integration tests for complete tournament runs
//!
//! These tests drive the public API from roster loading through the Grand
//! Final and check the structural guarantees of every stage.

use std::collections::{HashMap, HashSet};
use tourney_sim::{
    NoProgress, PairKey, PairingStyle, ProbabilityMatrix, Record, Roster, SimulationConfig,
    SimulationError, Team, TeamId, TournamentRun, TournamentSimulator,
};

const TEAMS_JSON: &str = r#"{
    "teams": [
        {"team_id": 1, "name": "Vitality", "seed": 1},
        {"team_id": 2, "name": "Spirit", "seed": 2},
        {"team_id": 3, "name": "MOUZ", "seed": 3},
        {"team_id": 4, "name": "FaZe", "seed": 4},
        {"team_id": 5, "name": "NAVI", "seed": 5},
        {"team_id": 6, "name": "G2", "seed": 6},
        {"team_id": 7, "name": "Falcons", "seed": 7},
        {"team_id": 8, "name": "Aurora", "seed": 8},
        {"team_id": 9, "name": "Liquid", "seed": 9},
        {"team_id": 10, "name": "Astralis", "seed": 10},
        {"team_id": 11, "name": "FURIA", "seed": 11},
        {"team_id": 12, "name": "Heroic", "seed": 12},
        {"team_id": 13, "name": "paiN", "seed": 13},
        {"team_id": 14, "name": "MIBR", "seed": 14},
        {"team_id": 15, "name": "3DMAX", "seed": 15},
        {"id": 16, "name": "Virtus.pro", "seed": 16}
    ]
}"#;

/// Matrix favouring lower ids, written with string keys as a loader would
fn matrix_json() -> String {
    let mut outer = serde_json::Map::new();
    for a in 1..=16i64 {
        let mut inner = serde_json::Map::new();
        for b in 1..=16i64 {
            if a != b {
                let p = 0.5 + (b - a) as f64 * 0.03;
                inner.insert(b.to_string(), serde_json::json!(p));
            }
        }
        outer.insert(a.to_string(), serde_json::Value::Object(inner));
    }
    serde_json::Value::Object(outer).to_string()
}

fn simulator(seed: u32) -> TournamentSimulator {
    let roster = Roster::from_json_str(TEAMS_JSON).unwrap();
    let matrix = ProbabilityMatrix::from_json_str(&matrix_json()).unwrap();
    TournamentSimulator::new(roster, matrix, seed)
}

/// Whether `teams` can be split into pairs that have not met yet
fn has_rematch_free_split(teams: &[TeamId], played: &HashSet<PairKey>) -> bool {
    let Some((&first, rest)) = teams.split_first() else {
        return true;
    };
    rest.iter().any(|&partner| {
        if played.contains(&PairKey::new(first, partner)) {
            return false;
        }
        let remaining: Vec<TeamId> = rest.iter().copied().filter(|&t| t != partner).collect();
        has_rematch_free_split(&remaining, played)
    })
}

fn check_run_invariants(run: &TournamentRun) {
    let swiss = &run.swiss;
    assert_eq!(swiss.rounds.len(), 5);

    // Every match of a round pits two distinct teams from the same bucket
    let mut seen_pairs: HashSet<PairKey> = HashSet::new();
    for round in &swiss.rounds {
        let bucket_of: HashMap<TeamId, Record> = round
            .buckets
            .iter()
            .flat_map(|b| b.team_ids.iter().map(move |&t| (t, b.record)))
            .collect();
        assert_eq!(bucket_of.len(), 16);

        let mut busy = HashSet::new();
        for pairing in &round.pairings {
            assert_ne!(pairing.a, pairing.b);
            assert!(busy.insert(pairing.a) && busy.insert(pairing.b));
            let record = bucket_of[&pairing.a];
            assert_eq!(record, bucket_of[&pairing.b]);
            // A pair meets twice only when its bucket had no way around it
            if seen_pairs.contains(&pairing.key()) {
                assert!(
                    round.rematch_buckets.contains(&record),
                    "round {}: {:?} rematch outside a fallback bucket",
                    round.round,
                    pairing.key()
                );
            }
        }
        for bucket in &round.buckets {
            let active: Vec<TeamId> = bucket
                .team_ids
                .iter()
                .copied()
                .filter(|t| busy.contains(t))
                .collect();
            if !active.is_empty() && !has_rematch_free_split(&active, &seen_pairs) {
                assert!(round.rematch_buckets.contains(&bucket.record));
            }
        }
        assert!(
            round
                .rematch_buckets
                .iter()
                .all(|r| round.buckets.iter().any(|b| b.record == *r))
        );
        seen_pairs.extend(round.pairings.iter().map(|p| p.key()));
        assert_eq!(round.matches.len(), round.pairings.len());
        for series in &round.matches {
            assert_eq!(series.best_of, 3);
            let (sa, sb) = series.final_score;
            assert!(sa.max(sb) == 2 && sa.min(sb) <= 1);
        }
    }

    // Teams reaching four wins or four losses sit out round five
    let mut counts: HashMap<Record, usize> = HashMap::new();
    for tr in &swiss.records_final {
        *counts.entry(tr.record()).or_default() += 1;
        assert!(tr.wins <= 4 && tr.losses <= 4);
    }
    assert_eq!(counts.get(&Record::new(4, 0)), Some(&1));
    assert_eq!(counts.get(&Record::new(0, 4)), Some(&1));
    assert_eq!(counts.get(&Record::new(4, 1)), Some(&2));
    assert_eq!(counts.get(&Record::new(1, 4)), Some(&2));
    assert_eq!(counts.get(&Record::new(3, 2)), Some(&5));
    assert_eq!(counts.get(&Record::new(2, 3)), Some(&5));

    // Standings are a permutation of the field
    let mut order = swiss.rank.order.clone();
    order.sort_unstable();
    assert_eq!(order, (1..=16).collect::<Vec<_>>());

    // The play-in takes ranks 4..=13 in fold order
    let play_in = &swiss.rank.order[3..13];
    let elim = &run.elimination_round;
    assert_eq!(elim.pairings.len(), 5);
    for (i, pairing) in elim.pairings.iter().enumerate() {
        assert_eq!(pairing.a, play_in[i]);
        assert_eq!(pairing.b, play_in[9 - i]);
    }

    // Playoff seeds are the top three plus play-in winners, in Swiss order
    let po = &run.playoffs;
    let expected: HashSet<TeamId> = swiss.rank.order[..3]
        .iter()
        .chain(&elim.winners)
        .copied()
        .collect();
    assert_eq!(po.seeds.iter().copied().collect::<HashSet<_>>(), expected);
    let ranks: Vec<usize> = po
        .seeds
        .iter()
        .map(|&t| swiss.rank.rank_of(t).unwrap())
        .collect();
    assert!(ranks.windows(2).all(|w| w[0] < w[1]));

    assert_eq!(po.grand_final.best_of, 5);
    assert_eq!(run.champion_id(), po.grand_final.winner_id());
    assert!(po.seeds.contains(&run.champion_id()));
}

#[test]
fn test_full_runs_hold_structural_invariants() {
    for seed in [1, 7, 42, 1234, 99_999] {
        let mut sim = simulator(seed);
        let config = SimulationConfig::default();
        for _ in 0..3 {
            let run = sim.simulate_once(&config, &mut NoProgress).unwrap();
            check_run_invariants(&run);
        }
    }
}

#[test]
fn test_rematches_only_when_unavoidable() {
    let config = SimulationConfig::default();
    let mut sim = simulator(11);
    let mut fallbacks = 0;
    for _ in 0..300 {
        let run = sim.simulate_once(&config, &mut NoProgress).unwrap();
        check_run_invariants(&run);
        fallbacks += run
            .swiss
            .rounds
            .iter()
            .map(|r| r.rematch_buckets.len())
            .sum::<usize>();
    }
    assert!(fallbacks < 300, "{fallbacks} fallback buckets in 300 runs");
}

#[test]
fn test_fixed_seeding_opening_round() {
    let mut sim = simulator(42);
    let order = sim.context().roster().seed_order_from_seeds().unwrap();
    assert_eq!(order, (1..=16).collect::<Vec<_>>());

    let config = SimulationConfig::seeded(order.clone(), PairingStyle::OneVsSixteen);
    let run = sim.simulate_once(&config, &mut NoProgress).unwrap();
    check_run_invariants(&run);
    let round1: Vec<(TeamId, TeamId)> = run.swiss.rounds[0]
        .pairings
        .iter()
        .map(|p| (p.a, p.b))
        .collect();
    assert_eq!(
        round1,
        vec![(1, 16), (2, 15), (3, 14), (4, 13), (5, 12), (6, 11), (7, 10), (8, 9)]
    );

    let config = SimulationConfig::seeded(order, PairingStyle::Adjacent);
    let run = sim.simulate_once(&config, &mut NoProgress).unwrap();
    assert_eq!(run.swiss.rounds[0].pairings[0].a, 1);
    assert_eq!(run.swiss.rounds[0].pairings[0].b, 2);
    assert_eq!(run.swiss.config.pairing_style, "adjacent");
}

#[test]
fn test_same_seed_same_run() {
    let config = SimulationConfig::default();
    let a = simulator(2024).simulate_once(&config, &mut NoProgress).unwrap();
    let b = simulator(2024).simulate_once(&config, &mut NoProgress).unwrap();
    assert_eq!(
        serde_json::to_vec(&a).unwrap(),
        serde_json::to_vec(&b).unwrap()
    );
}

#[test]
fn test_run_log_json_interchange() {
    let run = simulator(5)
        .simulate_once(&SimulationConfig::default(), &mut NoProgress)
        .unwrap();
    let json = serde_json::to_value(&run).unwrap();

    assert!(json["champion"]["id"].is_i64());
    assert!(json["swiss"]["rank"]["order"][0].is_i64());
    assert!(json["playoffs"]["seeds"][0].is_i64());
    assert!(json["playoffs"]["UB"]["QF"].is_array());
    assert!(json["playoffs"]["LB"]["Final"]["A"]["id"].is_i64());
    assert_eq!(json["playoffs"]["GF"]["best_of"], 5);
    assert!(json["swiss"]["rounds"][0]["buckets"][0]["record"].is_string());

    let back: TournamentRun = serde_json::from_value(json).unwrap();
    assert_eq!(back.champion, run.champion);
    assert_eq!(back.swiss.rank, run.swiss.rank);
    assert_eq!(back.swiss.records_final, run.swiss.records_final);
    assert_eq!(back.playoffs.seeds, run.playoffs.seeds);
}

#[test]
fn test_wrong_field_size_is_structural() {
    let teams: Vec<Team> = (1..=15).map(|i| Team::new(i, format!("T{i}"))).collect();
    let mut sim = TournamentSimulator::from_teams(teams, ProbabilityMatrix::new(), 1).unwrap();
    let err = sim
        .simulate_once(&SimulationConfig::default(), &mut NoProgress)
        .unwrap_err();
    assert!(err.is_structural());
    assert!(err.to_string().contains("Swiss round 1"));
}

#[test]
fn test_fixed_seeding_without_order_is_configuration_error() {
    let mut sim = simulator(1);
    let config = SimulationConfig {
        random_seeding: false,
        ..SimulationConfig::default()
    };
    let err = sim.simulate_once(&config, &mut NoProgress).unwrap_err();
    assert!(matches!(err, SimulationError::Configuration(_)));
}

#[test]
fn test_partial_seed_order_is_configuration_error() {
    let mut sim = simulator(1);
    let config = SimulationConfig::seeded(vec![1, 2, 3], PairingStyle::Adjacent);
    let err = sim.simulate_once(&config, &mut NoProgress).unwrap_err();
    assert!(matches!(err, SimulationError::Configuration(_)));
}

#[test]
fn test_duplicate_seed_order_is_configuration_error() {
    let mut sim = simulator(1);
    let mut order: Vec<TeamId> = (1..=16).collect();
    order[1] = 1;
    let config = SimulationConfig::seeded(order, PairingStyle::OneVsSixteen);
    let err = sim.simulate_once(&config, &mut NoProgress).unwrap_err();
    assert!(matches!(err, SimulationError::Configuration(_)));
    assert!(!err.is_structural());
}

#[test]
fn test_dominant_team_always_wins() {
    let roster = Roster::from_json_str(TEAMS_JSON).unwrap();
    let mut matrix = ProbabilityMatrix::new();
    for other in 2..=16 {
        matrix.insert(1, other, 1.0).unwrap();
        matrix.insert(other, 1, 0.0).unwrap();
    }
    let mut sim = TournamentSimulator::new(roster, matrix, 3);
    for _ in 0..5 {
        let run = sim
            .simulate_once(&SimulationConfig::default(), &mut NoProgress)
            .unwrap();
        assert_eq!(run.swiss.rank.order[0], 1);
        assert_eq!(run.playoffs.seeds[0], 1);
        assert_eq!(run.champion_id(), 1);
        assert_eq!(run.playoffs.grand_final.final_score, (3, 0));
    }
}
