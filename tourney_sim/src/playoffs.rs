//! Eight-team double-elimination playoffs.
//!
//! Upper bracket losers drop into a lower bracket; the upper bracket winner
//! meets the lower bracket winner in a best-of-5 Grand Final. Every phase
//! depends on the one before it, so the bracket is played strictly in order.

use crate::{
    elimination::DIRECT_PLAYOFF_SLOTS,
    errors::{SimResult, SimulationError},
    input::TeamId,
    models::{LowerBracketLog, PlayoffLog, SeriesResult, UpperBracketLog},
    rng::Lcg,
    series::{match_label, play_bo3, play_bo5},
    simulator::{ProgressObserver, TournamentContext},
};
use log::debug;
use std::collections::HashMap;

/// Teams in the playoff bracket
pub const PLAYOFF_FIELD_SIZE: usize = 8;

/// Upper bracket quarterfinal seed positions
pub const UB_QUARTERFINAL_SEEDING: [(usize, usize); 4] = [(0, 7), (3, 4), (2, 5), (1, 6)];

/// Swiss top three plus play-in winners, in Swiss order
pub fn playoff_seeds(swiss_order: &[TeamId], play_in_winners: &[TeamId]) -> SimResult<Vec<TeamId>> {
    let rank: HashMap<TeamId, usize> = swiss_order
        .iter()
        .enumerate()
        .map(|(i, &t)| (t, i))
        .collect();

    let mut seeds: Vec<TeamId> = swiss_order
        .iter()
        .take(DIRECT_PLAYOFF_SLOTS)
        .chain(play_in_winners)
        .copied()
        .collect();
    if seeds.len() != PLAYOFF_FIELD_SIZE {
        return Err(SimulationError::structural(
            "Playoffs",
            format!("expected {PLAYOFF_FIELD_SIZE} seeds, got {}", seeds.len()),
        ));
    }
    if let Some(&unknown) = seeds.iter().find(|t| !rank.contains_key(t)) {
        return Err(SimulationError::structural(
            "Playoffs",
            format!("team {unknown} is not in the Swiss standings"),
        ));
    }
    seeds.sort_by_key(|t| rank[t]);
    Ok(seeds)
}

/// Champion and bracket trace
#[derive(Debug, Clone)]
pub struct PlayoffOutcome {
    pub champion: TeamId,
    pub log: PlayoffLog,
}

struct Bracket<'a> {
    ctx: &'a TournamentContext,
    rng: &'a mut Lcg,
}

impl Bracket<'_> {
    fn bo3(&mut self, prefix: &str, a: TeamId, b: TeamId) -> SeriesResult {
        let label = match_label(self.ctx, prefix, a, b);
        play_bo3(self.ctx, self.rng, a, b, label)
    }

    fn bo5(&mut self, prefix: &str, a: TeamId, b: TeamId) -> SeriesResult {
        let label = match_label(self.ctx, prefix, a, b);
        play_bo5(self.ctx, self.rng, a, b, label)
    }
}

/// Play the full bracket
pub fn run_playoffs(
    ctx: &TournamentContext,
    rng: &mut Lcg,
    swiss_order: &[TeamId],
    play_in_winners: &[TeamId],
    progress: &mut dyn ProgressObserver,
) -> SimResult<PlayoffOutcome> {
    let seeds = playoff_seeds(swiss_order, play_in_winners)?;
    let mut bracket = Bracket { ctx, rng };

    progress.on_progress(0, "Playoffs - Upper Bracket");
    let quarterfinals: Vec<SeriesResult> = UB_QUARTERFINAL_SEEDING
        .iter()
        .map(|&(hi, lo)| bracket.bo3("UB QF", seeds[hi], seeds[lo]))
        .collect();
    let semifinals: Vec<SeriesResult> = quarterfinals
        .chunks_exact(2)
        .map(|qf| bracket.bo3("UB SF", qf[0].winner_id(), qf[1].winner_id()))
        .collect();
    let ub_final = bracket.bo3(
        "UB Final",
        semifinals[0].winner_id(),
        semifinals[1].winner_id(),
    );
    debug!("Upper bracket won by {}", ub_final.winner_id());

    progress.on_progress(0, "Playoffs - Lower Bracket");
    let round1: Vec<SeriesResult> = quarterfinals
        .chunks_exact(2)
        .map(|qf| bracket.bo3("LB R1", qf[0].loser_id(), qf[1].loser_id()))
        .collect();
    let round2: Vec<SeriesResult> = round1
        .iter()
        .zip(&semifinals)
        .map(|(r1, sf)| bracket.bo3("LB R2", r1.winner_id(), sf.loser_id()))
        .collect();
    let lb_quarterfinal = bracket.bo3("LB QF", round2[0].winner_id(), round2[1].winner_id());
    let lb_final = bracket.bo3("LB Final", lb_quarterfinal.winner_id(), ub_final.loser_id());
    debug!("Lower bracket won by {}", lb_final.winner_id());

    progress.on_progress(0, "Playoffs - Grand Final");
    let grand_final = bracket.bo5("Grand Final", ub_final.winner_id(), lb_final.winner_id());
    let champion = grand_final.winner_id();

    Ok(PlayoffOutcome {
        champion,
        log: PlayoffLog {
            seeds,
            upper: UpperBracketLog {
                quarterfinals,
                semifinals,
                final_match: ub_final,
            },
            lower: LowerBracketLog {
                round1,
                round2,
                quarterfinal: lb_quarterfinal,
                final_match: lb_final,
            },
            grand_final,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        input::{ProbabilityMatrix, Roster, Team},
        simulator::NoProgress,
    };
    use std::collections::HashSet;

    fn ctx(matrix: ProbabilityMatrix) -> TournamentContext {
        let teams = (1..=16).map(|i| Team::new(i, format!("Team {i}"))).collect();
        TournamentContext::new(Roster::new(teams).unwrap(), matrix)
    }

    /// Lower id always wins
    fn chalk() -> ProbabilityMatrix {
        let mut m = ProbabilityMatrix::new();
        for a in 1..=16 {
            for b in 1..=16 {
                if a != b {
                    m.insert(a, b, if a < b { 1.0 } else { 0.0 }).unwrap();
                }
            }
        }
        m
    }

    #[test]
    fn test_seeds_resorted_into_swiss_order() {
        let order: Vec<TeamId> = (1..=16).collect();
        let seeds = playoff_seeds(&order, &[13, 5, 11, 7, 8]).unwrap();
        assert_eq!(seeds, vec![1, 2, 3, 5, 7, 8, 11, 13]);

        assert!(playoff_seeds(&order, &[4, 5]).is_err());
        assert!(playoff_seeds(&order, &[4, 5, 6, 7, 99]).is_err());
    }

    #[test]
    fn test_bracket_shape_with_chalk() {
        let ctx = ctx(chalk());
        let order: Vec<TeamId> = (1..=16).collect();
        let mut rng = Lcg::new(1);
        let outcome =
            run_playoffs(&ctx, &mut rng, &order, &[4, 5, 6, 7, 8], &mut NoProgress).unwrap();
        let log = &outcome.log;

        let qf: Vec<[TeamId; 2]> = log.upper.quarterfinals.iter().map(|s| s.participants()).collect();
        assert_eq!(qf, vec![[1, 8], [4, 5], [3, 6], [2, 7]]);
        let sf: Vec<[TeamId; 2]> = log.upper.semifinals.iter().map(|s| s.participants()).collect();
        assert_eq!(sf, vec![[1, 4], [3, 2]]);
        assert_eq!(log.upper.final_match.participants(), [1, 2]);

        let r1: Vec<[TeamId; 2]> = log.lower.round1.iter().map(|s| s.participants()).collect();
        assert_eq!(r1, vec![[8, 5], [6, 7]]);
        let r2: Vec<[TeamId; 2]> = log.lower.round2.iter().map(|s| s.participants()).collect();
        assert_eq!(r2, vec![[5, 4], [6, 3]]);
        assert_eq!(log.lower.quarterfinal.participants(), [4, 3]);
        assert_eq!(log.lower.final_match.participants(), [3, 2]);
        assert_eq!(log.grand_final.participants(), [1, 2]);
        assert_eq!(log.grand_final.best_of, 5);
        assert_eq!(log.grand_final.final_score, (3, 0));
        assert_eq!(outcome.champion, 1);
    }

    #[test]
    fn test_every_team_eliminated_at_most_twice() {
        let ctx = ctx(ProbabilityMatrix::new());
        let order: Vec<TeamId> = (1..=16).collect();
        for seed in 0..25 {
            let mut rng = Lcg::new(seed);
            let outcome =
                run_playoffs(&ctx, &mut rng, &order, &[4, 5, 6, 7, 8], &mut NoProgress).unwrap();
            let log = &outcome.log;
            let seeds: HashSet<TeamId> = log.seeds.iter().copied().collect();
            assert!(seeds.contains(&outcome.champion));

            let all: Vec<&SeriesResult> = log
                .upper
                .quarterfinals
                .iter()
                .chain(&log.upper.semifinals)
                .chain([&log.upper.final_match])
                .chain(&log.lower.round1)
                .chain(&log.lower.round2)
                .chain([&log.lower.quarterfinal, &log.lower.final_match, &log.grand_final])
                .collect();
            assert_eq!(all.len(), 14);

            let mut losses: HashMap<TeamId, usize> = HashMap::new();
            for s in &all {
                assert!(seeds.contains(&s.a.id) && seeds.contains(&s.b.id));
                *losses.entry(s.loser_id()).or_default() += 1;
            }
            assert!(!losses.contains_key(&outcome.champion) || losses[&outcome.champion] == 1);
            assert!(losses.values().all(|&n| n <= 2));
            // seven teams are knocked out
            assert_eq!(losses.len(), 7 + usize::from(losses.contains_key(&outcome.champion)));
        }
    }
}
