//! Single best-of-3 play-in round between Swiss ranks 4 and 13.

use crate::{
    errors::{SimResult, SimulationError},
    input::TeamId,
    models::{EliminationResult, Pairing},
    rng::Lcg,
    series::{match_label, play_bo3},
    simulator::TournamentContext,
};
use log::debug;
use std::ops::Range;

/// 0-indexed Swiss ranks that enter the play-in
pub const PLAY_IN_RANKS: Range<usize> = 3..13;

/// Teams seeded straight into the playoffs
pub const DIRECT_PLAYOFF_SLOTS: usize = 3;

/// Fold seeding: first vs last of `slice`, moving inward
pub fn fold_pairings(slice: &[TeamId]) -> Vec<Pairing> {
    let n = slice.len();
    (0..n / 2)
        .map(|i| Pairing::new(slice[i], slice[n - 1 - i]))
        .collect()
}

/// Play the five play-in matches in fixed order
pub fn run_elimination_round(
    ctx: &TournamentContext,
    rng: &mut Lcg,
    swiss_order: &[TeamId],
) -> SimResult<EliminationResult> {
    let entrants = swiss_order.get(PLAY_IN_RANKS).ok_or_else(|| {
        SimulationError::structural(
            "Elimination round",
            format!(
                "needs at least {} ranked teams, got {}",
                PLAY_IN_RANKS.end,
                swiss_order.len()
            ),
        )
    })?;

    let pairings = fold_pairings(entrants);
    let matches: Vec<_> = pairings
        .iter()
        .map(|p| {
            let label = match_label(ctx, "Elim", p.a, p.b);
            play_bo3(ctx, rng, p.a, p.b, label)
        })
        .collect();
    let winners = matches.iter().map(|m| m.winner_id()).collect();

    debug!("Elimination round: winners {winners:?}");
    Ok(EliminationResult {
        pairings,
        matches,
        winners,
    })
}
