//! Best-of-N series resolution.

use crate::{
    input::TeamId,
    models::{GameResult, SeriesResult},
    rng::Lcg,
    simulator::TournamentContext,
};
use serde::{Deserialize, Serialize};

/// Series length; always odd so a series cannot end level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BestOf(u8);

impl BestOf {
    pub const BO3: BestOf = BestOf(3);
    pub const BO5: BestOf = BestOf(5);

    /// `None` unless `games` is odd
    pub fn new(games: u8) -> Option<Self> {
        (games % 2 == 1).then_some(Self(games))
    }

    pub fn games(&self) -> u8 {
        self.0
    }

    /// Wins needed to take the series
    pub fn wins_needed(&self) -> u8 {
        self.0 / 2 + 1
    }
}

/// Play one game; returns whether `a` won and the probability used
///
/// The probability is looked up in the `a -> b` direction only.
pub fn play_game(ctx: &TournamentContext, rng: &mut Lcg, a: TeamId, b: TeamId) -> (bool, f64) {
    let p = ctx.matrix().get(a, b);
    (rng.next_f64() < p, p)
}

/// Play games until one side reaches `best_of.wins_needed()`
pub fn play_series(
    ctx: &TournamentContext,
    rng: &mut Lcg,
    a: TeamId,
    b: TeamId,
    best_of: BestOf,
    label: String,
) -> SeriesResult {
    let need = best_of.wins_needed();
    let mut a_wins = 0u8;
    let mut b_wins = 0u8;
    let mut games = Vec::with_capacity(usize::from(best_of.games()));

    while a_wins < need && b_wins < need {
        let (a_won, p) = play_game(ctx, rng, a, b);
        if a_won {
            a_wins += 1;
        } else {
            b_wins += 1;
        }
        games.push(GameResult {
            game: a_wins + b_wins,
            p_a: p,
            winner: if a_won { a } else { b },
            score_a_running: a_wins,
            score_b_running: b_wins,
        });
    }

    let winner = if a_wins > b_wins { a } else { b };
    SeriesResult {
        label,
        best_of: best_of.games(),
        a: ctx.team_ref(a),
        b: ctx.team_ref(b),
        games,
        final_score: (a_wins, b_wins),
        winner: ctx.team_ref(winner),
    }
}

pub fn play_bo3(
    ctx: &TournamentContext,
    rng: &mut Lcg,
    a: TeamId,
    b: TeamId,
    label: String,
) -> SeriesResult {
    play_series(ctx, rng, a, b, BestOf::BO3, label)
}

pub fn play_bo5(
    ctx: &TournamentContext,
    rng: &mut Lcg,
    a: TeamId,
    b: TeamId,
    label: String,
) -> SeriesResult {
    play_series(ctx, rng, a, b, BestOf::BO5, label)
}

/// `"<prefix>: <A> vs <B>"`
pub(crate) fn match_label(ctx: &TournamentContext, prefix: &str, a: TeamId, b: TeamId) -> String {
    format!("{prefix}: {} vs {}", ctx.name_of(a), ctx.name_of(b))
}
