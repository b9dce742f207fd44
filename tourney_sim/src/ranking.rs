//! Final Swiss standings.
//!
//! Teams are ordered by wins (desc), losses (asc) and Buchholz score (desc).
//! Teams still level on all three are ordered by one random draw each.

use crate::{
    input::TeamId,
    models::{BuchholzScore, RankedOrder},
    rng::Lcg,
    swiss::SwissState,
};
use std::cmp::Ordering;

/// Sum of the current win counts of every opponent faced
pub fn buchholz(state: &SwissState, team_id: TeamId) -> u32 {
    state
        .opponents(team_id)
        .iter()
        .map(|&o| u32::from(state.record(o).wins))
        .sum()
}

#[derive(Debug, Clone, Copy)]
struct Standing {
    team_id: TeamId,
    wins: u8,
    losses: u8,
    buchholz: u32,
}

impl Standing {
    fn cmp_keys(&self, other: &Self) -> Ordering {
        other
            .wins
            .cmp(&self.wins)
            .then_with(|| self.losses.cmp(&other.losses))
            .then_with(|| other.buchholz.cmp(&self.buchholz))
    }
}

/// Rank every Swiss team, best first
///
/// The comparator is pure. After a stable sort on the deterministic keys,
/// each run of fully tied teams draws one value per member, in the sorted
/// order, and is reordered by those draws. Teams without a tie draw nothing.
pub fn rank_teams(state: &SwissState, rng: &mut Lcg) -> RankedOrder {
    let mut standings: Vec<Standing> = state
        .team_ids()
        .iter()
        .map(|&t| {
            let r = state.record(t);
            Standing {
                team_id: t,
                wins: r.wins,
                losses: r.losses,
                buchholz: buchholz(state, t),
            }
        })
        .collect();
    standings.sort_by(Standing::cmp_keys);

    let mut start = 0;
    while start < standings.len() {
        let mut end = start + 1;
        while end < standings.len()
            && standings[start].cmp_keys(&standings[end]) == Ordering::Equal
        {
            end += 1;
        }
        if end - start > 1 {
            let mut drawn: Vec<(f64, Standing)> = standings[start..end]
                .iter()
                .map(|&s| (rng.next_f64(), s))
                .collect();
            drawn.sort_by(|x, y| x.0.total_cmp(&y.0));
            for (slot, (_, s)) in standings[start..end].iter_mut().zip(drawn) {
                *slot = s;
            }
        }
        start = end;
    }

    RankedOrder {
        order: standings.iter().map(|s| s.team_id).collect(),
        buchholz: standings
            .iter()
            .map(|s| BuchholzScore {
                team_id: s.team_id,
                score: s.buchholz,
            })
            .collect(),
    }
}
