//! Full-tournament orchestration: Swiss, ranking, play-in, playoffs.

use crate::{
    config::SimulationConfig,
    elimination::run_elimination_round,
    errors::SimResult,
    input::{ProbabilityMatrix, Roster, Team, TeamId},
    models::{SwissLog, TeamRef, TournamentRun},
    playoffs::run_playoffs,
    ranking::rank_teams,
    rng::{Lcg, derive_trial_seed},
    swiss::run_swiss_stage,
};
use log::{debug, info};

/// Receives `(current, stage label)` at named checkpoints
///
/// Purely observational: nothing it does can change a simulation result.
pub trait ProgressObserver {
    fn on_progress(&mut self, current: usize, stage: &str);
}

impl<F: FnMut(usize, &str)> ProgressObserver for F {
    fn on_progress(&mut self, current: usize, stage: &str) {
        self(current, stage)
    }
}

/// Observer that ignores every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&mut self, _current: usize, _stage: &str) {}
}

/// Read-only inputs shared by every run
///
/// Safe to share across any number of concurrent trials.
#[derive(Debug, Clone)]
pub struct TournamentContext {
    roster: Roster,
    matrix: ProbabilityMatrix,
}

impl TournamentContext {
    pub fn new(roster: Roster, matrix: ProbabilityMatrix) -> Self {
        Self { roster, matrix }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn matrix(&self) -> &ProbabilityMatrix {
        &self.matrix
    }

    pub fn name_of(&self, id: TeamId) -> String {
        self.roster.name_of(id)
    }

    pub fn team_ref(&self, id: TeamId) -> TeamRef {
        TeamRef {
            id,
            name: self.name_of(id),
        }
    }
}

/// Simulate one tournament on an explicit random stream
pub fn simulate_tournament(
    ctx: &TournamentContext,
    rng: &mut Lcg,
    config: &SimulationConfig,
    progress: &mut dyn ProgressObserver,
) -> SimResult<TournamentRun> {
    let swiss = run_swiss_stage(ctx, rng, config, progress)?;

    progress.on_progress(0, "Swiss Stage - Ranking");
    let rank = rank_teams(&swiss.state, rng);
    debug!("Swiss standings: {:?}", rank.order);

    progress.on_progress(0, "Elimination Round");
    let elimination = run_elimination_round(ctx, rng, &rank.order)?;

    let playoffs = run_playoffs(ctx, rng, &rank.order, &elimination.winners, progress)?;
    let champion = ctx.team_ref(playoffs.champion);
    if config.verbose {
        info!("Champion: {} ({})", champion.name, champion.id);
    }
    progress.on_progress(1, "Complete");

    Ok(TournamentRun {
        teams: ctx
            .roster()
            .teams()
            .iter()
            .map(|t| ctx.team_ref(t.id))
            .collect(),
        swiss: SwissLog {
            records_final: swiss.state.snapshot(),
            rounds: swiss.rounds,
            rank,
            config: swiss.settings,
        },
        elimination_round: elimination,
        playoffs: playoffs.log,
        champion,
    })
}

/// Tournament simulator owning one evolving random stream
///
/// Every call to [`simulate_once`](Self::simulate_once) continues the stream
/// where the previous call stopped, so a fresh simulator with the same seed
/// replays the same sequence of tournaments.
#[derive(Debug, Clone)]
pub struct TournamentSimulator {
    ctx: TournamentContext,
    seed: u32,
    rng: Lcg,
}

impl TournamentSimulator {
    pub fn new(roster: Roster, matrix: ProbabilityMatrix, seed: u32) -> Self {
        Self {
            ctx: TournamentContext::new(roster, matrix),
            seed,
            rng: Lcg::new(seed),
        }
    }

    /// Build from a plain team list
    pub fn from_teams(teams: Vec<Team>, matrix: ProbabilityMatrix, seed: u32) -> SimResult<Self> {
        Ok(Self::new(Roster::new(teams)?, matrix, seed))
    }

    pub fn context(&self) -> &TournamentContext {
        &self.ctx
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// The shared stream as it stands now
    pub fn rng(&self) -> &Lcg {
        &self.rng
    }

    /// Simulate one tournament on the shared stream
    pub fn simulate_once(
        &mut self,
        config: &SimulationConfig,
        progress: &mut dyn ProgressObserver,
    ) -> SimResult<TournamentRun> {
        simulate_tournament(&self.ctx, &mut self.rng, config, progress)
    }

    /// Simulate trial `trial_index` of a parallel batch on its own stream
    ///
    /// Leaves the shared stream untouched and returns exactly the run the
    /// parallel batch produces for that index.
    pub fn simulate_single_run(
        &self,
        config: &SimulationConfig,
        trial_index: usize,
    ) -> SimResult<TournamentRun> {
        let mut rng = Lcg::new(derive_trial_seed(self.seed, trial_index));
        simulate_tournament(&self.ctx, &mut rng, config, &mut NoProgress)
    }
}
