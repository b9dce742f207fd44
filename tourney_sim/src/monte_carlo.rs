//! Monte-Carlo batches and their aggregated statistics.
//!
//! A sequential batch replays tournaments on the simulator's single evolving
//! stream. A parallel batch gives every trial its own stream derived from the
//! base seed and the trial index, and merges per-worker counters by summation,
//! so its statistics do not depend on how rayon schedules the work.

use crate::{
    config::SimulationConfig,
    elimination::PLAY_IN_RANKS,
    errors::{SimResult, SimulationError},
    input::{Roster, TeamId},
    models::{Record, SeriesResult, TournamentRun},
    simulator::{ProgressObserver, TournamentSimulator},
};
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Instant,
};

/// Playoff milestones counted per team
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PlayoffStage {
    #[serde(rename = "UB_QF")]
    UpperQuarterfinal,
    #[serde(rename = "UB_SF")]
    UpperSemifinal,
    #[serde(rename = "UB_Final")]
    UpperFinal,
    #[serde(rename = "LB_R1")]
    LowerRound1,
    #[serde(rename = "LB_R2")]
    LowerRound2,
    #[serde(rename = "LB_QF")]
    LowerQuarterfinal,
    #[serde(rename = "LB_Final")]
    LowerFinal,
    #[serde(rename = "GF")]
    GrandFinal,
    Champion,
}

impl PlayoffStage {
    pub const ALL: [PlayoffStage; 9] = [
        PlayoffStage::UpperQuarterfinal,
        PlayoffStage::UpperSemifinal,
        PlayoffStage::UpperFinal,
        PlayoffStage::LowerRound1,
        PlayoffStage::LowerRound2,
        PlayoffStage::LowerQuarterfinal,
        PlayoffStage::LowerFinal,
        PlayoffStage::GrandFinal,
        PlayoffStage::Champion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlayoffStage::UpperQuarterfinal => "UB_QF",
            PlayoffStage::UpperSemifinal => "UB_SF",
            PlayoffStage::UpperFinal => "UB_Final",
            PlayoffStage::LowerRound1 => "LB_R1",
            PlayoffStage::LowerRound2 => "LB_R2",
            PlayoffStage::LowerQuarterfinal => "LB_QF",
            PlayoffStage::LowerFinal => "LB_Final",
            PlayoffStage::GrandFinal => "GF",
            PlayoffStage::Champion => "Champion",
        }
    }

    /// Teams reaching this stage in one bracket
    pub fn entrants(&self) -> usize {
        match self {
            PlayoffStage::UpperQuarterfinal => 8,
            PlayoffStage::UpperSemifinal | PlayoffStage::LowerRound1 | PlayoffStage::LowerRound2 => 4,
            PlayoffStage::UpperFinal
            | PlayoffStage::LowerQuarterfinal
            | PlayoffStage::LowerFinal
            | PlayoffStage::GrandFinal => 2,
            PlayoffStage::Champion => 1,
        }
    }
}

impl fmt::Display for PlayoffStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Share of runs in which a team hit some outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamProbability {
    pub team_id: TeamId,
    pub team: String,
    pub prob: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleOdds {
    pub team_id: TeamId,
    pub team: String,
    pub win_prob: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketProbabilities {
    pub record: Record,
    pub teams: Vec<TeamProbability>,
}

/// Pre-round bucket membership for one Swiss round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundProbabilities {
    pub round: u8,
    pub buckets: Vec<BucketProbabilities>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageProbabilities {
    pub stage: PlayoffStage,
    pub teams: Vec<TeamProbability>,
}

/// Normalized batch statistics; every list is sorted by probability, highest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStatistics {
    pub num_simulations: usize,
    /// Every roster team, including those that never won
    pub title_odds: Vec<TitleOdds>,
    pub swiss_probs: Vec<RoundProbabilities>,
    pub swiss_final_probs: Vec<BucketProbabilities>,
    pub elim_participation: Vec<TeamProbability>,
    pub elim_advancers: Vec<TeamProbability>,
    pub stage_probs: Vec<StageProbabilities>,
}

impl SimulationStatistics {
    pub fn title_odds_of(&self, team_id: TeamId) -> Option<f64> {
        self.title_odds
            .iter()
            .find(|o| o.team_id == team_id)
            .map(|o| o.win_prob)
    }

    pub fn stage(&self, stage: PlayoffStage) -> &[TeamProbability] {
        self.stage_probs
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| s.teams.as_slice())
            .unwrap_or_default()
    }

    /// Probability that `team_id` reached `stage` (0.0 if it never did)
    pub fn stage_prob(&self, stage: PlayoffStage, team_id: TeamId) -> f64 {
        self.stage(stage)
            .iter()
            .find(|t| t.team_id == team_id)
            .map_or(0.0, |t| t.prob)
    }
}

type Counts = BTreeMap<TeamId, u64>;

fn bump(counts: &mut Counts, team_id: TeamId) {
    *counts.entry(team_id).or_default() += 1;
}

fn merge_counts(into: &mut Counts, from: Counts) {
    for (team_id, n) in from {
        *into.entry(team_id).or_default() += n;
    }
}

/// Raw occurrence counts over a set of runs
///
/// Merging is plain summation, so counters built on separate workers can be
/// combined in any order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatCounters {
    runs: usize,
    swiss_buckets: BTreeMap<(u8, Record), Counts>,
    swiss_final: BTreeMap<Record, Counts>,
    elim_participation: Counts,
    elim_advancers: Counts,
    stages: BTreeMap<PlayoffStage, Counts>,
}

impl StatCounters {
    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn record_run(&mut self, run: &TournamentRun) {
        self.runs += 1;

        for round in &run.swiss.rounds {
            for bucket in &round.buckets {
                let counts = self
                    .swiss_buckets
                    .entry((round.round, bucket.record))
                    .or_default();
                for &t in &bucket.team_ids {
                    bump(counts, t);
                }
            }
        }
        for tr in &run.swiss.records_final {
            bump(self.swiss_final.entry(tr.record()).or_default(), tr.team_id);
        }

        for &t in run.swiss.rank.order.get(PLAY_IN_RANKS).unwrap_or_default() {
            bump(&mut self.elim_participation, t);
        }
        for &t in &run.elimination_round.winners {
            bump(&mut self.elim_advancers, t);
        }

        let po = &run.playoffs;
        self.count_teams(PlayoffStage::UpperQuarterfinal, po.seeds.iter().copied());
        self.count_series(PlayoffStage::UpperSemifinal, &po.upper.semifinals);
        self.count_series(PlayoffStage::UpperFinal, std::slice::from_ref(&po.upper.final_match));
        self.count_series(PlayoffStage::LowerRound1, &po.lower.round1);
        self.count_series(PlayoffStage::LowerRound2, &po.lower.round2);
        self.count_series(PlayoffStage::LowerQuarterfinal, std::slice::from_ref(&po.lower.quarterfinal));
        self.count_series(PlayoffStage::LowerFinal, std::slice::from_ref(&po.lower.final_match));
        self.count_series(PlayoffStage::GrandFinal, std::slice::from_ref(&po.grand_final));
        self.count_teams(PlayoffStage::Champion, [run.champion_id()]);
    }

    fn count_teams(&mut self, stage: PlayoffStage, teams: impl IntoIterator<Item = TeamId>) {
        let counts = self.stages.entry(stage).or_default();
        for t in teams {
            bump(counts, t);
        }
    }

    fn count_series(&mut self, stage: PlayoffStage, series: &[SeriesResult]) {
        self.count_teams(stage, series.iter().flat_map(SeriesResult::participants));
    }

    pub fn merge(&mut self, other: StatCounters) {
        self.runs += other.runs;
        for (key, counts) in other.swiss_buckets {
            merge_counts(self.swiss_buckets.entry(key).or_default(), counts);
        }
        for (record, counts) in other.swiss_final {
            merge_counts(self.swiss_final.entry(record).or_default(), counts);
        }
        merge_counts(&mut self.elim_participation, other.elim_participation);
        merge_counts(&mut self.elim_advancers, other.elim_advancers);
        for (stage, counts) in other.stages {
            merge_counts(self.stages.entry(stage).or_default(), counts);
        }
    }

    /// Divide every count by the number of recorded runs
    pub fn finalize(&self, roster: &Roster) -> SimulationStatistics {
        let n = self.runs.max(1) as f64;
        let probs = |counts: &Counts| -> Vec<TeamProbability> {
            let mut list: Vec<TeamProbability> = counts
                .iter()
                .map(|(&team_id, &c)| TeamProbability {
                    team_id,
                    team: roster.name_of(team_id),
                    prob: c as f64 / n,
                })
                .collect();
            list.sort_by(|a, b| b.prob.total_cmp(&a.prob));
            list
        };

        let champions = self.stages.get(&PlayoffStage::Champion);
        let mut title_odds: Vec<TitleOdds> = roster
            .teams()
            .iter()
            .map(|t| TitleOdds {
                team_id: t.id,
                team: t.name.clone(),
                win_prob: champions.and_then(|c| c.get(&t.id)).copied().unwrap_or(0) as f64 / n,
            })
            .collect();
        title_odds.sort_by(|a, b| b.win_prob.total_cmp(&a.win_prob));

        let mut swiss_probs: Vec<RoundProbabilities> = Vec::new();
        for (&(round, record), counts) in &self.swiss_buckets {
            let bucket = BucketProbabilities {
                record,
                teams: probs(counts),
            };
            match swiss_probs.last_mut() {
                Some(r) if r.round == round => r.buckets.push(bucket),
                _ => swiss_probs.push(RoundProbabilities {
                    round,
                    buckets: vec![bucket],
                }),
            }
        }

        SimulationStatistics {
            num_simulations: self.runs,
            title_odds,
            swiss_probs,
            swiss_final_probs: self
                .swiss_final
                .iter()
                .map(|(&record, counts)| BucketProbabilities {
                    record,
                    teams: probs(counts),
                })
                .collect(),
            elim_participation: probs(&self.elim_participation),
            elim_advancers: probs(&self.elim_advancers),
            stage_probs: self
                .stages
                .iter()
                .map(|(&stage, counts)| StageProbabilities {
                    stage,
                    teams: probs(counts),
                })
                .collect(),
        }
    }
}

/// Output of a completed batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloReport {
    pub statistics: SimulationStatistics,
    /// Run log of trial 0
    pub first_run: Option<TournamentRun>,
    /// Every run log, when `retain_runs` is set
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runs: Vec<TournamentRun>,
    pub runs_completed: usize,
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|c| c.load(Ordering::Relaxed))
}

impl TournamentSimulator {
    /// Run `config.num_simulations` tournaments on the shared stream
    ///
    /// Each run continues the stream where the previous one stopped. The
    /// cancel flag is checked between runs only.
    pub fn monte_carlo(
        &mut self,
        config: &SimulationConfig,
        progress: &mut dyn ProgressObserver,
        cancel: Option<&AtomicBool>,
    ) -> SimResult<MonteCarloReport> {
        config.validate_for(self.context().roster())?;
        let n = config.num_simulations;
        info!("Running {n} tournaments sequentially (seed {})", self.seed());
        let start = Instant::now();

        let mut counters = StatCounters::default();
        let mut first_run = None;
        let mut runs = Vec::new();
        for i in 0..n {
            if is_cancelled(cancel) {
                info!("Batch cancelled after {i} of {n} tournaments");
                return Err(SimulationError::Cancelled { completed: i });
            }
            let current = i + 1;
            progress.on_progress(current, &format!("Tournament {current}/{n}"));
            let mut relay = |_: usize, stage: &str| {
                progress.on_progress(current, &format!("Tournament {current}/{n} - {stage}"));
            };
            let run = self.simulate_once(config, &mut relay)?;
            counters.record_run(&run);
            if i == 0 {
                first_run = Some(run.clone());
            }
            if config.retain_runs {
                runs.push(run);
            }
        }

        info!("Completed {n} tournaments in {:.2?}", start.elapsed());
        Ok(MonteCarloReport {
            statistics: counters.finalize(self.context().roster()),
            first_run,
            runs,
            runs_completed: n,
        })
    }

    /// Run `config.num_simulations` tournaments on the rayon pool
    ///
    /// Trial `i` uses its own stream, so the result is the same for any
    /// thread count and matches [`simulate_single_run`](Self::simulate_single_run)
    /// trial by trial. The shared stream is not touched.
    pub fn monte_carlo_parallel(
        &self,
        config: &SimulationConfig,
        cancel: Option<&AtomicBool>,
    ) -> SimResult<MonteCarloReport> {
        config.validate_for(self.context().roster())?;
        let n = config.num_simulations;
        info!(
            "Running {n} tournaments on {} threads (base seed {})",
            rayon::current_num_threads(),
            self.seed()
        );
        let start = Instant::now();

        let completed = AtomicUsize::new(0);
        let trial = |i: usize| -> SimResult<TournamentRun> {
            if is_cancelled(cancel) {
                return Err(SimulationError::Cancelled {
                    completed: completed.load(Ordering::Relaxed),
                });
            }
            let run = self.simulate_single_run(config, i)?;
            completed.fetch_add(1, Ordering::Relaxed);
            Ok(run)
        };

        let (counters, runs) = if config.retain_runs {
            let runs: Vec<TournamentRun> = (0..n)
                .into_par_iter()
                .map(&trial)
                .collect::<SimResult<_>>()?;
            let mut counters = StatCounters::default();
            for run in &runs {
                counters.record_run(run);
            }
            (counters, runs)
        } else {
            let counters = (0..n)
                .into_par_iter()
                .try_fold(
                    StatCounters::default,
                    |mut acc, i| -> SimResult<StatCounters> {
                        acc.record_run(&trial(i)?);
                        Ok(acc)
                    },
                )
                .try_reduce(StatCounters::default, |mut a, b| {
                    a.merge(b);
                    Ok(a)
                })?;
            (counters, Vec::new())
        };
        debug!("Merged counters for {} runs", counters.runs());

        let first_run = match runs.first() {
            Some(run) => Some(run.clone()),
            None => Some(self.simulate_single_run(config, 0)?),
        };

        info!("Completed {n} tournaments in {:.2?}", start.elapsed());
        Ok(MonteCarloReport {
            statistics: counters.finalize(self.context().roster()),
            first_run,
            runs,
            runs_completed: n,
        })
    }

    /// Sequential or parallel batch, per `config.parallel`
    pub fn run_batch(
        &mut self,
        config: &SimulationConfig,
        progress: &mut dyn ProgressObserver,
        cancel: Option<&AtomicBool>,
    ) -> SimResult<MonteCarloReport> {
        if config.parallel {
            let report = self.monte_carlo_parallel(config, cancel)?;
            progress.on_progress(report.runs_completed, "Complete");
            Ok(report)
        } else {
            self.monte_carlo(config, progress, cancel)
        }
    }
}
