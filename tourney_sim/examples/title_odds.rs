//! Title Odds Example
//!
//! Demonstrates a single tournament run and a small Monte-Carlo batch.

use tourney_sim::{
    NoProgress, PairingStyle, PlayoffStage, ProbabilityMatrix, SimulationConfig, Team,
    TournamentSimulator,
};

fn main() {
    println!("=== Tournament Simulation Example ===\n");

    // Sixteen teams; lower ids are stronger
    let teams: Vec<Team> = (1..=16)
        .map(|i| Team::new(i, format!("Team {i:02}")).with_seed(i as u32))
        .collect();
    let mut matrix = ProbabilityMatrix::new();
    for a in 1..=16 {
        for b in 1..=16 {
            if a != b {
                matrix
                    .insert(a, b, 0.5 + (b - a) as f64 * 0.025)
                    .expect("probability is finite");
            }
        }
    }
    let mut sim =
        TournamentSimulator::from_teams(teams, matrix, 42).expect("team ids are unique");

    // Example 1: one tournament with fixed 1v16 seeding
    println!("Example 1: One seeded tournament");
    let order = sim
        .context()
        .roster()
        .seed_order_from_seeds()
        .expect("every team has a seed");
    let seeded = SimulationConfig::seeded(order, PairingStyle::OneVsSixteen);
    let run = sim
        .simulate_once(&seeded, &mut NoProgress)
        .expect("sixteen teams");

    for series in &run.swiss.rounds[0].matches {
        println!(
            "  {} -> {} ({}-{})",
            series.label, series.winner.name, series.final_score.0, series.final_score.1
        );
    }
    println!("  Swiss standings: {:?}", run.swiss.rank.order);
    println!("  Playoff seeds:   {:?}", run.playoffs.seeds);
    println!("  {}", run.playoffs.grand_final.label);
    println!("  Champion: {}\n", run.champion.name);

    // Example 2: a batch with random seeding
    println!("Example 2: 500 tournaments with random seeding");
    let config = SimulationConfig::default().with_simulations(500);
    let report = sim
        .monte_carlo(&config, &mut NoProgress, None)
        .expect("valid configuration");
    let stats = &report.statistics;

    for odds in stats.title_odds.iter().take(5) {
        println!(
            "  {:<8} title {:>5.1}%  grand final {:>5.1}%",
            odds.team,
            odds.win_prob * 100.0,
            stats.stage_prob(PlayoffStage::GrandFinal, odds.team_id) * 100.0
        );
    }
}
