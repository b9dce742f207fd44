//! Logging setup and progress reporting for the driver.

use log::{LevelFilter, debug, info, warn};
use std::time::Duration;
use tourney_sim::ProgressObserver;

/// Batches slower than this are reported at warn level
const SLOW_BATCH: Duration = Duration::from_secs(60);

/// Initialize `env_logger`
///
/// `RUST_LOG` decides the level unless `verbose` forces debug output.
pub fn init(verbose: bool) {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    );
    builder.format_target(false);
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

/// Log how long a simulation phase took
pub fn log_timing(operation: &str, elapsed: Duration, runs: usize) {
    let per_run = elapsed.checked_div(runs.max(1) as u32).unwrap_or_default();
    if elapsed > SLOW_BATCH {
        warn!("SLOW: {operation} took {elapsed:.2?} ({per_run:.2?} per run)");
    } else {
        info!("{operation} took {elapsed:.2?} ({per_run:.2?} per run)");
    }
}

/// Progress observer that logs stage labels and coarse batch progress
pub struct ProgressLogger {
    total: usize,
    step: usize,
    last_logged: usize,
}

impl ProgressLogger {
    /// Log roughly every tenth of `total` runs
    pub fn new(total: usize) -> Self {
        Self {
            total,
            step: (total / 10).max(1),
            last_logged: 0,
        }
    }
}

impl ProgressObserver for ProgressLogger {
    fn on_progress(&mut self, current: usize, stage: &str) {
        debug!("{stage}");
        if current > self.last_logged
            && (current >= self.last_logged + self.step || current == self.total)
            && stage.ends_with("Complete")
        {
            info!("Progress: {current}/{} tournaments", self.total);
            self.last_logged = current;
        }
    }
}
