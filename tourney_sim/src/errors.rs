//! Error types for the tournament simulator.

use thiserror::Error;

/// Result type for simulator operations
pub type SimResult<T> = Result<T, SimulationError>;

/// Simulation errors
///
/// Every variant except `Cancelled` aborts the current trial, and a failed
/// trial aborts the whole batch.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// A stage invariant was broken (wrong team count, odd bucket)
    #[error("Structural violation in {stage}: {detail}")]
    StructuralViolation { stage: String, detail: String },

    /// The simulation configuration cannot drive a run
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Roster or probability matrix could not be used
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Batch was cancelled at a trial boundary
    #[error("Simulation cancelled after {completed} completed trials")]
    Cancelled { completed: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimulationError {
    /// Build a structural violation for the given stage
    pub fn structural(stage: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::StructuralViolation {
            stage: stage.into(),
            detail: detail.into(),
        }
    }

    /// Whether this error came from a broken stage invariant
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::StructuralViolation { .. })
    }
}
