//! crates/practice_lab_core/src/error.rs
//!
//! The failure taxonomy for the case pipeline. Every component surfaces
//! failures to its immediate caller; the only internal retry anywhere is the
//! generator's novelty loop.

use crate::ports::PortError;

/// The primary error type for pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Malformed or missing caller input. Never retried.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// A referenced case (or other caller-named state) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The completion text was not JSON or failed schema validation.
    #[error("Model output could not be used: {0}")]
    MalformedModelOutput(String),

    /// The generator could not produce a sufficiently original case within
    /// its retry budget. No partial state is persisted when this is raised.
    #[error("Could not generate an original case after {attempts} attempts")]
    NoveltyExhausted { attempts: u32 },

    /// No case exists for the request and generation also failed.
    #[error("No case available: {0}")]
    NoCaseAvailable(String),

    /// A store or provider call itself failed (network, auth, etc.).
    #[error("Upstream failure: {0}")]
    Upstream(String),
}

impl From<PortError> for PipelineError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(msg) => PipelineError::NotFound(msg),
            PortError::Unexpected(msg) => PipelineError::Upstream(msg),
        }
    }
}

/// A convenience type alias for `Result<T, PipelineError>`.
pub type PipelineResult<T> = Result<T, PipelineError>;
