//! crates/practice_lab_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! pipeline to be independent of the concrete store and provider clients.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Attempt, CaseLevel, CaseNeighbor, CaseStudy, NewAttempt, NewCaseStudy};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Maps text to a fixed-length normalized vector. External black box; assumed
/// deterministic for identical input.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> PortResult<Vec<f32>>;
}

/// Sampling options for a single completion call.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub stop_sequences: Vec<String>,
}

/// Maps a prompt to a raw text completion. Non-deterministic; callers must
/// treat the output as untrusted until parsed and validated.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str, opts: &CompletionOptions) -> PortResult<String>;
}

/// Persistence for case studies (with embeddings) and attempt history.
#[async_trait]
pub trait CaseStoreService: Send + Sync {
    /// Distinct case ids this user has already attempted.
    async fn attempted_case_ids(&self, user_id: Uuid) -> PortResult<Vec<Uuid>>;

    /// Cases matching category and level whose id is not in `exclude`.
    async fn find_cases(
        &self,
        category: &str,
        level: CaseLevel,
        exclude: &[Uuid],
    ) -> PortResult<Vec<CaseStudy>>;

    /// Loads a single case by id; `PortError::NotFound` when absent.
    async fn get_case(&self, case_id: Uuid) -> PortResult<CaseStudy>;

    /// Top-`match_count` cases nearest to `embedding`, restricted to the given
    /// category and level, ordered by descending similarity.
    async fn match_cases(
        &self,
        embedding: &[f32],
        category: &str,
        level: CaseLevel,
        match_count: usize,
    ) -> PortResult<Vec<CaseNeighbor>>;

    /// Inserts a case study and returns the persisted row including its id.
    async fn insert_case(&self, case: NewCaseStudy) -> PortResult<CaseStudy>;

    /// Inserts an attempt and returns the persisted row including its id.
    async fn insert_attempt(&self, attempt: NewAttempt) -> PortResult<Attempt>;

    /// Cheap connectivity check for liveness probes.
    async fn ping(&self) -> PortResult<()>;
}
