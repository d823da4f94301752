pub mod domain;
pub mod error;
pub mod evaluator;
pub mod generator;
pub mod model_output;
pub mod ports;
pub mod selector;

#[cfg(test)]
pub(crate) mod testutil;

pub use domain::{
    Attempt, CaseLevel, CaseNeighbor, CaseSource, CaseStudy, Evaluation, Feedback, GeneratedCase,
    NewAttempt, NewCaseStudy, Progression, SelectedCase,
};
pub use error::{PipelineError, PipelineResult};
pub use evaluator::{AnswerEvaluator, EvaluationOutcome};
pub use generator::NoveltyGatedGenerator;
pub use ports::{
    CaseStoreService, CompletionOptions, CompletionService, EmbeddingService, PortError,
    PortResult,
};
pub use selector::UnseenCaseSelector;
