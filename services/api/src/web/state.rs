//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use practice_lab_core::evaluator::AnswerEvaluator;
use practice_lab_core::generator::NoveltyGatedGenerator;
use practice_lab_core::ports::CaseStoreService;
use practice_lab_core::selector::UnseenCaseSelector;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers. The pipeline components are stateless request/response services;
/// they are built once and live for the process lifetime.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn CaseStoreService>,
    pub selector: Arc<UnseenCaseSelector>,
    pub generator: Arc<NoveltyGatedGenerator>,
    pub evaluator: Arc<AnswerEvaluator>,
}
