//! crates/practice_lab_core/src/testutil.rs
//!
//! Hand-written mock ports shared by the pipeline tests. No I/O; state lives
//! behind std mutexes and counters so tests can assert on call patterns and
//! row counts.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    Attempt, CaseLevel, CaseNeighbor, CaseStudy, NewAttempt, NewCaseStudy,
};
use crate::ports::{
    CaseStoreService, CompletionOptions, CompletionService, EmbeddingService, PortError,
    PortResult,
};

pub fn sample_case(category: &str, level: CaseLevel) -> CaseStudy {
    CaseStudy {
        id: Uuid::new_v4(),
        category: category.to_string(),
        level,
        title: "The Misread Trial".to_string(),
        case_text: "A clinical team observes improved outcomes after a ward reorganization and \
                    attributes the change to a new handoff protocol, overlooking a seasonal \
                    staffing shift that happened the same week."
            .to_string(),
        questions: vec![
            "What alternative explanations should the team consider?".to_string(),
            "Which confounding variables are most plausible?".to_string(),
            "What data would settle the question?".to_string(),
        ],
        created_at: Utc::now(),
    }
}

//=========================================================================================
// Store mock
//=========================================================================================

#[derive(Default)]
pub struct MockStore {
    pub attempted: Mutex<Vec<Uuid>>,
    pub cases: Mutex<Vec<CaseStudy>>,
    pub attempts: Mutex<Vec<Attempt>>,
    /// Each `match_cases` call pops the next neighbor set; when empty, an
    /// empty result is returned.
    pub neighbor_sets: Mutex<VecDeque<Vec<CaseNeighbor>>>,
    pub match_calls: AtomicUsize,
    pub insert_case_calls: AtomicUsize,
    pub insert_attempt_calls: AtomicUsize,
    pub fail_insert_attempt: bool,
}

impl MockStore {
    pub fn with_cases(cases: Vec<CaseStudy>) -> Self {
        Self {
            cases: Mutex::new(cases),
            ..Self::default()
        }
    }

    pub fn push_neighbors(&self, neighbors: Vec<CaseNeighbor>) {
        self.neighbor_sets.lock().unwrap().push_back(neighbors);
    }

    pub fn case_count(&self) -> usize {
        self.cases.lock().unwrap().len()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }
}

#[async_trait]
impl CaseStoreService for MockStore {
    async fn attempted_case_ids(&self, _user_id: Uuid) -> PortResult<Vec<Uuid>> {
        Ok(self.attempted.lock().unwrap().clone())
    }

    async fn find_cases(
        &self,
        category: &str,
        level: CaseLevel,
        exclude: &[Uuid],
    ) -> PortResult<Vec<CaseStudy>> {
        Ok(self
            .cases
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.category == category && c.level == level && !exclude.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn get_case(&self, case_id: Uuid) -> PortResult<CaseStudy> {
        self.cases
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == case_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Case {} not found", case_id)))
    }

    async fn match_cases(
        &self,
        _embedding: &[f32],
        _category: &str,
        _level: CaseLevel,
        _match_count: usize,
    ) -> PortResult<Vec<CaseNeighbor>> {
        self.match_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .neighbor_sets
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    async fn insert_case(&self, case: NewCaseStudy) -> PortResult<CaseStudy> {
        self.insert_case_calls.fetch_add(1, Ordering::SeqCst);
        let persisted = CaseStudy {
            id: Uuid::new_v4(),
            category: case.category,
            level: case.level,
            title: case.title,
            case_text: case.case_text,
            questions: case.questions,
            created_at: Utc::now(),
        };
        self.cases.lock().unwrap().push(persisted.clone());
        Ok(persisted)
    }

    async fn insert_attempt(&self, attempt: NewAttempt) -> PortResult<Attempt> {
        self.insert_attempt_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_insert_attempt {
            return Err(PortError::Unexpected("attempt insert failed".into()));
        }
        let persisted = Attempt {
            id: Uuid::new_v4(),
            user_id: attempt.user_id,
            case_id: attempt.case_id,
            question_index: attempt.question_index,
            question_text: attempt.question_text,
            answer_text: attempt.answer_text,
            score: attempt.score,
            is_correct: attempt.is_correct,
            feedback: attempt.feedback,
            guidance: attempt.guidance,
            created_at: Utc::now(),
        };
        self.attempts.lock().unwrap().push(persisted.clone());
        Ok(persisted)
    }

    async fn ping(&self) -> PortResult<()> {
        Ok(())
    }
}

//=========================================================================================
// Provider mocks
//=========================================================================================

#[derive(Default)]
pub struct MockEmbedder {
    pub calls: AtomicUsize,
    /// Every text passed to `embed`, in call order.
    pub texts: Mutex<Vec<String>>,
}

#[async_trait]
impl EmbeddingService for MockEmbedder {
    async fn embed(&self, text: &str) -> PortResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().push(text.to_string());
        // Deterministic for identical input, like a real embedding function.
        let seed = text.len() as f32;
        Ok(vec![seed, 1.0, 0.0])
    }
}

#[derive(Default)]
pub struct MockModel {
    pub responses: Mutex<VecDeque<String>>,
    pub calls: AtomicUsize,
}

impl MockModel {
    pub fn with_responses(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionService for MockModel {
    async fn complete(&self, _prompt: &str, _opts: &CompletionOptions) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| PortError::Unexpected("mock model ran out of responses".into()))
    }
}
