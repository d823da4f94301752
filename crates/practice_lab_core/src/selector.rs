//! crates/practice_lab_core/src/selector.rs
//!
//! Serves a case the user has not yet attempted; delegates to the generator
//! when the pool for (category, level) is exhausted.

use std::sync::Arc;

use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{CaseLevel, CaseSource, SelectedCase};
use crate::error::{PipelineError, PipelineResult};
use crate::generator::NoveltyGatedGenerator;
use crate::ports::CaseStoreService;

pub struct UnseenCaseSelector {
    store: Arc<dyn CaseStoreService>,
    generator: Arc<NoveltyGatedGenerator>,
}

impl UnseenCaseSelector {
    pub fn new(store: Arc<dyn CaseStoreService>, generator: Arc<NoveltyGatedGenerator>) -> Self {
        Self { store, generator }
    }

    /// Returns a case for (category, level) that `user_id` has not attempted,
    /// picked uniformly at random. When none remain, a new case is generated.
    ///
    /// Two concurrent requests from the same user may both receive the same
    /// case; that staleness is accepted rather than locking the store.
    pub async fn select_case(
        &self,
        user_id: Uuid,
        category: &str,
        level: CaseLevel,
    ) -> PipelineResult<SelectedCase> {
        let category = category.trim();
        if category.is_empty() {
            return Err(PipelineError::Validation("category must not be empty".into()));
        }
        if user_id.is_nil() {
            return Err(PipelineError::Validation("user_id must not be empty".into()));
        }

        let seen = self.store.attempted_case_ids(user_id).await?;
        let mut unseen = self.store.find_cases(category, level, &seen).await?;

        if !unseen.is_empty() {
            let pick = rand::thread_rng().gen_range(0..unseen.len());
            let case = unseen.swap_remove(pick);
            info!(%user_id, case_id = %case.id, "serving existing unseen case");
            return Ok(SelectedCase {
                source: CaseSource::Existing,
                case,
            });
        }

        info!(%user_id, category, %level, "no unseen cases remain; generating");
        match self.generator.generate_case(category, level).await {
            Ok(generated) => Ok(SelectedCase {
                source: CaseSource::Generated,
                case: generated.case,
            }),
            Err(err) => {
                warn!(category, %level, error = %err, "generation fallback failed");
                Err(PipelineError::NoCaseAvailable(format!(
                    "no unseen case for category '{}' at level {} and generation failed: {}",
                    category, level, err
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{sample_case, MockEmbedder, MockModel, MockStore};

    fn selector(store: Arc<MockStore>, model: Arc<MockModel>) -> UnseenCaseSelector {
        let generator = Arc::new(NoveltyGatedGenerator::new(
            store.clone(),
            Arc::new(MockEmbedder::default()),
            model,
        ));
        UnseenCaseSelector::new(store, generator)
    }

    #[tokio::test]
    async fn serves_existing_case_without_calling_the_model() {
        let case = sample_case("Ethics", CaseLevel::Medium);
        let store = Arc::new(MockStore::with_cases(vec![case.clone()]));
        let model = Arc::new(MockModel::default());

        let selected = selector(store, model.clone())
            .select_case(Uuid::new_v4(), "Ethics", CaseLevel::Medium)
            .await
            .expect("selection succeeds");

        assert_eq!(selected.source, CaseSource::Existing);
        assert_eq!(selected.case.id, case.id);
        assert!(selected.case.questions.len() >= 3 && selected.case.questions.len() <= 5);
        assert_eq!(model.call_count(), 0, "generator must not be invoked");
    }

    #[tokio::test]
    async fn attempted_cases_are_excluded() {
        let seen_case = sample_case("Ethics", CaseLevel::Medium);
        let fresh_case = sample_case("Ethics", CaseLevel::Medium);
        let store = Arc::new(MockStore::with_cases(vec![
            seen_case.clone(),
            fresh_case.clone(),
        ]));
        store.attempted.lock().unwrap().push(seen_case.id);
        let model = Arc::new(MockModel::default());

        let selected = selector(store, model)
            .select_case(Uuid::new_v4(), "Ethics", CaseLevel::Medium)
            .await
            .expect("selection succeeds");

        assert_eq!(selected.case.id, fresh_case.id);
    }

    #[tokio::test]
    async fn empty_pool_delegates_to_generator() {
        let store = Arc::new(MockStore::default());
        let model = Arc::new(MockModel::with_responses(vec![r#"{
            "title": "The Quiet Audit",
            "category": "Ethics",
            "level": 2,
            "case_text": "An auditor discovers that a nonprofit has been reporting volunteer hours as paid staffing in its grant applications for three consecutive years. The discrepancy inflates the program's apparent reach, and the board chair asks the auditor to treat it as a clerical footnote.",
            "questions": [
                "What makes this misreporting material rather than clerical?",
                "Whose interests conflict in the chair's request?",
                "What should the auditor document before responding?"
            ]
        }"#]));

        let selected = selector(store.clone(), model)
            .select_case(Uuid::new_v4(), "Ethics", CaseLevel::Hard)
            .await
            .expect("generation path succeeds");

        assert_eq!(selected.source, CaseSource::Generated);
        assert_eq!(selected.case.category, "Ethics");
        assert_eq!(selected.case.level, CaseLevel::Hard);
        assert_eq!(store.case_count(), 1);
    }

    #[tokio::test]
    async fn generation_failure_becomes_no_case_available() {
        let store = Arc::new(MockStore::default());
        let model = Arc::new(MockModel::with_responses(vec!["junk", "junk", "junk"]));

        let err = selector(store, model)
            .select_case(Uuid::new_v4(), "Ethics", CaseLevel::Easy)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::NoCaseAvailable(_)));
    }

    #[tokio::test]
    async fn nil_user_id_is_rejected() {
        let store = Arc::new(MockStore::default());
        let model = Arc::new(MockModel::default());

        let err = selector(store, model)
            .select_case(Uuid::nil(), "Ethics", CaseLevel::Easy)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[tokio::test]
    async fn blank_category_is_rejected() {
        let store = Arc::new(MockStore::default());
        let model = Arc::new(MockModel::default());

        let err = selector(store, model)
            .select_case(Uuid::new_v4(), "   ", CaseLevel::Easy)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Validation(_)));
    }
}
