//! crates/practice_lab_core/src/generator.rs
//!
//! The novelty-gated case generator: retrieval-augmented prompting with a
//! runtime deduplication check. Generative models can regress toward memorized
//! content, so every candidate is re-embedded and compared against its nearest
//! stored neighbors before it is allowed to persist.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{CaseLevel, CaseNeighbor, GeneratedCase, NewCaseStudy};
use crate::error::{PipelineError, PipelineResult};
use crate::model_output::{parse_case, CandidateCase};
use crate::ports::{CaseStoreService, CompletionOptions, CompletionService, EmbeddingService};

/// Total generation attempts before giving up. A rejected near-duplicate and a
/// malformed completion each consume one attempt.
pub const MAX_TRIES: u32 = 3;

/// Candidates whose best neighbor similarity reaches this value are discarded
/// as near-duplicates.
pub const NOVELTY_THRESHOLD: f32 = 0.88;

/// Neighbors retrieved for RAG context and for the duplicate check.
pub const MATCH_COUNT: usize = 10;

fn generation_options() -> CompletionOptions {
    CompletionOptions {
        temperature: 0.3,
        max_tokens: 650,
        stop_sequences: vec!["<|im_end|>".into(), "</s>".into(), "```".into()],
    }
}

//=========================================================================================
// Prompt construction
//=========================================================================================

fn summarize_neighbors(neighbors: &[CaseNeighbor]) -> String {
    neighbors
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let body: String = c.case_text.chars().take(220).collect();
            let questions = c
                .questions
                .iter()
                .take(3)
                .cloned()
                .collect::<Vec<_>>()
                .join(" | ");
            format!(
                "# Existing case {}\nTitle: {}\nSummary: {}...\nQuestions: {}\n",
                i + 1,
                c.title,
                body,
                questions
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_generation_prompt(category: &str, level: CaseLevel, neighbors: &[CaseNeighbor]) -> String {
    format!(
        r#"You are generating educational case studies for a university learning platform.

Goal:
Create ONE NEW case study that is clearly different from the existing cases below.

Constraints:
- Must be in category: "{category}"
- Difficulty level: {level} (0=easy, 1=medium, 2=hard)
- Must be fictional and student-friendly
- Must test reasoning, not memorization
- Must NOT be a near-duplicate of the existing cases (different setting, different surface story, different distractors)

Existing similar cases (DO NOT copy these):
{neighbors}

Return ONLY valid JSON. No markdown. No extra text.

JSON schema:
{{
  "title": string,
  "category": "{category}",
  "level": {level},
  "case_text": string,
  "questions": string[]
}}

Rules:
- case_text: 140-220 words, 1-2 short paragraphs
- questions: exactly 3
- do NOT include answers"#,
        category = category,
        level = level,
        neighbors = summarize_neighbors(neighbors),
    )
}

//=========================================================================================
// The generator
//=========================================================================================

pub struct NoveltyGatedGenerator {
    store: Arc<dyn CaseStoreService>,
    embedder: Arc<dyn EmbeddingService>,
    model: Arc<dyn CompletionService>,
    novelty_threshold: f32,
    match_count: usize,
}

impl NoveltyGatedGenerator {
    pub fn new(
        store: Arc<dyn CaseStoreService>,
        embedder: Arc<dyn EmbeddingService>,
        model: Arc<dyn CompletionService>,
    ) -> Self {
        Self {
            store,
            embedder,
            model,
            novelty_threshold: NOVELTY_THRESHOLD,
            match_count: MATCH_COUNT,
        }
    }

    /// Overrides the novelty threshold and neighbor count, e.g. from config.
    pub fn with_tuning(mut self, novelty_threshold: f32, match_count: usize) -> Self {
        self.novelty_threshold = novelty_threshold;
        self.match_count = match_count;
        self
    }

    /// Generates, novelty-checks, and persists one new case study for the
    /// given category and level.
    ///
    /// At most [`MAX_TRIES`] attempts are made. Nothing is persisted unless a
    /// candidate clears the novelty gate.
    pub async fn generate_case(
        &self,
        category: &str,
        level: CaseLevel,
    ) -> PipelineResult<GeneratedCase> {
        let category = category.trim();
        if category.is_empty() {
            return Err(PipelineError::Validation("category must not be empty".into()));
        }

        // Retrieve RAG neighbors once, from an intent-description embedding.
        // The numeric level keeps the phrasing identical across calls for the
        // same (category, level), so retrieval stays consistent over time.
        let intent = format!(
            "Generate a {} difficulty educational case study in {}.",
            level, category
        );
        let query_embedding = self.embedder.embed(&intent).await?;
        let neighbors = self
            .store
            .match_cases(&query_embedding, category, level, self.match_count)
            .await?;
        info!(
            category,
            %level,
            neighbor_count = neighbors.len(),
            "starting novelty-gated generation"
        );

        let prompt = build_generation_prompt(category, level, &neighbors);
        let opts = generation_options();
        let mut last_parse_error: Option<PipelineError> = None;

        for attempt in 1..=MAX_TRIES {
            let raw = self.model.complete(&prompt, &opts).await?;

            // A parse or schema failure consumes this attempt, keeping the
            // loop bounded.
            let candidate = match parse_case(&raw) {
                Ok(candidate) => candidate,
                Err(err) => {
                    warn!(attempt, error = %err, "discarding malformed candidate");
                    last_parse_error = Some(err);
                    continue;
                }
            };

            let candidate_embedding = self.embedder.embed(&candidate.embedding_text()).await?;
            let close = self
                .store
                .match_cases(&candidate_embedding, category, level, self.match_count)
                .await?;
            let best_similarity = close.first().map(|n| n.similarity).unwrap_or(0.0);

            if best_similarity >= self.novelty_threshold {
                warn!(
                    attempt,
                    best_similarity, "candidate rejected as near-duplicate"
                );
                last_parse_error = None;
                continue;
            }

            let persisted = self
                .store
                .insert_case(self.to_new_case(category, level, candidate, candidate_embedding))
                .await?;
            info!(case_id = %persisted.id, attempt, best_similarity, "persisted generated case");
            return Ok(GeneratedCase {
                case: persisted,
                best_similarity,
            });
        }

        // Budget exhausted: report the last failure kind.
        match last_parse_error {
            Some(err) => Err(err),
            None => Err(PipelineError::NoveltyExhausted {
                attempts: MAX_TRIES,
            }),
        }
    }

    fn to_new_case(
        &self,
        category: &str,
        level: CaseLevel,
        candidate: CandidateCase,
        embedding: Vec<f32>,
    ) -> NewCaseStudy {
        // The requested category and level are authoritative; the model's own
        // values were only schema-checked.
        NewCaseStudy {
            category: category.to_string(),
            level,
            title: candidate.title,
            case_text: candidate.case_text,
            questions: candidate.questions,
            embedding,
        }
    }
}
