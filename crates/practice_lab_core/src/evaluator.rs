//! crates/practice_lab_core/src/evaluator.rs
//!
//! Grades one free-text answer against exactly one question of one case study,
//! persists the attempt, and computes the caller's progression state.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::{
    Attempt, CaseStudy, Evaluation, Feedback, NewAttempt, Progression,
};
use crate::error::{PipelineError, PipelineResult};
use crate::model_output::parse_evaluation;
use crate::ports::{CaseStoreService, CompletionOptions, CompletionService};

fn grading_options() -> CompletionOptions {
    CompletionOptions {
        temperature: 0.2,
        max_tokens: 600,
        stop_sequences: vec!["<|im_end|>".into(), "</s>".into(), "```".into()],
    }
}

fn build_grading_prompt(
    case: &CaseStudy,
    question_index: usize,
    question_text: &str,
    student_answer: &str,
) -> String {
    format!(
        r#"You are an AI tutor evaluating a student's reasoning for an educational practice app.

CRITICAL RULES:
- Return ONLY valid JSON. No markdown. No extra words.
- Evaluate ONLY the single question given below (ignore other questions).
- If the student is wrong, DO NOT reveal the correct answer directly.
- Do not name specific "final answers" explicitly. Use hints and guidance instead.
- Keep explanation short (1-2 sentences).

Case Title: {title}
Category: {category}
Difficulty Level: {level}

Case:
{case_text}

Current Question ({question_number}):
{question_text}

Student Answer:
{student_answer}

Return JSON schema exactly:
{{
  "score": number,
  "is_correct": boolean,
  "explanation": string,
  "guidance": string[],
  "misconceptions": string[]
}}

Scoring guidance:
- 90-100: correct and well-explained
- 60-89: mostly correct but missing reasoning
- 30-59: partially correct with major gaps
- 0-29: incorrect reasoning

Remember: if wrong, guide without giving away the answer."#,
        title = case.title,
        category = case.category,
        level = case.level,
        case_text = case.case_text,
        question_number = question_index + 1,
        question_text = question_text,
        student_answer = student_answer,
    )
}

/// The full result of one evaluation call.
#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub evaluation: Evaluation,
    pub attempt: Attempt,
    pub next_question_index: usize,
    pub is_complete: bool,
    pub total_questions: usize,
}

pub struct AnswerEvaluator {
    store: Arc<dyn CaseStoreService>,
    model: Arc<dyn CompletionService>,
}

impl AnswerEvaluator {
    pub fn new(store: Arc<dyn CaseStoreService>, model: Arc<dyn CompletionService>) -> Self {
        Self { store, model }
    }

    /// Grades `answer_text` against the question at `question_index` of the
    /// referenced case. Exactly one attempt row is written on success and none
    /// on any failure path.
    pub async fn evaluate(
        &self,
        user_id: Uuid,
        case_id: Uuid,
        question_index: i64,
        answer_text: &str,
        question_text: Option<&str>,
    ) -> PipelineResult<EvaluationOutcome> {
        if user_id.is_nil() {
            return Err(PipelineError::Validation("user_id must not be empty".into()));
        }
        if case_id.is_nil() {
            return Err(PipelineError::Validation("case_id must not be empty".into()));
        }
        let answer = answer_text.trim();
        if answer.is_empty() {
            return Err(PipelineError::Validation(
                "answer_text must not be empty".into(),
            ));
        }

        let case = self.store.get_case(case_id).await?;
        let total_questions = case.questions.len();

        if question_index < 0 || question_index as usize >= total_questions {
            return Err(PipelineError::Validation(format!(
                "question_index out of range (0..{})",
                total_questions.saturating_sub(1)
            )));
        }
        let question_index = question_index as usize;

        // Prefer the caller's question_text only when it matches the stored
        // question exactly; otherwise grade against the stored value. This
        // blocks clients from substituting an arbitrary question while still
        // allowing normal client-side caching.
        let stored_question = &case.questions[question_index];
        let resolved_question = match question_text {
            Some(supplied) if supplied.trim() == stored_question.trim() => {
                supplied.trim().to_string()
            }
            _ => stored_question.clone(),
        };

        let prompt = build_grading_prompt(&case, question_index, &resolved_question, answer);
        let raw = self.model.complete(&prompt, &grading_options()).await?;
        let evaluation = parse_evaluation(&raw)?;

        let attempt = self
            .store
            .insert_attempt(NewAttempt {
                user_id,
                case_id,
                question_index,
                question_text: resolved_question,
                answer_text: answer.to_string(),
                score: evaluation.score,
                is_correct: evaluation.is_correct,
                feedback: Feedback {
                    explanation: evaluation.explanation.clone(),
                    misconceptions: evaluation.misconceptions.clone(),
                },
                guidance: evaluation.guidance.clone(),
            })
            .await?;
        info!(
            %user_id,
            %case_id,
            question_index,
            score = evaluation.score,
            is_correct = evaluation.is_correct,
            "attempt recorded"
        );

        let progression = Progression::after(question_index, evaluation.is_correct, total_questions);
        Ok(EvaluationOutcome {
            evaluation,
            attempt,
            next_question_index: progression.next_question_index,
            is_complete: progression.is_complete,
            total_questions,
        })
    }
}
