//! crates/practice_lab_core/src/model_output.rs
//!
//! Parsing and validation of raw completion text. The model may return prose
//! around the JSON payload, so we extract the first-`{`-to-last-`}` span and
//! then re-validate everything against an explicit schema before trusting it.

use serde::Deserialize;

use crate::domain::{CaseLevel, Evaluation};
use crate::error::{PipelineError, PipelineResult};

/// Extracts the first balanced-looking JSON object substring from raw model
/// output (first `{` to last `}`).
pub fn extract_json_object(raw: &str) -> PipelineResult<&str> {
    let start = raw
        .find('{')
        .ok_or_else(|| PipelineError::MalformedModelOutput("no JSON object found".into()))?;
    let end = raw
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| PipelineError::MalformedModelOutput("no JSON object found".into()))?;
    Ok(&raw[start..=end])
}

//=========================================================================================
// Generated case candidates
//=========================================================================================

/// A generated case candidate that passed schema validation but has not yet
/// cleared the novelty gate.
#[derive(Debug, Clone)]
pub struct CandidateCase {
    pub title: String,
    pub level: CaseLevel,
    pub case_text: String,
    pub questions: Vec<String>,
}

impl CandidateCase {
    /// The exact text the candidate's embedding is derived from.
    pub fn embedding_text(&self) -> String {
        format!(
            "{}\n{}\n{}",
            self.title,
            self.case_text,
            self.questions.join("\n")
        )
    }
}

#[derive(Debug, Deserialize)]
struct CaseDraft {
    title: String,
    // The model sometimes returns the level as a string; coerce before
    // range-checking.
    level: serde_json::Value,
    case_text: String,
    questions: Vec<String>,
}

fn coerce_level(value: &serde_json::Value) -> PipelineResult<CaseLevel> {
    let numeric = match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| PipelineError::MalformedModelOutput("level is not numeric".into()))?;

    u8::try_from(numeric)
        .ok()
        .and_then(|n| CaseLevel::try_from(n).ok())
        .ok_or_else(|| {
            PipelineError::MalformedModelOutput(format!("level {} is out of range", numeric))
        })
}

/// Parses and schema-validates a generated case from raw completion text.
pub fn parse_case(raw: &str) -> PipelineResult<CandidateCase> {
    let span = extract_json_object(raw)?;
    let draft: CaseDraft = serde_json::from_str(span)
        .map_err(|e| PipelineError::MalformedModelOutput(format!("invalid JSON: {}", e)))?;

    let level = coerce_level(&draft.level)?;

    let title = draft.title.trim().to_string();
    if title.chars().count() < 5 {
        return Err(PipelineError::MalformedModelOutput(
            "title is too short".into(),
        ));
    }
    let case_text = draft.case_text.trim().to_string();
    if case_text.chars().count() < 80 {
        return Err(PipelineError::MalformedModelOutput(
            "case_text is too short".into(),
        ));
    }
    if draft.questions.len() < 3 || draft.questions.len() > 5 {
        return Err(PipelineError::MalformedModelOutput(format!(
            "expected 3-5 questions, got {}",
            draft.questions.len()
        )));
    }
    let questions: Vec<String> = draft
        .questions
        .iter()
        .map(|q| q.trim().to_string())
        .collect();
    if questions.iter().any(|q| q.chars().count() < 5) {
        return Err(PipelineError::MalformedModelOutput(
            "a question is too short".into(),
        ));
    }

    Ok(CandidateCase {
        title,
        level,
        case_text,
        questions,
    })
}

//=========================================================================================
// Grading verdicts
//=========================================================================================

#[derive(Debug, Deserialize)]
struct EvaluationDraft {
    score: f64,
    is_correct: bool,
    explanation: String,
    #[serde(default)]
    guidance: Vec<String>,
    #[serde(default)]
    misconceptions: Vec<String>,
}

/// Parses and schema-validates a grading verdict from raw completion text.
pub fn parse_evaluation(raw: &str) -> PipelineResult<Evaluation> {
    let span = extract_json_object(raw)?;
    let draft: EvaluationDraft = serde_json::from_str(span)
        .map_err(|e| PipelineError::MalformedModelOutput(format!("invalid JSON: {}", e)))?;

    if !(0.0..=100.0).contains(&draft.score) {
        return Err(PipelineError::MalformedModelOutput(format!(
            "score {} is out of range",
            draft.score
        )));
    }
    if draft.explanation.trim().is_empty() {
        return Err(PipelineError::MalformedModelOutput(
            "explanation is empty".into(),
        ));
    }

    Ok(Evaluation {
        score: draft.score.round() as u8,
        is_correct: draft.is_correct,
        explanation: draft.explanation.trim().to_string(),
        guidance: draft.guidance,
        misconceptions: draft.misconceptions,
    })
}
