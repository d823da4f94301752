//! crates/practice_lab_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or HTTP framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Difficulty of a case study. Serialized on the wire and in storage as the
/// integers 0 (easy), 1 (medium), 2 (hard).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CaseLevel {
    Easy,
    Medium,
    Hard,
}

impl CaseLevel {
    /// Human-readable name, used in prompts.
    pub fn describe(self) -> &'static str {
        match self {
            CaseLevel::Easy => "easy",
            CaseLevel::Medium => "medium",
            CaseLevel::Hard => "hard",
        }
    }
}

impl From<CaseLevel> for u8 {
    fn from(level: CaseLevel) -> u8 {
        match level {
            CaseLevel::Easy => 0,
            CaseLevel::Medium => 1,
            CaseLevel::Hard => 2,
        }
    }
}

impl TryFrom<u8> for CaseLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CaseLevel::Easy),
            1 => Ok(CaseLevel::Medium),
            2 => Ok(CaseLevel::Hard),
            other => Err(format!("level must be 0, 1, or 2 (got {})", other)),
        }
    }
}

impl std::fmt::Display for CaseLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// A persisted case study as returned to callers. The stored row also carries
/// the embedding derived from title + case_text + questions; that vector stays
/// server-side and is never exposed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseStudy {
    pub id: Uuid,
    pub category: String,
    pub level: CaseLevel,
    pub title: String,
    pub case_text: String,
    pub questions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new case study. The embedding must be computed from
/// exactly the text fields carried here; it is never updated afterwards.
#[derive(Debug, Clone)]
pub struct NewCaseStudy {
    pub category: String,
    pub level: CaseLevel,
    pub title: String,
    pub case_text: String,
    pub questions: Vec<String>,
    pub embedding: Vec<f32>,
}

/// A similarity-search hit: case summary fields plus a normalized score
/// (higher = more similar to the query vector).
#[derive(Debug, Clone)]
pub struct CaseNeighbor {
    pub id: Uuid,
    pub title: String,
    pub case_text: String,
    pub questions: Vec<String>,
    pub similarity: f32,
}

/// Where a selected case came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseSource {
    Existing,
    Generated,
}

/// The outcome of unseen-case selection.
#[derive(Debug, Clone)]
pub struct SelectedCase {
    pub source: CaseSource,
    pub case: CaseStudy,
}

/// A freshly generated case together with its best similarity against the
/// neighbors it was checked against (0.0 when no neighbors existed).
#[derive(Debug, Clone)]
pub struct GeneratedCase {
    pub case: CaseStudy,
    pub best_similarity: f32,
}

/// The validated verdict the grading model returned for one answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: u8,
    pub is_correct: bool,
    pub explanation: String,
    pub guidance: Vec<String>,
    pub misconceptions: Vec<String>,
}

/// Structured feedback persisted with an attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub explanation: String,
    pub misconceptions: Vec<String>,
}

/// One student's graded response to exactly one question of one case study.
/// Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub case_id: Uuid,
    pub question_index: usize,
    pub question_text: String,
    pub answer_text: String,
    pub score: u8,
    pub is_correct: bool,
    pub feedback: Feedback,
    pub guidance: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for an attempt. The question_text is a snapshot of the
/// stored question at question_index, taken at evaluation time.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub user_id: Uuid,
    pub case_id: Uuid,
    pub question_index: usize,
    pub question_text: String,
    pub answer_text: String,
    pub score: u8,
    pub is_correct: bool,
    pub feedback: Feedback,
    pub guidance: Vec<String>,
}

/// Derived progression state, recomputed per request from the attempt that
/// was just written. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progression {
    pub next_question_index: usize,
    pub is_complete: bool,
}

impl Progression {
    /// A correct answer advances to the next question; an incorrect one stays
    /// put. The case is complete once the last question is answered correctly.
    pub fn after(question_index: usize, is_correct: bool, total_questions: usize) -> Self {
        let next_question_index = if is_correct {
            question_index + 1
        } else {
            question_index
        };
        Progression {
            next_question_index,
            is_complete: is_correct && question_index + 1 >= total_questions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_round_trips_through_u8() {
        for raw in 0u8..=2 {
            let level = CaseLevel::try_from(raw).expect("valid level");
            assert_eq!(u8::from(level), raw);
        }
        assert!(CaseLevel::try_from(3).is_err());
    }

    #[test]
    fn correct_answer_advances() {
        let p = Progression::after(1, true, 4);
        assert_eq!(p.next_question_index, 2);
        assert!(!p.is_complete);
    }

    #[test]
    fn incorrect_answer_stays_on_same_question() {
        let p = Progression::after(2, false, 4);
        assert_eq!(p.next_question_index, 2);
        assert!(!p.is_complete);
    }

    #[test]
    fn correct_answer_on_last_question_completes() {
        let p = Progression::after(3, true, 4);
        assert!(p.is_complete);
        assert_eq!(p.next_question_index, 4);
    }

    #[test]
    fn incorrect_answer_on_last_question_does_not_complete() {
        let p = Progression::after(3, false, 4);
        assert!(!p.is_complete);
        assert_eq!(p.next_question_index, 3);
    }
}
