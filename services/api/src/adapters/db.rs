//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `CaseStoreService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! The `embedding` column is a pgvector `vector`; sqlx has no native codec for
//! it, so query vectors are bound in their textual `[v1,v2,...]` form and cast
//! with `::vector` in SQL. Runtime-checked queries keep the crate buildable
//! without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use practice_lab_core::domain::{
    Attempt, CaseLevel, CaseNeighbor, CaseStudy, Feedback, NewAttempt, NewCaseStudy,
};
use practice_lab_core::ports::{CaseStoreService, PortError, PortResult};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `CaseStoreService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Renders an embedding in pgvector's textual input form.
fn vector_literal(embedding: &[f32]) -> String {
    let parts: Vec<String> = embedding.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct CaseStudyRecord {
    id: Uuid,
    category: String,
    level: i16,
    title: String,
    case_text: String,
    questions: Json<Vec<String>>,
    created_at: DateTime<Utc>,
}

impl CaseStudyRecord {
    fn to_domain(self) -> PortResult<CaseStudy> {
        let level = decode_level(self.level)?;
        Ok(CaseStudy {
            id: self.id,
            category: self.category,
            level,
            title: self.title,
            case_text: self.case_text,
            questions: self.questions.0,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct CaseNeighborRecord {
    id: Uuid,
    title: String,
    case_text: String,
    questions: Json<Vec<String>>,
    similarity: f64,
}

impl CaseNeighborRecord {
    fn to_domain(self) -> CaseNeighbor {
        CaseNeighbor {
            id: self.id,
            title: self.title,
            case_text: self.case_text,
            questions: self.questions.0,
            similarity: self.similarity as f32,
        }
    }
}

#[derive(FromRow)]
struct AttemptRecord {
    id: Uuid,
    user_id: Uuid,
    case_id: Uuid,
    question_index: i32,
    question_text: String,
    answer_text: String,
    score: i16,
    is_correct: bool,
    feedback: Json<Feedback>,
    guidance: Json<Vec<String>>,
    created_at: DateTime<Utc>,
}

impl AttemptRecord {
    fn to_domain(self) -> Attempt {
        Attempt {
            id: self.id,
            user_id: self.user_id,
            case_id: self.case_id,
            question_index: self.question_index as usize,
            question_text: self.question_text,
            answer_text: self.answer_text,
            score: self.score as u8,
            is_correct: self.is_correct,
            feedback: self.feedback.0,
            guidance: self.guidance.0,
            created_at: self.created_at,
        }
    }
}

fn decode_level(raw: i16) -> PortResult<CaseLevel> {
    u8::try_from(raw)
        .ok()
        .and_then(|n| CaseLevel::try_from(n).ok())
        .ok_or_else(|| PortError::Unexpected(format!("stored level {} is invalid", raw)))
}

//=========================================================================================
// `CaseStoreService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CaseStoreService for DbAdapter {
    async fn attempted_case_ids(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT DISTINCT case_id FROM attempts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    async fn find_cases(
        &self,
        category: &str,
        level: CaseLevel,
        exclude: &[Uuid],
    ) -> PortResult<Vec<CaseStudy>> {
        let records = sqlx::query_as::<_, CaseStudyRecord>(
            "SELECT id, category, level, title, case_text, questions, created_at \
             FROM case_studies \
             WHERE category = $1 AND level = $2 AND id <> ALL($3)",
        )
        .bind(category)
        .bind(i16::from(u8::from(level)))
        .bind(exclude.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn get_case(&self, case_id: Uuid) -> PortResult<CaseStudy> {
        let record = sqlx::query_as::<_, CaseStudyRecord>(
            "SELECT id, category, level, title, case_text, questions, created_at \
             FROM case_studies WHERE id = $1",
        )
        .bind(case_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?
        .ok_or_else(|| PortError::NotFound(format!("Case {} not found", case_id)))?;

        record.to_domain()
    }

    async fn match_cases(
        &self,
        embedding: &[f32],
        category: &str,
        level: CaseLevel,
        match_count: usize,
    ) -> PortResult<Vec<CaseNeighbor>> {
        let records = sqlx::query_as::<_, CaseNeighborRecord>(
            "SELECT id, title, case_text, questions, \
                    1 - (embedding <=> $3::vector) AS similarity \
             FROM case_studies \
             WHERE category = $1 AND level = $2 \
             ORDER BY embedding <=> $3::vector \
             LIMIT $4",
        )
        .bind(category)
        .bind(i16::from(u8::from(level)))
        .bind(vector_literal(embedding))
        .bind(match_count as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn insert_case(&self, case: NewCaseStudy) -> PortResult<CaseStudy> {
        let record = sqlx::query_as::<_, CaseStudyRecord>(
            "INSERT INTO case_studies (category, level, title, case_text, questions, embedding) \
             VALUES ($1, $2, $3, $4, $5, $6::vector) \
             RETURNING id, category, level, title, case_text, questions, created_at",
        )
        .bind(case.category)
        .bind(i16::from(u8::from(case.level)))
        .bind(case.title)
        .bind(case.case_text)
        .bind(Json(case.questions))
        .bind(vector_literal(&case.embedding))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        record.to_domain()
    }

    async fn insert_attempt(&self, attempt: NewAttempt) -> PortResult<Attempt> {
        let record = sqlx::query_as::<_, AttemptRecord>(
            "INSERT INTO attempts \
                 (user_id, case_id, question_index, question_text, answer_text, \
                  score, is_correct, feedback, guidance) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING id, user_id, case_id, question_index, question_text, answer_text, \
                       score, is_correct, feedback, guidance, created_at",
        )
        .bind(attempt.user_id)
        .bind(attempt.case_id)
        .bind(attempt.question_index as i32)
        .bind(attempt.question_text)
        .bind(attempt.answer_text)
        .bind(i16::from(attempt.score))
        .bind(attempt.is_correct)
        .bind(Json(attempt.feedback))
        .bind(Json(attempt.guidance))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(record.to_domain())
    }

    async fn ping(&self) -> PortResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_literal_matches_pgvector_input_form() {
        assert_eq!(vector_literal(&[1.0, -0.5, 0.25]), "[1,-0.5,0.25]");
        assert_eq!(vector_literal(&[]), "[]");
    }

    #[test]
    fn invalid_stored_level_is_rejected() {
        assert!(decode_level(7).is_err());
        assert!(decode_level(-1).is_err());
        assert!(decode_level(1).is_ok());
    }
}
