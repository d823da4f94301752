//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::RequestError;
use crate::web::state::AppState;
use axum::extract::{Query, State};
use axum::response::Json;
use chrono::{DateTime, Utc};
use practice_lab_core::domain::{
    Attempt, CaseLevel, CaseSource, CaseStudy, Evaluation, Feedback,
};
use practice_lab_core::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        next_case_handler,
        evaluate_handler,
        generate_case_handler,
        health_handler,
    ),
    components(
        schemas(
            CaseDto,
            EvaluationDto,
            FeedbackDto,
            AttemptDto,
            NextCaseResponse,
            EvaluateRequest,
            EvaluateResponse,
            GenerateCaseRequest,
            GenerateCaseResponse,
            HealthResponse,
        )
    ),
    tags(
        (name = "Practice Lab API", description = "Case study retrieval, generation, and answer grading.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A case study as returned to clients (the embedding stays server-side).
#[derive(Serialize, ToSchema)]
pub struct CaseDto {
    pub id: Uuid,
    pub category: String,
    /// 0 = easy, 1 = medium, 2 = hard.
    pub level: u8,
    pub title: String,
    pub case_text: String,
    pub questions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<CaseStudy> for CaseDto {
    fn from(case: CaseStudy) -> Self {
        Self {
            id: case.id,
            category: case.category,
            level: case.level.into(),
            title: case.title,
            case_text: case.case_text,
            questions: case.questions,
            created_at: case.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct EvaluationDto {
    pub score: u8,
    pub is_correct: bool,
    pub explanation: String,
    pub guidance: Vec<String>,
    pub misconceptions: Vec<String>,
}

impl From<Evaluation> for EvaluationDto {
    fn from(evaluation: Evaluation) -> Self {
        Self {
            score: evaluation.score,
            is_correct: evaluation.is_correct,
            explanation: evaluation.explanation,
            guidance: evaluation.guidance,
            misconceptions: evaluation.misconceptions,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct FeedbackDto {
    pub explanation: String,
    pub misconceptions: Vec<String>,
}

impl From<Feedback> for FeedbackDto {
    fn from(feedback: Feedback) -> Self {
        Self {
            explanation: feedback.explanation,
            misconceptions: feedback.misconceptions,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AttemptDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub case_id: Uuid,
    pub question_index: usize,
    pub question_text: String,
    pub answer_text: String,
    pub score: u8,
    pub is_correct: bool,
    pub feedback: FeedbackDto,
    pub guidance: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Attempt> for AttemptDto {
    fn from(attempt: Attempt) -> Self {
        Self {
            id: attempt.id,
            user_id: attempt.user_id,
            case_id: attempt.case_id,
            question_index: attempt.question_index,
            question_text: attempt.question_text,
            answer_text: attempt.answer_text,
            score: attempt.score,
            is_correct: attempt.is_correct,
            feedback: attempt.feedback.into(),
            guidance: attempt.guidance,
            created_at: attempt.created_at,
        }
    }
}

#[derive(Deserialize, IntoParams)]
pub struct NextCaseParams {
    /// The requesting user's id.
    pub user_id: Uuid,
    /// Free-text category label, e.g. "Ethics".
    pub category: String,
    /// 0 = easy, 1 = medium, 2 = hard.
    pub level: u8,
}

#[derive(Serialize, ToSchema)]
pub struct NextCaseResponse {
    /// "existing" when served from the store, "generated" when freshly created.
    pub source: &'static str,
    pub case: CaseDto,
}

#[derive(Deserialize, ToSchema)]
pub struct EvaluateRequest {
    pub user_id: Uuid,
    pub case_id: Uuid,
    pub question_index: i64,
    pub answer_text: String,
    /// Optional client-cached copy of the question; used only when it matches
    /// the stored question exactly.
    pub question_text: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EvaluateResponse {
    pub evaluation: EvaluationDto,
    pub attempt: AttemptDto,
    pub next_question_index: usize,
    pub is_complete: bool,
    pub total_questions: usize,
}

#[derive(Deserialize, ToSchema)]
pub struct GenerateCaseRequest {
    pub category: String,
    /// 0 = easy, 1 = medium, 2 = hard.
    pub level: u8,
}

#[derive(Serialize, ToSchema)]
pub struct GenerateCaseResponse {
    pub case: CaseDto,
    pub best_similarity: f32,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
}

fn parse_level(raw: u8) -> Result<CaseLevel, RequestError> {
    CaseLevel::try_from(raw)
        .map_err(|msg| RequestError(PipelineError::Validation(msg)))
}

fn source_label(source: CaseSource) -> &'static str {
    match source {
        CaseSource::Existing => "existing",
        CaseSource::Generated => "generated",
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Serve a case the user has not yet attempted, generating one if needed.
#[utoipa::path(
    get,
    path = "/cases/next",
    params(NextCaseParams),
    responses(
        (status = 200, description = "An unseen (or freshly generated) case", body = NextCaseResponse),
        (status = 400, description = "Invalid user_id, category, or level"),
        (status = 503, description = "No case available and generation failed"),
    )
)]
pub async fn next_case_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<NextCaseParams>,
) -> Result<Json<NextCaseResponse>, RequestError> {
    let level = parse_level(params.level)?;
    let selected = app_state
        .selector
        .select_case(params.user_id, &params.category, level)
        .await?;

    Ok(Json(NextCaseResponse {
        source: source_label(selected.source),
        case: selected.case.into(),
    }))
}

/// Grade one answer to one question of a case and record the attempt.
#[utoipa::path(
    post,
    path = "/evaluate",
    request_body = EvaluateRequest,
    responses(
        (status = 200, description = "Graded verdict plus progression state", body = EvaluateResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 404, description = "Unknown case"),
        (status = 502, description = "Grading model returned unusable output"),
    )
)]
pub async fn evaluate_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, RequestError> {
    let outcome = app_state
        .evaluator
        .evaluate(
            req.user_id,
            req.case_id,
            req.question_index,
            &req.answer_text,
            req.question_text.as_deref(),
        )
        .await?;

    Ok(Json(EvaluateResponse {
        evaluation: outcome.evaluation.into(),
        attempt: outcome.attempt.into(),
        next_question_index: outcome.next_question_index,
        is_complete: outcome.is_complete,
        total_questions: outcome.total_questions,
    }))
}

/// Generate and persist a new case study (administrative trigger).
#[utoipa::path(
    post,
    path = "/cases/generate",
    request_body = GenerateCaseRequest,
    responses(
        (status = 200, description = "The persisted case and its best neighbor similarity", body = GenerateCaseResponse),
        (status = 400, description = "Invalid category or level"),
        (status = 502, description = "Model returned unusable output on every attempt"),
        (status = 503, description = "All candidates were near-duplicates"),
    )
)]
pub async fn generate_case_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<GenerateCaseRequest>,
) -> Result<Json<GenerateCaseResponse>, RequestError> {
    let level = parse_level(req.level)?;
    let generated = app_state
        .generator
        .generate_case(&req.category, level)
        .await?;

    Ok(Json(GenerateCaseResponse {
        case: generated.case.into(),
        best_similarity: generated.best_similarity,
    }))
}

/// Liveness probe: verifies the store answers a trivial query.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and store are reachable", body = HealthResponse),
        (status = 502, description = "Store is unreachable"),
    )
)]
pub async fn health_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, RequestError> {
    app_state.store.ping().await?;
    Ok(Json(HealthResponse { status: "ok" }))
}
