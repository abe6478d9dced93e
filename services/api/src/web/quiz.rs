//! services/api/src/web/quiz.rs
//!
//! Quiz score endpoints and the public leaderboard.

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use posh_training_core::{Identity, LeaderboardEntry, QuizRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::error::{ApiError, ErrorBody};
use crate::web::extract::{ValidForm, ValidQuery};
use crate::web::state::AppState;

const DEFAULT_LEADERBOARD_LIMIT: i64 = 10;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct ScoreForm {
    pub score: i64,
    /// Defaults to the configured quiz maximum.
    pub max_score: Option<i64>,
}

#[derive(Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct QuizRecordView {
    pub score: u32,
    pub max_score: u32,
    pub attempt_count: u32,
    pub submitted_at: DateTime<Utc>,
    pub quiz_date: String,
    pub quiz_time: String,
}

impl From<QuizRecord> for QuizRecordView {
    fn from(record: QuizRecord) -> Self {
        Self {
            quiz_date: record.submitted_at.format("%Y-%m-%d").to_string(),
            quiz_time: record.submitted_at.format("%H:%M:%S").to_string(),
            score: record.score,
            max_score: record.max_score,
            attempt_count: record.attempt_count,
            submitted_at: record.submitted_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SubmitScoreResponse {
    pub error: bool,
    pub message: String,
    pub email: String,
    pub quiz: QuizRecordView,
}

#[derive(Serialize, ToSchema)]
pub struct ScoreResponse {
    pub error: bool,
    pub email: String,
    /// `null` until the first attempt.
    pub quiz: Option<QuizRecordView>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaderboardEntryView {
    pub rank: usize,
    pub identity: String,
    pub name: Option<String>,
    pub score: u32,
    pub max_score: u32,
    pub submitted_at: DateTime<Utc>,
}

impl From<LeaderboardEntry> for LeaderboardEntryView {
    fn from(entry: LeaderboardEntry) -> Self {
        Self {
            rank: entry.rank,
            identity: entry.identity,
            name: entry.name,
            score: entry.score,
            max_score: entry.max_score,
            submitted_at: entry.submitted_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct LeaderboardResponse {
    pub error: bool,
    pub leaderboard: Vec<LeaderboardEntryView>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /quiz/submit - Record a quiz attempt (best score is kept)
#[utoipa::path(
    post,
    path = "/quiz/submit",
    request_body(content = ScoreForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Attempt recorded", body = SubmitScoreResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 422, description = "Score out of range", body = ErrorBody)
    )
)]
pub async fn submit_score_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    ValidForm(form): ValidForm<ScoreForm>,
) -> Result<Json<SubmitScoreResponse>, ApiError> {
    let max_score = form.max_score.unwrap_or(state.config.quiz_max_score);
    let record = state
        .quiz
        .submit_score(&identity, form.score, max_score, Utc::now())
        .await
        .map_err(|e| {
            warn!("Quiz submission from {} rejected: {}", identity, e);
            e
        })?;
    info!(
        "User {} submitted {}/{} (attempt {}, best {})",
        identity, form.score, max_score, record.attempt_count, record.score
    );

    Ok(Json(SubmitScoreResponse {
        error: false,
        message: "Quiz score submitted successfully".to_string(),
        email: identity.to_string(),
        quiz: record.into(),
    }))
}

/// GET /quiz/score - The caller's best quiz result
#[utoipa::path(
    get,
    path = "/quiz/score",
    responses(
        (status = 200, description = "Best result, or null before the first attempt", body = ScoreResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    )
)]
pub async fn get_score_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ScoreResponse>, ApiError> {
    let record = state.quiz.get_score(&identity).await?;
    Ok(Json(ScoreResponse {
        error: false,
        email: identity.to_string(),
        quiz: record.map(QuizRecordView::from),
    }))
}

/// GET /quiz/leaderboard - Top scores, earliest submission first on ties
#[utoipa::path(
    get,
    path = "/quiz/leaderboard",
    params(("limit" = Option<i64>, Query, description = "Maximum number of entries (default 10).")),
    responses(
        (status = 200, description = "Ranked entries", body = LeaderboardResponse),
        (status = 400, description = "Non-positive limit", body = ErrorBody)
    )
)]
pub async fn leaderboard_handler(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
    let entries = state.quiz.leaderboard(limit).await?;
    Ok(Json(LeaderboardResponse {
        error: false,
        leaderboard: entries.into_iter().map(LeaderboardEntryView::from).collect(),
    }))
}
