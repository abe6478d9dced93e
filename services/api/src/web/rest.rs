//! services/api/src/web/rest.rs
//!
//! Contains the health endpoint and the master OpenAPI document definition.

use crate::error::{ApiError, ErrorBody};
use crate::web::{auth, progress, quiz, state::AppState};
use axum::{extract::State, response::Json};
use posh_training_core::PortError;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::authorize_handler,
        auth::check_email_handler,
        progress::start_slide_handler,
        progress::end_slide_handler,
        progress::finish_handler,
        progress::get_progress_handler,
        quiz::submit_score_handler,
        quiz::get_score_handler,
        quiz::leaderboard_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorBody,
            auth::AuthForm,
            auth::AuthResponse,
            auth::CheckEmailResponse,
            progress::SlideForm,
            progress::SlideVisitView,
            progress::ProgressView,
            quiz::ScoreForm,
            quiz::QuizRecordView,
            quiz::SubmitScoreResponse,
            quiz::ScoreResponse,
            quiz::LeaderboardEntryView,
            quiz::LeaderboardResponse,
        )
    ),
    tags(
        (name = "POSH Training API", description = "Email authorization, slide progress and quiz scores.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    message: String,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness check that also pings the user store.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and store are reachable", body = HealthResponse),
        (status = 503, description = "Store unreachable", body = ErrorBody)
    )
)]
pub async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, ApiError> {
    state.users.ping().await.map_err(|e| {
        error!("Health check failed: {}", e);
        ApiError::from(PortError::Unavailable(e.to_string()))
    })?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        message: "Store connected".to_string(),
    }))
}
