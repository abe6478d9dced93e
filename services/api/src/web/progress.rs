//! services/api/src/web/progress.rs
//!
//! Slide progress endpoints. All of them run behind `require_auth`.

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use posh_training_core::{Identity, ProgressReport, ProgressState, SlideId, SlideVisit, TrainingStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::error::{ApiError, ErrorBody};
use crate::web::extract::ValidForm;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SlideForm {
    pub slide_id: String,
}

#[derive(Serialize, ToSchema)]
pub struct SlideVisitView {
    pub slide_id: String,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
}

impl From<&SlideVisit> for SlideVisitView {
    fn from(visit: &SlideVisit) -> Self {
        Self {
            slide_id: visit.slide_id.to_string(),
            started_at: visit.started_at,
            ended_at: visit.ended_at,
            duration_seconds: visit
                .duration()
                .map(|d| d.num_milliseconds() as f64 / 1000.0),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ProgressView {
    /// `in_progress` or `completed`.
    #[schema(value_type = String, example = "in_progress")]
    pub status: TrainingStatus,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub current_slide: Option<String>,
    pub completed_slides: usize,
    pub total_time_minutes: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_count: Option<u32>,
    pub slides: Vec<SlideVisitView>,
}

impl From<&ProgressState> for ProgressView {
    fn from(progress: &ProgressState) -> Self {
        Self {
            status: progress.status(),
            completed: progress.completed,
            completed_at: progress.completed_at,
            current_slide: progress.current_slide.as_ref().map(ToString::to_string),
            completed_slides: progress.completed_slides(),
            total_time_minutes: progress.total_time_minutes(),
            login_count: None,
            slides: progress.slides.values().map(SlideVisitView::from).collect(),
        }
    }
}

impl From<ProgressReport> for ProgressView {
    fn from(report: ProgressReport) -> Self {
        Self {
            status: report.status,
            completed_slides: report.completed_slides,
            total_time_minutes: report.total_time_minutes,
            login_count: Some(report.login_count),
            ..Self::from(&report.progress)
        }
    }
}

fn parse_slide(raw: &str) -> Result<SlideId, ApiError> {
    SlideId::new(raw).ok_or_else(|| ApiError::BadRequest("slide_id must not be blank".to_string()))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /progress/start - Open (or reopen) a slide visit
#[utoipa::path(
    post,
    path = "/progress/start",
    request_body(content = SlideForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Slide started", body = ProgressView),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    )
)]
pub async fn start_slide_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    ValidForm(form): ValidForm<SlideForm>,
) -> Result<Json<ProgressView>, ApiError> {
    let slide_id = parse_slide(&form.slide_id)?;
    let progress = state
        .progress
        .start_slide(&identity, slide_id.clone(), Utc::now())
        .await?;
    info!("User {} started slide {}", identity, slide_id);
    Ok(Json(ProgressView::from(&progress)))
}

/// POST /progress/end - Close the visit of a started slide
#[utoipa::path(
    post,
    path = "/progress/end",
    request_body(content = SlideForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Slide ended", body = ProgressView),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 409, description = "Slide not started, or end precedes the recorded bound", body = ErrorBody)
    )
)]
pub async fn end_slide_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    ValidForm(form): ValidForm<SlideForm>,
) -> Result<Json<ProgressView>, ApiError> {
    let slide_id = parse_slide(&form.slide_id)?;
    let progress = state
        .progress
        .end_slide(&identity, slide_id.clone(), Utc::now())
        .await
        .map_err(|e| {
            warn!("User {} could not end slide {}: {}", identity, slide_id, e);
            e
        })?;
    info!("User {} ended slide {}", identity, slide_id);
    Ok(Json(ProgressView::from(&progress)))
}

/// POST /progress/finish - Mark the training as completed
#[utoipa::path(
    post,
    path = "/progress/finish",
    responses(
        (status = 200, description = "Training completed", body = ProgressView),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    )
)]
pub async fn finish_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ProgressView>, ApiError> {
    let progress = state.progress.finish(&identity, Utc::now()).await?;
    info!(
        "User {} completed the training at {:?}",
        identity, progress.completed_at
    );
    Ok(Json(ProgressView::from(&progress)))
}

/// GET /progress - The caller's progress with login figures
#[utoipa::path(
    get,
    path = "/progress",
    responses(
        (status = 200, description = "Current progress", body = ProgressView),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    )
)]
pub async fn get_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ProgressView>, ApiError> {
    let report = state.progress.report(&identity).await?;
    Ok(Json(ProgressView::from(report)))
}
