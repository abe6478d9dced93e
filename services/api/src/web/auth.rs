//! services/api/src/web/auth.rs
//!
//! Email authorization endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use posh_training_core::TrainingError;
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
pub struct AuthForm {
    pub email: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub error: bool,
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub email: String,
    pub login_count: u32,
    pub user_name: Option<String>,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct CheckEmailResponse {
    pub email: String,
    pub is_authorized: bool,
    pub name: Option<String>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth - Exchange an allow-listed email for a bearer token
#[utoipa::path(
    post,
    path = "/auth",
    request_body(content = AuthForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Authentication successful", body = AuthResponse),
        (status = 400, description = "Malformed email", body = ErrorBody),
        (status = 403, description = "Email not on the allow-list", body = ErrorBody),
        (status = 503, description = "Store unavailable", body = ErrorBody)
    )
)]
pub async fn authorize_handler(
    State(state): State<Arc<AppState>>,
    ValidForm(form): ValidForm<AuthForm>,
) -> Result<Json<AuthResponse>, ApiError> {
    let grant = state
        .access
        .authorize(&form.email, Utc::now())
        .await
        .map_err(|e| {
            if let TrainingError::NotAuthorized(_) | TrainingError::InvalidEmail(_) = e {
                warn!("Authorization refused for '{}': {}", form.email, e);
            }
            e
        })?;

    info!(
        "User {} authenticated (login #{})",
        grant.identity, grant.login_count
    );

    Ok(Json(AuthResponse {
        error: false,
        access_token: grant.access_token,
        token_type: "bearer".to_string(),
        expires_at: grant.expires_at,
        email: grant.identity.to_string(),
        login_count: grant.login_count,
        user_name: grant.name,
        message: "Authentication successful".to_string(),
    }))
}

/// GET /check-email/{email} - Report whether an email is on the allow-list
#[utoipa::path(
    get,
    path = "/check-email/{email}",
    params(("email" = String, Path, description = "The email address to check.")),
    responses(
        (status = 200, description = "Membership result", body = CheckEmailResponse)
    )
)]
pub async fn check_email_handler(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Json<CheckEmailResponse>, ApiError> {
    let entry = state.access.lookup_email(&email).await?;
    Ok(Json(CheckEmailResponse {
        email,
        is_authorized: entry.is_some(),
        name: entry.and_then(|e| e.name),
    }))
}
