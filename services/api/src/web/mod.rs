pub mod auth;
pub mod extract;
pub mod middleware;
pub mod progress;
pub mod quiz;
pub mod rest;
pub mod state;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, ORIGIN, USER_AGENT},
        HeaderName, HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use middleware::require_auth;
pub use rest::{health_handler, ApiDoc};
pub use state::AppState;

/// Builds the complete application router: public routes, bearer-protected
/// routes, CORS, request tracing and the Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/auth", post(auth::authorize_handler))
        .route("/check-email/{email}", get(auth::check_email_handler))
        .route("/quiz/leaderboard", get(quiz::leaderboard_handler));

    // Protected routes (bearer token required)
    let protected_routes = Router::new()
        .route("/progress", get(progress::get_progress_handler))
        .route("/progress/start", post(progress::start_slide_handler))
        .route("/progress/end", post(progress::end_slide_handler))
        .route("/progress/finish", post(progress::finish_handler))
        .route("/quiz/submit", post(quiz::submit_score_handler))
        .route("/quiz/score", get(quiz::get_score_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let cors = cors_layer(&app_state.config.allowed_origins);

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            ORIGIN,
            USER_AGENT,
            CACHE_CONTROL,
            HeaderName::from_static("x-requested-with"),
        ])
}
