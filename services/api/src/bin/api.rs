//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, JwtTokenAdapter},
    config::Config,
    error::ApiError,
    web::{router, AppState},
};
use posh_training_core::{
    memory::{InMemoryAllowList, InMemoryUserStore},
    AuthorizationStore, UserRecordStore,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect the Stores ---
    let (allow_list, users) = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .acquire_timeout(config.store_timeout)
                .connect(database_url)
                .await?;
            let db_adapter = Arc::new(DbAdapter::new(db_pool, config.store_timeout));
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            let allow_list: Arc<dyn AuthorizationStore> = db_adapter.clone();
            let users: Arc<dyn UserRecordStore> = db_adapter;
            (allow_list, users)
        }
        None => {
            warn!(
                "DATABASE_URL not set; using the in-process store with {} allow-listed emails. \
                 Data will not survive a restart.",
                config.authorized_emails.len()
            );
            let allow_list: Arc<dyn AuthorizationStore> =
                Arc::new(InMemoryAllowList::new(config.authorized_emails.clone()));
            let users: Arc<dyn UserRecordStore> = Arc::new(InMemoryUserStore::new());
            (allow_list, users)
        }
    };

    match users.ping().await {
        Ok(()) => info!("User store reachable."),
        Err(e) => error!("User store ping failed: {}", e),
    }

    // --- 3. Initialize the Token Adapter ---
    let tokens = Arc::new(JwtTokenAdapter::new(
        config.secret_key.as_bytes(),
        config.algorithm,
        config.access_token_ttl,
    ));

    // --- 4. Build the Shared AppState and Router ---
    let app_state = Arc::new(AppState::new(config.clone(), allow_list, tokens, users));
    let app = router(app_state);

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
