//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use posh_training_core::{
    AccessService, AuthorizationStore, ProgressTracker, QuizLedger, TokenService, UserRecordStore,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// The core services hold no per-request state; everything durable lives behind `users`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: Arc<dyn UserRecordStore>,
    pub access: AccessService,
    pub progress: ProgressTracker,
    pub quiz: QuizLedger,
}

impl AppState {
    /// Wires the core services onto the given port implementations.
    pub fn new(
        config: Arc<Config>,
        allow_list: Arc<dyn AuthorizationStore>,
        tokens: Arc<dyn TokenService>,
        users: Arc<dyn UserRecordStore>,
    ) -> Self {
        Self {
            access: AccessService::new(allow_list, tokens, users.clone()),
            progress: ProgressTracker::new(users.clone()),
            quiz: QuizLedger::new(users.clone()),
            users,
            config,
        }
    }
}
