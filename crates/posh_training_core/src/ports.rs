//! crates/posh_training_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core depends on.
//! These traits form the boundary of the hexagonal architecture, keeping the core
//! independent of the concrete database and of the credential format.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::domain::{AuthorizationEntry, Identity, QuizStanding, UserRecord};
use crate::error::TrainingResult;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, crypto).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Store operation timed out after {0} ms")]
    Timeout(u64),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// Transient failures; every mutating operation is safe to repeat.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Unavailable(_))
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// A state transition applied to one user document inside a store's critical section.
///
/// The store hands the closure a working copy; the copy is persisted only when the
/// closure returns `Ok`, so a rejected transition leaves no trace.
pub type UserMutation<'a> = Box<dyn FnOnce(&mut UserRecord) -> TrainingResult<()> + Send + 'a>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait AuthorizationStore: Send + Sync {
    /// Finds the allow-list entry for an already-normalized email.
    async fn lookup(&self, email: &Identity) -> PortResult<Option<AuthorizationEntry>>;

    async fn contains(&self, email: &Identity) -> PortResult<bool> {
        Ok(self.lookup(email).await?.is_some())
    }
}

/// A credential issued for an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

pub trait TokenService: Send + Sync {
    /// Signs a time-limited credential for `identity`, valid from `now`.
    fn issue(&self, identity: &Identity, now: DateTime<Utc>) -> PortResult<IssuedToken>;

    /// Checks a credential and returns the identity it was issued for.
    /// Fails with `PortError::Unauthorized` for anything but a valid, unexpired token.
    fn verify(&self, token: &str) -> PortResult<Identity>;
}

#[async_trait]
pub trait UserRecordStore: Send + Sync {
    /// Creates the document on first login and bumps `login_count`, atomically.
    async fn record_login(
        &self,
        identity: &Identity,
        name: Option<&str>,
        at: DateTime<Utc>,
    ) -> PortResult<UserRecord>;

    async fn get_user(&self, identity: &Identity) -> TrainingResult<UserRecord>;

    /// Applies `mutation` as one atomic read-modify-write on the identity's document
    /// and returns the committed document. Concurrent calls for the same identity
    /// are serialized; calls for different identities never wait on each other.
    async fn modify_user(
        &self,
        identity: &Identity,
        mutation: UserMutation<'_>,
    ) -> TrainingResult<UserRecord>;

    /// Every user that has attempted the quiz. Not linearized with concurrent writes.
    async fn list_quiz_records(&self) -> PortResult<Vec<QuizStanding>>;

    /// Liveness probe for the health endpoint.
    async fn ping(&self) -> PortResult<()>;
}
