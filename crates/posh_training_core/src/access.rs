//! crates/posh_training_core/src/access.rs
//!
//! Email authorization and credential handling on top of the allow-list,
//! token and user-store ports.

use crate::domain::{AuthorizationEntry, Identity};
use crate::error::{TrainingError, TrainingResult};
use crate::ports::{AuthorizationStore, PortError, TokenService, UserRecordStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// The result of a successful `authorize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub identity: Identity,
    pub name: Option<String>,
    pub login_count: u32,
}

#[derive(Clone)]
pub struct AccessService {
    allow_list: Arc<dyn AuthorizationStore>,
    tokens: Arc<dyn TokenService>,
    users: Arc<dyn UserRecordStore>,
}

impl AccessService {
    pub fn new(
        allow_list: Arc<dyn AuthorizationStore>,
        tokens: Arc<dyn TokenService>,
        users: Arc<dyn UserRecordStore>,
    ) -> Self {
        Self {
            allow_list,
            tokens,
            users,
        }
    }

    /// The allow-list entry for `email`, if any. Malformed input is never listed.
    pub async fn lookup_email(&self, email: &str) -> TrainingResult<Option<AuthorizationEntry>> {
        let Ok(identity) = Identity::parse(email) else {
            return Ok(None);
        };
        Ok(self.allow_list.lookup(&identity).await?)
    }

    pub async fn check_email(&self, email: &str) -> TrainingResult<bool> {
        Ok(self.lookup_email(email).await?.is_some())
    }

    /// Admits an allow-listed email: creates its document on first use, counts the
    /// login and issues a credential.
    pub async fn authorize(&self, email: &str, at: DateTime<Utc>) -> TrainingResult<AccessGrant> {
        let identity = Identity::parse(email)?;
        let entry = self
            .allow_list
            .lookup(&identity)
            .await?
            .ok_or_else(|| TrainingError::NotAuthorized(identity.to_string()))?;

        let user = self
            .users
            .record_login(&identity, entry.name.as_deref(), at)
            .await?;
        let token = self.tokens.issue(&identity, at)?;

        Ok(AccessGrant {
            access_token: token.access_token,
            expires_at: token.expires_at,
            name: user.name.or(entry.name),
            login_count: user.login_count,
            identity,
        })
    }

    /// Resolves a bearer credential to the identity it was issued for.
    pub fn authenticate(&self, token: &str) -> TrainingResult<Identity> {
        self.tokens.verify(token).map_err(|e| match e {
            PortError::Unauthorized => TrainingError::NotAuthenticated,
            other => TrainingError::Port(other),
        })
    }
}
