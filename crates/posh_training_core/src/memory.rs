//! crates/posh_training_core/src/memory.rs
//!
//! In-process implementations of the store ports. Used when no database is
//! configured and throughout the test suites.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::domain::{AuthorizationEntry, Identity, QuizStanding, UserRecord};
use crate::error::{TrainingError, TrainingResult};
use crate::ports::{AuthorizationStore, PortError, PortResult, UserMutation, UserRecordStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

fn poisoned<E: std::fmt::Display>(e: E) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// Allow-list
//=========================================================================================

/// A fixed allow-list held in memory, seeded at startup.
#[derive(Debug, Default)]
pub struct InMemoryAllowList {
    entries: HashMap<Identity, Option<String>>,
}

impl InMemoryAllowList {
    pub fn new(entries: impl IntoIterator<Item = AuthorizationEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.email, e.name)).collect(),
        }
    }
}

#[async_trait]
impl AuthorizationStore for InMemoryAllowList {
    async fn lookup(&self, email: &Identity) -> PortResult<Option<AuthorizationEntry>> {
        Ok(self.entries.get(email).map(|name| AuthorizationEntry {
            email: email.clone(),
            name: name.clone(),
        }))
    }
}

//=========================================================================================
// User documents
//=========================================================================================

/// User documents behind an arena of per-identity locks.
///
/// The map lock is only held long enough to find or create a slot; every
/// read-modify-write then runs under that identity's own mutex.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    slots: RwLock<HashMap<Identity, Arc<Mutex<UserRecord>>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, identity: &Identity) -> PortResult<Option<Arc<Mutex<UserRecord>>>> {
        Ok(self.slots.read().map_err(poisoned)?.get(identity).cloned())
    }
}

#[async_trait]
impl UserRecordStore for InMemoryUserStore {
    async fn record_login(
        &self,
        identity: &Identity,
        name: Option<&str>,
        at: DateTime<Utc>,
    ) -> PortResult<UserRecord> {
        let slot = {
            let mut slots = self.slots.write().map_err(poisoned)?;
            slots
                .entry(identity.clone())
                .or_insert_with(|| {
                    let record = UserRecord::new(identity.clone(), name.map(str::to_string), at);
                    Arc::new(Mutex::new(record))
                })
                .clone()
        };

        let mut record = slot.lock().map_err(poisoned)?;
        record.login_count = record.login_count.saturating_add(1);
        Ok(record.clone())
    }

    async fn get_user(&self, identity: &Identity) -> TrainingResult<UserRecord> {
        let slot = self
            .slot(identity)?
            .ok_or_else(|| TrainingError::UserNotFound(identity.to_string()))?;
        let record = slot.lock().map_err(poisoned)?;
        Ok(record.clone())
    }

    async fn modify_user(
        &self,
        identity: &Identity,
        mutation: UserMutation<'_>,
    ) -> TrainingResult<UserRecord> {
        let slot = self
            .slot(identity)?
            .ok_or_else(|| TrainingError::UserNotFound(identity.to_string()))?;
        let mut stored = slot.lock().map_err(poisoned)?;

        let mut working = stored.clone();
        mutation(&mut working)?;
        *stored = working;
        Ok(stored.clone())
    }

    async fn list_quiz_records(&self) -> PortResult<Vec<QuizStanding>> {
        let slots: Vec<_> = self.slots.read().map_err(poisoned)?.values().cloned().collect();

        let mut standings = Vec::new();
        for slot in slots {
            let record = slot.lock().map_err(poisoned)?;
            if let Some(quiz) = &record.quiz {
                standings.push(QuizStanding {
                    identity: record.identity.clone(),
                    name: record.name.clone(),
                    record: quiz.clone(),
                });
            }
        }
        Ok(standings)
    }

    async fn ping(&self) -> PortResult<()> {
        self.slots.read().map(|_| ()).map_err(poisoned)
    }
}
