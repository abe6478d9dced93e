//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of the
//! `UserRecordStore` and `AuthorizationStore` ports from the `core` crate. It keeps
//! one JSONB document per user in PostgreSQL using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use posh_training_core::{
    AuthorizationEntry, AuthorizationStore, Identity, PortError, PortResult, ProgressState,
    QuizRecord, QuizStanding, TrainingError, TrainingResult, UserMutation, UserRecord,
    UserRecordStore,
};
use sqlx::{types::Json, FromRow, PgPool};
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the store ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
    timeout: Duration,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`. Every store call is bounded by `timeout`.
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn bounded<T, E>(&self, work: impl Future<Output = Result<T, E>>) -> Result<T, E>
    where
        E: From<PortError>,
    {
        tokio::time::timeout(self.timeout, work)
            .await
            .map_err(|_| E::from(PortError::Timeout(self.timeout.as_millis() as u64)))?
    }
}

fn map_sqlx(e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound("row not found".to_string()),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            PortError::Unavailable(e.to_string())
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_COLUMNS: &str = "id, email, name, login_count, progress, quiz, created_at";

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: Option<String>,
    login_count: i32,
    progress: Json<ProgressState>,
    quiz: Option<Json<QuizRecord>>,
    created_at: DateTime<Utc>,
}
impl UserRow {
    fn to_domain(self) -> PortResult<UserRecord> {
        let identity = Identity::parse(&self.email)
            .map_err(|e| PortError::Unexpected(format!("stored user email: {e}")))?;
        Ok(UserRecord {
            id: self.id,
            identity,
            name: self.name,
            login_count: u32::try_from(self.login_count).unwrap_or_default(),
            created_at: self.created_at,
            progress: self.progress.0,
            quiz: self.quiz.map(|q| q.0),
        })
    }
}

#[derive(FromRow)]
struct QuizRow {
    email: String,
    name: Option<String>,
    quiz: Json<QuizRecord>,
}

#[derive(FromRow)]
struct AuthorizedEmailRow {
    email: String,
    name: Option<String>,
}

//=========================================================================================
// `AuthorizationStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthorizationStore for DbAdapter {
    async fn lookup(&self, email: &Identity) -> PortResult<Option<AuthorizationEntry>> {
        let row = self
            .bounded(async {
                sqlx::query_as::<_, AuthorizedEmailRow>(
                    "SELECT lower(email) AS email, name FROM authorized_emails WHERE lower(email) = $1",
                )
                .bind(email.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)
            })
            .await?;

        row.map(|r| {
            let email = Identity::parse(&r.email)
                .map_err(|e| PortError::Unexpected(format!("stored allow-list email: {e}")))?;
            Ok(AuthorizationEntry { email, name: r.name })
        })
        .transpose()
    }
}

//=========================================================================================
// `UserRecordStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserRecordStore for DbAdapter {
    async fn record_login(
        &self,
        identity: &Identity,
        name: Option<&str>,
        at: DateTime<Utc>,
    ) -> PortResult<UserRecord> {
        let sql = format!(
            "INSERT INTO users (email, id, name, login_count, created_at, updated_at) \
             VALUES ($1, $2, $3, 1, $4, $4) \
             ON CONFLICT (email) DO UPDATE \
             SET login_count = users.login_count + 1, updated_at = EXCLUDED.updated_at \
             RETURNING {USER_COLUMNS}"
        );
        let row = self
            .bounded(async {
                sqlx::query_as::<_, UserRow>(&sql)
                    .bind(identity.as_str())
                    .bind(Uuid::new_v4())
                    .bind(name)
                    .bind(at)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx)
            })
            .await?;
        row.to_domain()
    }

    async fn get_user(&self, identity: &Identity) -> TrainingResult<UserRecord> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = self
            .bounded(async {
                sqlx::query_as::<_, UserRow>(&sql)
                    .bind(identity.as_str())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx)
            })
            .await?
            .ok_or_else(|| TrainingError::UserNotFound(identity.to_string()))?;
        Ok(row.to_domain()?)
    }

    async fn modify_user(
        &self,
        identity: &Identity,
        mutation: UserMutation<'_>,
    ) -> TrainingResult<UserRecord> {
        let select = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 FOR UPDATE");
        let work = async move {
            let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

            let row = sqlx::query_as::<_, UserRow>(&select)
                .bind(identity.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx)?
                .ok_or_else(|| TrainingError::UserNotFound(identity.to_string()))?;
            let mut user = row.to_domain()?;

            // A rejected transition drops `tx`, which rolls back and releases the row lock.
            mutation(&mut user)?;

            sqlx::query(
                "UPDATE users SET name = $2, login_count = $3, progress = $4, quiz = $5, \
                 updated_at = NOW() WHERE email = $1",
            )
            .bind(identity.as_str())
            .bind(user.name.as_deref())
            .bind(i32::try_from(user.login_count).unwrap_or(i32::MAX))
            .bind(Json(&user.progress))
            .bind(user.quiz.as_ref().map(Json))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

            tx.commit().await.map_err(map_sqlx)?;
            Ok::<_, TrainingError>(user)
        };
        self.bounded(work).await
    }

    async fn list_quiz_records(&self) -> PortResult<Vec<QuizStanding>> {
        let rows = self
            .bounded(async {
                sqlx::query_as::<_, QuizRow>(
                    "SELECT email, name, quiz FROM users WHERE quiz IS NOT NULL",
                )
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx)
            })
            .await?;

        rows.into_iter()
            .map(|r| {
                let identity = Identity::parse(&r.email)
                    .map_err(|e| PortError::Unexpected(format!("stored user email: {e}")))?;
                Ok(QuizStanding {
                    identity,
                    name: r.name,
                    record: r.quiz.0,
                })
            })
            .collect()
    }

    async fn ping(&self) -> PortResult<()> {
        self.bounded(async {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map(|_| ())
                .map_err(map_sqlx)
        })
        .await
    }
}
