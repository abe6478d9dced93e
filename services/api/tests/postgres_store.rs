//! Store tests against a live PostgreSQL. Skipped unless `DATABASE_URL` is set.

use api_lib::adapters::DbAdapter;
use chrono::{DateTime, TimeZone, Utc};
use posh_training_core::{
    AuthorizationStore, Identity, ProgressTracker, QuizLedger, SlideId, TrainingError,
    TrainingResult, UserRecord, UserRecordStore,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn t(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

async fn adapter() -> Option<Arc<DbAdapter>> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping PostgreSQL store test");
        return None;
    };
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await
        .unwrap();
    let adapter = DbAdapter::new(pool, Duration::from_secs(10));
    adapter.run_migrations().await.unwrap();
    Some(Arc::new(adapter))
}

/// A fresh identity per test, so runs never see each other's rows.
fn unique_identity() -> Identity {
    Identity::parse(&format!("pg-{}@example.com", Uuid::new_v4().simple())).unwrap()
}

#[tokio::test]
async fn rejected_mutation_rolls_back() {
    let Some(store) = adapter().await else { return };
    let identity = unique_identity();
    store.record_login(&identity, Some("Pat"), t(0)).await.unwrap();

    let err = store
        .modify_user(
            &identity,
            Box::new(|user: &mut UserRecord| -> TrainingResult<()> {
                user.login_count = 99;
                user.progress.finish(t(1));
                Err(TrainingError::InvalidLimit(0))
            }),
        )
        .await
        .unwrap_err();

    assert_eq!(err, TrainingError::InvalidLimit(0));
    let stored = store.get_user(&identity).await.unwrap();
    assert_eq!(stored.login_count, 1);
    assert!(!stored.progress.completed);
}

#[tokio::test]
async fn record_login_creates_once_and_counts() {
    let Some(store) = adapter().await else { return };
    let identity = unique_identity();

    let first = store.record_login(&identity, Some("Pat"), t(0)).await.unwrap();
    let second = store.record_login(&identity, None, t(5)).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.login_count, 2);
    assert_eq!(second.name.as_deref(), Some("Pat"));
}

#[tokio::test]
async fn missing_user_is_not_found() {
    let Some(store) = adapter().await else { return };
    assert!(matches!(
        store.get_user(&unique_identity()).await,
        Err(TrainingError::UserNotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn row_lock_serializes_concurrent_submissions() {
    let Some(store) = adapter().await else { return };
    let identity = unique_identity();
    store.record_login(&identity, None, t(0)).await.unwrap();
    let ledger = QuizLedger::new(store.clone());

    let handles: Vec<_> = (0..8i64)
        .map(|i| {
            let ledger = ledger.clone();
            let identity = identity.clone();
            tokio::spawn(async move { ledger.submit_score(&identity, i, 10, t(i)).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let record = ledger.get_score(&identity).await.unwrap().unwrap();
    assert_eq!(record.attempt_count, 8);
    assert_eq!(record.score, 7);
}

#[tokio::test]
async fn progress_document_survives_a_round_trip() {
    let Some(store) = adapter().await else { return };
    let identity = unique_identity();
    store.record_login(&identity, None, t(0)).await.unwrap();
    let tracker = ProgressTracker::new(store.clone());
    let slide = SlideId::new("3").unwrap();

    tracker.start_slide(&identity, slide.clone(), t(0)).await.unwrap();
    tracker.end_slide(&identity, slide.clone(), t(120)).await.unwrap();
    tracker.start_slide(&identity, slide.clone(), t(200)).await.unwrap();

    let report = tracker.report(&identity).await.unwrap();
    assert_eq!(report.completed_slides, 1);
    assert!((report.total_time_minutes - 2.0).abs() < f64::EPSILON);
    assert!(report.progress.slides[&slide].is_open());
}

#[tokio::test]
async fn allow_list_lookup_ignores_stored_case() {
    let Some(store) = adapter().await else { return };
    let identity = unique_identity();
    let pool = sqlx::PgPool::connect(&std::env::var("DATABASE_URL").unwrap())
        .await
        .unwrap();
    sqlx::query("INSERT INTO authorized_emails (email, name) VALUES ($1, $2)")
        .bind(identity.as_str().to_uppercase())
        .bind("Pat")
        .execute(&pool)
        .await
        .unwrap();

    let entry = store.lookup(&identity).await.unwrap().unwrap();
    assert_eq!(entry.email, identity);
    assert_eq!(entry.name.as_deref(), Some("Pat"));
}
