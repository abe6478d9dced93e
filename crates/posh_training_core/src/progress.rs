//! crates/posh_training_core/src/progress.rs
//!
//! The Progress Tracker: slide visits and training completion for one identity.
//! Each operation is a single atomic read-modify-write through the user store.

use crate::domain::{Identity, ProgressState, SlideId, TrainingStatus, UserRecord};
use crate::error::TrainingResult;
use crate::ports::UserRecordStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Progress plus the login figures shown alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub progress: ProgressState,
    pub login_count: u32,
    pub completed_slides: usize,
    pub total_time_minutes: f64,
    pub status: TrainingStatus,
}

#[derive(Clone)]
pub struct ProgressTracker {
    users: Arc<dyn UserRecordStore>,
}

impl ProgressTracker {
    pub fn new(users: Arc<dyn UserRecordStore>) -> Self {
        Self { users }
    }

    pub async fn start_slide(
        &self,
        identity: &Identity,
        slide_id: SlideId,
        at: DateTime<Utc>,
    ) -> TrainingResult<ProgressState> {
        let record = self
            .users
            .modify_user(
                identity,
                Box::new(move |user: &mut UserRecord| -> TrainingResult<()> {
                    user.progress.start_slide(slide_id, at);
                    Ok(())
                }),
            )
            .await?;
        Ok(record.progress)
    }

    pub async fn end_slide(
        &self,
        identity: &Identity,
        slide_id: SlideId,
        at: DateTime<Utc>,
    ) -> TrainingResult<ProgressState> {
        let record = self
            .users
            .modify_user(
                identity,
                Box::new(move |user: &mut UserRecord| user.progress.end_slide(&slide_id, at)),
            )
            .await?;
        Ok(record.progress)
    }

    /// Completes the training. Repeating it keeps the first `completed_at`.
    pub async fn finish(&self, identity: &Identity, at: DateTime<Utc>) -> TrainingResult<ProgressState> {
        let record = self
            .users
            .modify_user(
                identity,
                Box::new(move |user: &mut UserRecord| -> TrainingResult<()> {
                    user.progress.finish(at);
                    Ok(())
                }),
            )
            .await?;
        Ok(record.progress)
    }

    pub async fn get_progress(&self, identity: &Identity) -> TrainingResult<ProgressState> {
        Ok(self.users.get_user(identity).await?.progress)
    }

    pub async fn report(&self, identity: &Identity) -> TrainingResult<ProgressReport> {
        let user = self.users.get_user(identity).await?;
        Ok(ProgressReport {
            completed_slides: user.progress.completed_slides(),
            total_time_minutes: user.progress.total_time_minutes(),
            status: user.progress.status(),
            login_count: user.login_count,
            progress: user.progress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrainingError;
    use crate::memory::InMemoryUserStore;
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn slide(id: &str) -> SlideId {
        SlideId::new(id).unwrap()
    }

    async fn tracker_with_user(email: &str) -> (ProgressTracker, Identity) {
        let store = Arc::new(InMemoryUserStore::new());
        let identity = Identity::parse(email).unwrap();
        store.record_login(&identity, None, t(0)).await.unwrap();
        (ProgressTracker::new(store), identity)
    }

    #[tokio::test]
    async fn start_end_scenario() {
        let (tracker, u1) = tracker_with_user("u1@example.com").await;
        tracker.start_slide(&u1, slide("s1"), t(0)).await.unwrap();
        tracker.end_slide(&u1, slide("s1"), t(5)).await.unwrap();

        let progress = tracker.get_progress(&u1).await.unwrap();
        assert_eq!(progress.slides[&slide("s1")].duration(), Some(Duration::seconds(5)));
        assert!(!progress.completed);
    }

    #[tokio::test]
    async fn rejected_end_leaves_stored_state_unchanged() {
        let (tracker, u1) = tracker_with_user("u1@example.com").await;
        tracker.start_slide(&u1, slide("s1"), t(0)).await.unwrap();
        let before = tracker.get_progress(&u1).await.unwrap();

        let err = tracker.end_slide(&u1, slide("s2"), t(1)).await.unwrap_err();
        assert_eq!(err, TrainingError::NoOpenVisit(slide("s2")));
        assert_eq!(tracker.get_progress(&u1).await.unwrap(), before);
    }

    #[tokio::test]
    async fn earlier_re_end_is_rejected_and_not_applied() {
        let (tracker, u1) = tracker_with_user("u1@example.com").await;
        tracker.start_slide(&u1, slide("s1"), t(0)).await.unwrap();
        tracker.end_slide(&u1, slide("s1"), t(10)).await.unwrap();

        let err = tracker.end_slide(&u1, slide("s1"), t(4)).await.unwrap_err();
        assert!(matches!(err, TrainingError::InvalidOrdering { .. }));
        let progress = tracker.get_progress(&u1).await.unwrap();
        assert_eq!(progress.slides[&slide("s1")].ended_at, Some(t(10)));
    }

    #[tokio::test]
    async fn finish_twice_reports_original_time() {
        let (tracker, u1) = tracker_with_user("u1@example.com").await;
        let first = tracker.finish(&u1, t(30)).await.unwrap();
        let second = tracker.finish(&u1, t(60)).await.unwrap();

        assert_eq!(first.completed_at, Some(t(30)));
        assert_eq!(second.completed_at, Some(t(30)));
        assert!(second.completed);
    }

    #[tokio::test]
    async fn completed_user_can_keep_visiting_slides() {
        let (tracker, u1) = tracker_with_user("u1@example.com").await;
        tracker.finish(&u1, t(1)).await.unwrap();
        let progress = tracker.start_slide(&u1, slide("s9"), t(2)).await.unwrap();
        assert!(progress.completed);
        assert!(progress.slides[&slide("s9")].is_open());
    }

    #[tokio::test]
    async fn report_includes_login_count_and_totals() {
        let (tracker, u1) = tracker_with_user("u1@example.com").await;
        tracker.start_slide(&u1, slide("1"), t(0)).await.unwrap();
        tracker.end_slide(&u1, slide("1"), t(120)).await.unwrap();

        let report = tracker.report(&u1).await.unwrap();
        assert_eq!(report.login_count, 1);
        assert_eq!(report.completed_slides, 1);
        assert!((report.total_time_minutes - 2.0).abs() < f64::EPSILON);
        assert_eq!(report.status, TrainingStatus::InProgress);
    }

    #[tokio::test]
    async fn revisiting_a_slide_never_lowers_the_report() {
        let (tracker, u1) = tracker_with_user("u1@example.com").await;
        tracker.start_slide(&u1, slide("1"), t(0)).await.unwrap();
        tracker.end_slide(&u1, slide("1"), t(300)).await.unwrap();
        let before = tracker.report(&u1).await.unwrap();

        tracker.start_slide(&u1, slide("1"), t(400)).await.unwrap();
        let after = tracker.report(&u1).await.unwrap();

        assert_eq!(before.completed_slides, 1);
        assert_eq!(after.completed_slides, 1);
        assert!((after.total_time_minutes - 5.0).abs() < f64::EPSILON);
        assert!(after.progress.slides[&slide("1")].is_open());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_finish_settles_on_one_completion_time() {
        let (tracker, u1) = tracker_with_user("u1@example.com").await;

        let handles: Vec<_> = (1..=16i64)
            .map(|i| {
                let tracker = tracker.clone();
                let identity = u1.clone();
                tokio::spawn(async move { tracker.finish(&identity, t(i)).await })
            })
            .collect();
        let mut reported = Vec::new();
        for handle in handles {
            reported.push(handle.await.unwrap().unwrap().completed_at);
        }

        let stored = tracker.get_progress(&u1).await.unwrap().completed_at;
        assert!(stored.is_some());
        assert!(reported.iter().all(|at| *at == stored));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_end_retries_keep_the_latest_accepted_end() {
        let (tracker, u1) = tracker_with_user("u1@example.com").await;
        tracker.start_slide(&u1, slide("s1"), t(0)).await.unwrap();

        let handles: Vec<_> = (1..=16i64)
            .map(|i| {
                let tracker = tracker.clone();
                let identity = u1.clone();
                tokio::spawn(async move {
                    tracker
                        .end_slide(&identity, slide("s1"), t(i))
                        .await
                        .map(|_| t(i))
                })
            })
            .collect();
        let mut accepted = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(at) => accepted.push(at),
                Err(e) => assert!(matches!(e, TrainingError::InvalidOrdering { .. }), "{e}"),
            }
        }

        let progress = tracker.get_progress(&u1).await.unwrap();
        let visit = &progress.slides[&slide("s1")];
        assert_eq!(visit.ended_at, accepted.iter().max().copied());
        assert_eq!(visit.ended_at, Some(t(16)));
        assert!(visit.ended_at >= visit.started_at);
        // Accepted extensions telescope to the full visit length.
        assert_eq!(progress.total_time_ms, 16_000);
        assert_eq!(progress.completed_slides(), 1);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let tracker = ProgressTracker::new(Arc::new(InMemoryUserStore::new()));
        let ghost = Identity::parse("ghost@example.com").unwrap();
        let err = tracker.start_slide(&ghost, slide("1"), t(0)).await.unwrap_err();
        assert!(matches!(err, TrainingError::UserNotFound(_)));
    }
}
