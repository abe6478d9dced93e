//! crates/posh_training_core/src/quiz.rs
//!
//! The Quiz Ledger: best-score-kept quiz records and the leaderboard derived from them.

use crate::domain::{Identity, LeaderboardEntry, QuizRecord, QuizStanding, UserRecord};
use crate::error::{TrainingError, TrainingResult};
use crate::ports::UserRecordStore;
use crate::validation;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct QuizLedger {
    users: Arc<dyn UserRecordStore>,
}

impl QuizLedger {
    pub fn new(users: Arc<dyn UserRecordStore>) -> Self {
        Self { users }
    }

    /// Records one attempt. The visible score only ever goes up.
    pub async fn submit_score(
        &self,
        identity: &Identity,
        score: i64,
        max_score: i64,
        at: DateTime<Utc>,
    ) -> TrainingResult<QuizRecord> {
        // Reject bad input before taking the identity's lock.
        validation::check_score(score, max_score)?;

        let record = self
            .users
            .modify_user(
                identity,
                Box::new(move |user: &mut UserRecord| -> TrainingResult<()> {
                    match user.quiz.as_mut() {
                        Some(existing) => existing.record_attempt(score, max_score, at)?,
                        None => user.quiz = Some(QuizRecord::first(score, max_score, at)?),
                    }
                    Ok(())
                }),
            )
            .await?;

        // modify_user only commits after the closure stored a record.
        record
            .quiz
            .ok_or_else(|| TrainingError::UserNotFound(identity.to_string()))
    }

    /// `None` until the first attempt.
    pub async fn get_score(&self, identity: &Identity) -> TrainingResult<Option<QuizRecord>> {
        Ok(self.users.get_user(identity).await?.quiz)
    }

    pub async fn leaderboard(&self, limit: i64) -> TrainingResult<Vec<LeaderboardEntry>> {
        let limit = validation::check_limit(limit)?;
        let standings = self.users.list_quiz_records().await?;
        Ok(rank(standings, limit))
    }
}

/// Score descending, then first-to-achieve, then identity for a total order.
fn rank(mut standings: Vec<QuizStanding>, limit: usize) -> Vec<LeaderboardEntry> {
    standings.sort_by(|a, b| {
        b.record
            .score
            .cmp(&a.record.score)
            .then(a.record.submitted_at.cmp(&b.record.submitted_at))
            .then_with(|| a.identity.cmp(&b.identity))
    });

    standings
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, standing)| LeaderboardEntry {
            rank: index + 1,
            identity: standing.identity.masked(),
            name: standing.name,
            score: standing.record.score,
            max_score: standing.record.max_score,
            submitted_at: standing.record.submitted_at,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryUserStore;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    async fn ledger_with_users(emails: &[&str]) -> (QuizLedger, Vec<Identity>) {
        let store = Arc::new(InMemoryUserStore::new());
        let mut identities = Vec::new();
        for email in emails {
            let identity = Identity::parse(email).unwrap();
            store.record_login(&identity, None, t(0)).await.unwrap();
            identities.push(identity);
        }
        (QuizLedger::new(store), identities)
    }

    #[tokio::test]
    async fn best_score_kept_over_three_attempts() {
        let (ledger, ids) = ledger_with_users(&["u1@example.com"]).await;
        ledger.submit_score(&ids[0], 7, 10, t(1)).await.unwrap();
        ledger.submit_score(&ids[0], 5, 10, t(2)).await.unwrap();
        ledger.submit_score(&ids[0], 9, 10, t(3)).await.unwrap();

        let record = ledger.get_score(&ids[0]).await.unwrap().unwrap();
        assert_eq!(record.score, 9);
        assert_eq!(record.max_score, 10);
        assert_eq!(record.attempt_count, 3);
    }

    #[tokio::test]
    async fn no_attempt_yet_is_none() {
        let (ledger, ids) = ledger_with_users(&["u1@example.com"]).await;
        assert_eq!(ledger.get_score(&ids[0]).await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalid_score_is_rejected_without_counting() {
        let (ledger, ids) = ledger_with_users(&["u1@example.com"]).await;
        ledger.submit_score(&ids[0], 4, 10, t(1)).await.unwrap();

        let err = ledger.submit_score(&ids[0], 12, 10, t(2)).await.unwrap_err();
        assert_eq!(err, TrainingError::InvalidScore { score: 12, max_score: 10 });
        let record = ledger.get_score(&ids[0]).await.unwrap().unwrap();
        assert_eq!(record.attempt_count, 1);
    }

    #[tokio::test]
    async fn tie_goes_to_earlier_submission() {
        let (ledger, ids) = ledger_with_users(&["late@example.com", "early@example.com"]).await;
        ledger.submit_score(&ids[0], 8, 10, t(2)).await.unwrap();
        ledger.submit_score(&ids[1], 8, 10, t(1)).await.unwrap();

        let board = ledger.leaderboard(1).await.unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].identity, "e***@example.com");
        assert_eq!(board[0].rank, 1);
    }

    #[tokio::test]
    async fn leaderboard_is_sorted_and_truncated() {
        let (ledger, ids) =
            ledger_with_users(&["a@example.com", "b@example.com", "c@example.com", "d@example.com"]).await;
        ledger.submit_score(&ids[0], 3, 10, t(1)).await.unwrap();
        ledger.submit_score(&ids[1], 9, 10, t(2)).await.unwrap();
        ledger.submit_score(&ids[2], 6, 10, t(3)).await.unwrap();
        // d never attempts the quiz.

        let board = ledger.leaderboard(10).await.unwrap();
        let scores: Vec<u32> = board.iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![9, 6, 3]);
        assert_eq!(board.iter().map(|e| e.rank).collect::<Vec<_>>(), vec![1, 2, 3]);

        assert_eq!(ledger.leaderboard(2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn non_positive_limit_is_rejected() {
        let (ledger, _) = ledger_with_users(&[]).await;
        assert_eq!(ledger.leaderboard(0).await.unwrap_err(), TrainingError::InvalidLimit(0));
        assert_eq!(ledger.leaderboard(-1).await.unwrap_err(), TrainingError::InvalidLimit(-1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submissions_count_every_attempt() {
        let (ledger, ids) = ledger_with_users(&["u1@example.com"]).await;
        let identity = ids[0].clone();

        let handles: Vec<_> = (0..32i64)
            .map(|i| {
                let ledger = ledger.clone();
                let identity = identity.clone();
                tokio::spawn(async move { ledger.submit_score(&identity, i % 11, 10, t(i)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let record = ledger.get_score(&identity).await.unwrap().unwrap();
        assert_eq!(record.attempt_count, 32);
        assert_eq!(record.score, 10);
    }
}
