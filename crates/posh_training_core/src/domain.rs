//! crates/posh_training_core/src/domain.rs
//!
//! Defines the core data structures of the training backend and the pure state
//! transitions on them. Nothing here knows about storage or transport.

use crate::error::{TrainingError, TrainingResult};
use crate::validation;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

//=========================================================================================
// Identifiers
//=========================================================================================

/// An authorized, normalized email address. The key for all per-user state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Parses and normalizes a raw email address.
    pub fn parse(raw: &str) -> TrainingResult<Self> {
        validation::normalize_email(raw).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The display-safe form used in public listings.
    pub fn masked(&self) -> String {
        validation::mask_email(&self.0)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque slide identifier. Numeric slide numbers travel as their decimal text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlideId(String);

impl SlideId {
    /// Returns `None` for blank input.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//=========================================================================================
// Authorization
//=========================================================================================

/// One allow-listed email, with the display name the administrator recorded for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationEntry {
    pub email: Identity,
    pub name: Option<String>,
}

//=========================================================================================
// Progress
//=========================================================================================

/// The current visit of one slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideVisit {
    pub slide_id: SlideId,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl SlideVisit {
    /// `ended_at - started_at`, once both are known.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Started but not yet ended.
    pub fn is_open(&self) -> bool {
        self.started_at.is_some() && self.ended_at.is_none()
    }
}

/// Coarse training status reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStatus {
    InProgress,
    Completed,
}

/// Per-user slide visits plus the monotonic completion flag.
///
/// `closed_slides` and `total_time_ms` accumulate across visits, so reopening
/// a slide never lowers the reported figures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    #[serde(default)]
    pub slides: BTreeMap<SlideId, SlideVisit>,
    #[serde(default)]
    pub current_slide: Option<SlideId>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Every slide that has been ended at least once.
    #[serde(default)]
    pub closed_slides: BTreeSet<SlideId>,
    /// Sum of all recorded visit time, including visits since reopened.
    #[serde(default)]
    pub total_time_ms: i64,
}

impl ProgressState {
    /// Opens (or reopens) the visit for `slide_id`, discarding any earlier end time.
    pub fn start_slide(&mut self, slide_id: SlideId, at: DateTime<Utc>) {
        self.current_slide = Some(slide_id.clone());
        self.slides.insert(
            slide_id.clone(),
            SlideVisit {
                slide_id,
                started_at: Some(at),
                ended_at: None,
            },
        );
    }

    /// Closes the visit for `slide_id` at `at`, or moves an existing end forward.
    ///
    /// On rejection the state is left untouched.
    pub fn end_slide(&mut self, slide_id: &SlideId, at: DateTime<Utc>) -> TrainingResult<()> {
        let visit = self
            .slides
            .get_mut(slide_id)
            .ok_or_else(|| TrainingError::NoOpenVisit(slide_id.clone()))?;
        let started_at = visit
            .started_at
            .ok_or_else(|| TrainingError::NoOpenVisit(slide_id.clone()))?;

        // A recorded end is itself a lower bound: durations never shrink.
        let bound = visit.ended_at.map_or(started_at, |ended| ended.max(started_at));
        if at < bound {
            return Err(TrainingError::InvalidOrdering {
                slide_id: slide_id.clone(),
                at,
                bound,
            });
        }
        visit.ended_at = Some(at);
        self.total_time_ms = self
            .total_time_ms
            .saturating_add((at - bound).num_milliseconds());
        self.closed_slides.insert(slide_id.clone());
        Ok(())
    }

    /// Marks the training completed. Returns the (possibly earlier) completion time.
    pub fn finish(&mut self, at: DateTime<Utc>) -> DateTime<Utc> {
        if let (true, Some(completed_at)) = (self.completed, self.completed_at) {
            return completed_at;
        }
        self.completed = true;
        *self.completed_at.get_or_insert(at)
    }

    pub fn status(&self) -> TrainingStatus {
        if self.completed {
            TrainingStatus::Completed
        } else {
            TrainingStatus::InProgress
        }
    }

    /// Number of distinct slides ever ended. Never decreases.
    pub fn completed_slides(&self) -> usize {
        self.closed_slides.len()
    }

    /// Total recorded visit time in minutes. Never decreases.
    pub fn total_time_minutes(&self) -> f64 {
        self.total_time_ms as f64 / 60_000.0
    }
}

//=========================================================================================
// Quiz
//=========================================================================================

/// The best quiz result of one user, plus how many attempts it took.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizRecord {
    pub score: u32,
    pub max_score: u32,
    pub submitted_at: DateTime<Utc>,
    pub attempt_count: u32,
}

impl QuizRecord {
    /// Validates a first submission.
    pub fn first(score: i64, max_score: i64, at: DateTime<Utc>) -> TrainingResult<Self> {
        let (score, max_score) = validation::check_score(score, max_score)?;
        Ok(Self {
            score,
            max_score,
            submitted_at: at,
            attempt_count: 1,
        })
    }

    /// Counts another attempt, keeping the best score.
    ///
    /// A tie replaces the stored submission time.
    pub fn record_attempt(&mut self, score: i64, max_score: i64, at: DateTime<Utc>) -> TrainingResult<()> {
        let (score_value, max_value) = validation::check_score(score, max_score)?;
        if max_value != self.max_score {
            return Err(TrainingError::InvalidScore { score, max_score });
        }
        self.attempt_count = self.attempt_count.saturating_add(1);
        if score_value >= self.score {
            self.score = score_value;
            self.submitted_at = at;
        }
        Ok(())
    }
}

/// One row of the leaderboard. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub identity: String,
    pub name: Option<String>,
    pub score: u32,
    pub max_score: u32,
    pub submitted_at: DateTime<Utc>,
}

/// A quiz record together with its owner, as returned by a full scan of the store.
#[derive(Debug, Clone)]
pub struct QuizStanding {
    pub identity: Identity,
    pub name: Option<String>,
    pub record: QuizRecord,
}

//=========================================================================================
// The per-user document
//=========================================================================================

/// Everything persisted for one identity.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: Uuid,
    pub identity: Identity,
    pub name: Option<String>,
    pub login_count: u32,
    pub created_at: DateTime<Utc>,
    pub progress: ProgressState,
    pub quiz: Option<QuizRecord>,
}

impl UserRecord {
    /// A fresh document, created at the first successful login.
    pub fn new(identity: Identity, name: Option<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity,
            name,
            login_count: 0,
            created_at: at,
            progress: ProgressState::default(),
            quiz: None,
        }
    }
}
