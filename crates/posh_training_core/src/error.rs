//! crates/posh_training_core/src/error.rs
//!
//! The error taxonomy for every core operation.

use crate::domain::SlideId;
use crate::ports::PortError;
use chrono::{DateTime, Utc};

/// Every way a core operation can be rejected.
///
/// Client mistakes (`InvalidEmail` through `InvalidLimit`) are never worth a retry.
/// Infrastructure failures arrive wrapped in `Port`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrainingError {
    #[error("Email {0} is not authorized to access the training")]
    NotAuthorized(String),
    #[error("Missing, invalid or expired credential")]
    NotAuthenticated,
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("No user record for {0}")]
    UserNotFound(String),
    #[error("Slide {0} has no visit to end")]
    NoOpenVisit(SlideId),
    #[error("Slide {slide_id} cannot end at {at}: visit bound is {bound}")]
    InvalidOrdering {
        slide_id: SlideId,
        at: DateTime<Utc>,
        bound: DateTime<Utc>,
    },
    #[error("Score {score} is not within 0..={max_score}")]
    InvalidScore { score: i64, max_score: i64 },
    #[error("Leaderboard limit must be positive, got {0}")]
    InvalidLimit(i64),
    #[error(transparent)]
    Port(#[from] PortError),
}

impl TrainingError {
    /// True when the same request may succeed if retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Port(port) if port.is_retryable())
    }
}

/// A convenience type alias for `Result<T, TrainingError>`.
pub type TrainingResult<T> = Result<T, TrainingError>;
