//! crates/posh_training_core/src/validation.rs
//!
//! Small shared helpers: email normalization, display masking and score bounds.

use crate::error::{TrainingError, TrainingResult};
use regex::Regex;
use std::sync::OnceLock;

const EMAIL_PATTERN: &str = r"^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$";

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex"))
}

/// Trims and lower-cases an email, then checks its shape.
///
/// The allow-list and the user documents are both keyed by the returned form,
/// so two spellings differing only by letter case map to the same identity.
pub fn normalize_email(raw: &str) -> TrainingResult<String> {
    let normalized = raw.trim().to_lowercase();
    if email_regex().is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(TrainingError::InvalidEmail(raw.to_string()))
    }
}

/// Masks the local part of an email for public listings: `alice@x.org` -> `a***@x.org`.
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{first}***@{domain}")
        }
        None => "***".to_string(),
    }
}

/// Checks `0 <= score <= max_score` and narrows both to the stored width.
pub fn check_score(score: i64, max_score: i64) -> TrainingResult<(u32, u32)> {
    let invalid = || TrainingError::InvalidScore { score, max_score };
    let max = u32::try_from(max_score).map_err(|_| invalid())?;
    let value = u32::try_from(score).map_err(|_| invalid())?;
    if value > max {
        return Err(invalid());
    }
    Ok((value, max))
}

/// Checks a leaderboard limit is positive.
pub fn check_limit(limit: i64) -> TrainingResult<usize> {
    if limit <= 0 {
        return Err(TrainingError::InvalidLimit(limit));
    }
    usize::try_from(limit).map_err(|_| TrainingError::InvalidLimit(limit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(
            normalize_email("  Alice.Smith@Example.COM ").unwrap(),
            "alice.smith@example.com"
        );
    }

    #[test]
    fn rejects_malformed_emails() {
        for raw in ["", "alice", "alice@", "@example.com", "alice@example", "a b@example.com"] {
            assert!(
                matches!(normalize_email(raw), Err(TrainingError::InvalidEmail(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn masks_local_part() {
        assert_eq!(mask_email("alice@example.com"), "a***@example.com");
        assert_eq!(mask_email("not-an-email"), "***");
    }

    #[test]
    fn score_bounds() {
        assert_eq!(check_score(0, 10).unwrap(), (0, 10));
        assert_eq!(check_score(10, 10).unwrap(), (10, 10));
        assert!(matches!(check_score(11, 10), Err(TrainingError::InvalidScore { .. })));
        assert!(matches!(check_score(-1, 10), Err(TrainingError::InvalidScore { .. })));
        assert!(matches!(check_score(0, -1), Err(TrainingError::InvalidScore { .. })));
    }

    #[test]
    fn limit_must_be_positive() {
        assert_eq!(check_limit(3).unwrap(), 3);
        assert!(matches!(check_limit(0), Err(TrainingError::InvalidLimit(0))));
        assert!(matches!(check_limit(-5), Err(TrainingError::InvalidLimit(-5))));
    }
}
