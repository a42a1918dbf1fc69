//! Error types for test generation and remote persistence.
//!
//! `StoreError` is defined in `examkit-core` so the persistence
//! coordinator can classify failures for retry decisions without
//! string matching.

use thiserror::Error;

use crate::model::Tier;

/// Errors raised while assembling a test from the question bank.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    /// A requested tier has no questions at all.
    #[error("tier {0} has no questions")]
    EmptyTier(Tier),

    /// A requested tier cannot supply the required count. A short test
    /// is never produced silently.
    #[error("tier {tier} has only {have} questions, {need} required")]
    InsufficientQuestions {
        tier: Tier,
        need: usize,
        have: usize,
    },
}

/// Errors that can occur when talking to the remote result store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The operation did not complete within the bounded wait.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// Authentication failed (invalid or expired credentials).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The addressed record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The store returned an error response.
    #[error("store error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// A record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Returns `true` if retrying the same operation could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            StoreError::AuthenticationFailed(_)
                | StoreError::NotFound(_)
                | StoreError::Serialization(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(StoreError::Timeout(10).is_retryable());
        assert!(StoreError::Network("reset".into()).is_retryable());
        assert!(!StoreError::AuthenticationFailed("expired".into()).is_retryable());
        assert!(!StoreError::NotFound("history/abc".into()).is_retryable());
    }

    #[test]
    fn generate_error_message_names_tier() {
        let err = GenerateError::InsufficientQuestions {
            tier: Tier::Four,
            need: 8,
            have: 5,
        };
        assert!(err.to_string().contains("tier 4"));
        assert!(err.to_string().contains("5"));
    }
}
