//! Error types for action-semaphore.
//!
//! All errors are strongly typed using thiserror.
//! `WaitError` is what an outcome handle yields when a wait does not
//! resolve; `SemaphoreError` covers the registration surface.

use thiserror::Error;

use crate::action::Action;

/// Validation errors that occur while building match patterns.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid match pattern: {reason}")]
    InvalidPattern {
        reason: String,
    },
}

/// Reasons an outcome handle did not resolve with a matching action.
///
/// `Rejected` is an expected result, not a programming error: it carries the
/// action that satisfied the reject pattern.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WaitError<A: Action> {
    #[error("Wait rejected by action '{}'", .0.action_type())]
    Rejected(A),

    #[error("Wait was cancelled before a matching action arrived")]
    Cancelled,

    #[error("Wait timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Semaphore registry was dropped while the wait was pending")]
    Closed,
}

impl<A: Action> WaitError<A> {
    /// Returns the rejecting action, if this is a rejection.
    #[must_use]
    pub fn rejected_action(&self) -> Option<&A> {
        match self {
            Self::Rejected(action) => Some(action),
            _ => None,
        }
    }

    /// Consumes the error and returns the rejecting action, if any.
    #[must_use]
    pub fn into_rejected_action(self) -> Option<A> {
        match self {
            Self::Rejected(action) => Some(action),
            _ => None,
        }
    }

    /// Returns true if this is a rejection.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Returns true if the wait was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns true if this is a timeout.
    ///
    /// Timeouts leave the waiter registered, so the wait can be retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Top-level error type for action-semaphore.
#[derive(Debug, Error)]
pub enum SemaphoreError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl SemaphoreError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// The underlying validation error, if any.
    #[must_use]
    pub const fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
        }
    }
}

/// Result type alias for registration operations.
pub type SemaphoreResult<T> = Result<T, SemaphoreError>;
