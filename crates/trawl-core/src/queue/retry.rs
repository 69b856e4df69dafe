//! RetryPolicy - 失敗した attempt を queue に戻すかどうかを決める

use std::fmt;
use std::sync::Arc;

use crate::domain::Task;
use crate::error::TaskError;
use crate::ports::FetchError;

/// Predicate over response status codes.
pub type StatusPredicate = Arc<dyn Fn(u16) -> bool + Send + Sync>;

/// What to do with a failed attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Re-push the same logical task with this many retries left.
    Retry { retries_left: u32 },

    /// Emit a terminal failure.
    GiveUp { reason: String },
}

/// Retry policy for failed fetches.
///
/// Transport errors are retried while the task still has retries left.
/// Status codes are only treated as failures when a status predicate is
/// configured; by default any response that arrives counts as a success.
#[derive(Clone, Default)]
pub struct RetryPolicy {
    retry_status: Option<StatusPredicate>,
}

impl RetryPolicy {
    /// Retry transport failures only.
    pub fn transport_only() -> Self {
        Self::default()
    }

    /// Also retry responses whose status matches `predicate`.
    pub fn retry_on_status<F>(predicate: F) -> Self
    where
        F: Fn(u16) -> bool + Send + Sync + 'static,
    {
        Self {
            retry_status: Some(Arc::new(predicate)),
        }
    }

    /// Also retry 5xx responses.
    pub fn server_errors() -> Self {
        Self::retry_on_status(|status| (500..600).contains(&status))
    }

    /// Turn a response status into a failure if the predicate says so.
    pub fn status_failure(&self, status: u16) -> Option<FetchError> {
        match &self.retry_status {
            Some(predicate) if predicate(status) => Some(FetchError::Status(status)),
            _ => None,
        }
    }

    pub fn decide(&self, task: &Task, error: &TaskError) -> Decision {
        if !error.is_retryable() {
            return Decision::GiveUp {
                reason: error.to_string(),
            };
        }
        match task.retries() {
            0 => Decision::GiveUp {
                reason: error.to_string(),
            },
            n => Decision::Retry { retries_left: n - 1 },
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("retry_status", &self.retry_status.is_some())
            .finish()
    }
}
