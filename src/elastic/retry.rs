//! Bounded retry with fixed backoff
//!
//! Only [`ElasticError::Transport`] is worth retrying; everything else is
//! deterministic and fails the same way on the next attempt. The backoff is
//! a flat pause between attempts, and the final failure is handed back
//! unchanged so callers can still classify it.

use super::error::ElasticError;
use log::warn;
use std::future::Future;
use std::time::Duration;

/// Attempt bound and pause applied to every store call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// Build a policy.
    ///
    /// # Errors
    /// Rejects `max_attempts == 0`: a policy that never tries can only
    /// fail, and silently bumping it to 1 would hide the misconfiguration.
    pub fn try_new(max_attempts: u32, backoff: Duration) -> Result<Self, ElasticError> {
        match max_attempts {
            0 => Err(ElasticError::Config(
                "retry max_attempts must be at least 1".into(),
            )),
            _ => Ok(Self {
                max_attempts,
                backoff,
            }),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Run `operation` until it succeeds or fails non-retryably, giving up
    /// once the attempt budget is spent. Sleeps only between attempts, never
    /// after the last one.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, ElasticError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ElasticError>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transport() && attempt < self.max_attempts => {
                    warn!(
                        "Attempt {}/{} failed ({}), retrying in {:?}",
                        attempt, self.max_attempts, error, self.backoff
                    );
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io;

    fn transport_error() -> ElasticError {
        ElasticError::transport(io::Error::other("connection reset"))
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let result = RetryPolicy::try_new(0, Duration::ZERO);
        assert!(matches!(result, Err(ElasticError::Config(_))));
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let policy = RetryPolicy::try_new(3, Duration::ZERO).unwrap();
        let attempts = Cell::new(0u32);

        let result: Result<u32, ElasticError> = policy
            .run(|| {
                attempts.set(attempts.get() + 1);
                async { Ok(7) }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.get(), 1);
    }

    #[tokio::test]
    async fn test_transport_errors_retried_up_to_bound() {
        let policy = RetryPolicy::try_new(3, Duration::ZERO).unwrap();
        let attempts = Cell::new(0u32);

        let result: Result<u32, ElasticError> = policy
            .run(|| {
                attempts.set(attempts.get() + 1);
                async { Err(transport_error()) }
            })
            .await;

        assert_eq!(attempts.get(), 3);
        assert!(result.unwrap_err().is_transport());
    }

    #[tokio::test]
    async fn test_recovery_mid_budget_stops_retrying() {
        let policy = RetryPolicy::try_new(5, Duration::ZERO).unwrap();
        let attempts = Cell::new(0u32);

        let result: Result<u32, ElasticError> = policy
            .run(|| {
                attempts.set(attempts.get() + 1);
                let failing = attempts.get() < 3;
                async move {
                    match failing {
                        true => Err(transport_error()),
                        false => Ok(42),
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.get(), 3);
    }

    #[tokio::test]
    async fn test_non_transport_errors_fail_fast() {
        let policy = RetryPolicy::try_new(5, Duration::ZERO).unwrap();
        let attempts = Cell::new(0u32);

        let result: Result<u32, ElasticError> = policy
            .run(|| {
                attempts.set(attempts.get() + 1);
                async {
                    Err(ElasticError::SessionExpired {
                        reason: "search_context_missing_exception".into(),
                    })
                }
            })
            .await;

        assert_eq!(attempts.get(), 1);
        assert!(result.unwrap_err().is_session_expired());
    }
}
