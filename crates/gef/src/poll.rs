//! Exponential-backoff polling for job output locations.
//!
//! GEF answers the output-location query with "not ready" while a job is
//! still running. [`poll_with_backoff`] re-asks with increasing delays until
//! the job settles or the attempt budget runs out. Any other error ends
//! polling immediately.
//!
//! The query is a closure so callers can wrap each attempt (for example in
//! a per-call deadline) without the sleeps counting against it.

use std::future::Future;
use std::time::Duration;

/// Tunable parameters for the polling strategy.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Total number of queries, including the first. `1` disables polling.
    pub max_attempts: u32,
    /// Delay before the second query.
    pub initial_delay: Duration,
    /// Upper bound on the delay between queries.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each not-ready answer.
    pub multiplier: f64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Calculate the next backoff delay from the current delay and policy.
///
/// The result is clamped to [`PollPolicy::max_delay`].
pub fn next_delay(current: Duration, policy: &PollPolicy) -> Duration {
    let next_ms = (current.as_millis() as f64 * policy.multiplier) as u64;
    Duration::from_millis(next_ms).min(policy.max_delay)
}

/// Run `query` until it succeeds, fails with an error `is_pending` rejects,
/// or `max_attempts` queries have been made.
///
/// Returns the last pending error once the budget is spent.
pub async fn poll_with_backoff<T, E, F, Fut>(
    policy: &PollPolicy,
    is_pending: impl Fn(&E) -> bool,
    mut query: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut delay = policy.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match query().await {
            Err(e) if is_pending(&e) && attempt < max_attempts => {
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Job output not ready, polling again",
                );
                tokio::time::sleep(delay).await;
                delay = next_delay(delay, policy);
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use bridgit_core::job::{OutputReference, RemoteJobHandle, ServiceId};
    use bytes::Bytes;

    use crate::api::GefApiError;
    use crate::backend::ExecutionBackend;

    /// Reports "not ready" for the first `ready_after` queries.
    struct SlowJob {
        ready_after: u32,
        queries: AtomicU32,
    }

    #[async_trait]
    impl ExecutionBackend for SlowJob {
        fn address(&self) -> &str {
            "http://slow.test"
        }

        async fn submit_job(
            &self,
            _: &ServiceId,
            _: &str,
            _: &str,
        ) -> Result<RemoteJobHandle, GefApiError> {
            unreachable!("not used by polling")
        }

        async fn resolve_output_location(
            &self,
            _: &str,
            handle: &RemoteJobHandle,
        ) -> Result<OutputReference, GefApiError> {
            let n = self.queries.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.ready_after {
                Err(GefApiError::NotReady {
                    job_id: handle.to_string(),
                })
            } else {
                Ok(OutputReference::new("http://slow.test/out"))
            }
        }

        async fn fetch_output_bytes(&self, _: &str) -> Result<Bytes, GefApiError> {
            unreachable!("not used by polling")
        }
    }

    async fn locate(backend: &SlowJob, policy: &PollPolicy) -> Result<OutputReference, GefApiError> {
        let handle = RemoteJobHandle::new("j-1");
        poll_with_backoff(policy, GefApiError::is_not_ready, || {
            backend.resolve_output_location("tok", &handle)
        })
        .await
    }

    fn fast_policy(max_attempts: u32) -> PollPolicy {
        PollPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            ..Default::default()
        }
    }

    #[test]
    fn next_delay_doubles() {
        let policy = PollPolicy::default();
        assert_eq!(next_delay(Duration::from_secs(1), &policy), Duration::from_secs(2));
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let policy = PollPolicy {
            max_delay: Duration::from_secs(10),
            ..Default::default()
        };
        assert_eq!(next_delay(Duration::from_secs(8), &policy), Duration::from_secs(10));
    }

    #[test]
    fn full_backoff_sequence() {
        let policy = PollPolicy::default();
        let mut delay = policy.initial_delay;
        let expected = [1, 2, 4, 8, 16, 30, 30];

        for &expected_secs in &expected {
            assert_eq!(delay.as_secs(), expected_secs);
            delay = next_delay(delay, &policy);
        }
    }

    #[tokio::test]
    async fn default_policy_queries_once() {
        let backend = SlowJob {
            ready_after: 1,
            queries: AtomicU32::new(0),
        };
        let result = locate(&backend, &PollPolicy::default()).await;

        assert_matches!(result, Err(GefApiError::NotReady { .. }));
        assert_eq!(backend.queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn polls_until_ready() {
        let backend = SlowJob {
            ready_after: 2,
            queries: AtomicU32::new(0),
        };
        let reference = locate(&backend, &fast_policy(5)).await.unwrap();

        assert_eq!(reference.location, "http://slow.test/out");
        assert_eq!(backend.queries.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let backend = SlowJob {
            ready_after: 100,
            queries: AtomicU32::new(0),
        };
        let result = locate(&backend, &fast_policy(3)).await;

        assert_matches!(result, Err(GefApiError::NotReady { .. }));
        assert_eq!(backend.queries.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_errors_end_polling() {
        let queries = AtomicU32::new(0);
        let result: Result<(), GefApiError> =
            poll_with_backoff(&fast_policy(5), GefApiError::is_not_ready, || async {
                queries.fetch_add(1, Ordering::SeqCst);
                Err(GefApiError::MissingOutput {
                    job_id: "j-1".into(),
                })
            })
            .await;

        assert_matches!(result, Err(GefApiError::MissingOutput { .. }));
        assert_eq!(queries.load(Ordering::SeqCst), 1);
    }
}
