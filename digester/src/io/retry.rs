//! Bounded retry around a single Messages API call.
//!
//! Rate limits and server errors are retried after a staged backoff; every
//! other failure, and the last attempt's failure, propagate unchanged. No
//! state survives between calls.

use std::time::Duration;

use tracing::warn;

use crate::io::client::{CallError, MessageRequest, MessageResponse, MessagesClient};
use crate::io::config::RetryConfig;

/// Blocking wait used for pacing and backoff.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeper that blocks the current thread.
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Wait before retry `n` (1-indexed) is `backoff[n - 1]`; the last stage repeats.
    pub backoff: Vec<Duration>,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff: config
                .backoff_secs
                .iter()
                .copied()
                .map(Duration::from_secs)
                .collect(),
        }
    }

    /// Wait after the failed `attempt` (1-indexed).
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let index = attempt.saturating_sub(1) as usize;
        self.backoff
            .get(index)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or_default()
    }
}

/// Issue `request`, retrying transient failures per `policy`.
pub fn call_with_retries<C, S>(
    client: &C,
    sleeper: &S,
    policy: &RetryPolicy,
    request: &MessageRequest,
) -> Result<MessageResponse, CallError>
where
    C: MessagesClient + ?Sized,
    S: Sleeper + ?Sized,
{
    let mut attempt = 1;
    loop {
        match client.create_message(request) {
            Ok(response) => return Ok(response),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                let wait = policy.backoff_after(attempt);
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    wait_secs = wait.as_secs(),
                    error = %err,
                    "transient failure, retrying"
                );
                sleeper.sleep(wait);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
