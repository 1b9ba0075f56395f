//! Retry Executor Module
//!
//! Wraps an asynchronous operation with bounded retries and exponential
//! backoff. The executor is an explicit loop over attempts rather than
//! recursion, and is stateless between calls: concurrent executions share
//! nothing.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

// == Retry Executor ==
/// Bounded-retry runner with exponential backoff.
///
/// `max_attempts` is the retry budget: 0 means a single attempt with no
/// retry. The k-th retry waits `base_delay * 2^(k-1)` before re-invoking
/// the operation. The last failure is returned unchanged once the budget
/// is exhausted.
#[derive(Debug, Clone, Copy)]
pub struct RetryExecutor {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryExecutor {
    // == Constructor ==
    /// Creates an executor with the given retry budget and base delay.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    // == Execute ==
    /// Runs the operation, retrying every failure up to the budget.
    pub async fn execute<T, E, F, Fut>(&self, op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_when(op, |_| true).await
    }

    // == Execute When ==
    /// Runs the operation, retrying only failures accepted by
    /// `should_retry`. A rejected failure propagates immediately without
    /// consuming the remaining budget.
    pub async fn execute_when<T, E, F, Fut, P>(&self, mut op: F, should_retry: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let mut retries_used: u32 = 0;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if retries_used >= self.max_attempts || !should_retry(&err) {
                        return Err(err);
                    }

                    let delay = self
                        .base_delay
                        .saturating_mul(2u32.saturating_pow(retries_used));
                    debug!(
                        retry = retries_used + 1,
                        budget = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    retries_used += 1;
                }
            }
        }
    }
}
