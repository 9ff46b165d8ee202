//! Fixed-delay retry for provisioning steps.

use derive_getters::Getters;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Attempts and delay for a retried step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, derive_new::new)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    attempts: u32,
    /// Delay between attempts.
    delay: Duration,
}

/// Error from the final attempt of a retried step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exhausted<E> {
    /// Attempts made.
    pub attempts: u32,
    /// Error of the last attempt.
    pub last: E,
}

impl RetryPolicy {
    /// Runs `op` until it succeeds or the attempts are used up.
    ///
    /// `op` is called afresh for every attempt, so whatever it fetches is
    /// fetched again.
    pub async fn run<T, E, F, Fut>(&self, step: &'static str, mut op: F) -> Result<T, Exhausted<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => {
                    debug!(step, attempt, "Step succeeded");
                    return Ok(value);
                }
                Err(e) if attempt < attempts => {
                    warn!(step, attempt, error = %e, "Attempt failed, retrying");
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(Exhausted {
                        attempts: attempt,
                        last: e,
                    });
                }
            }
        }
    }
}
