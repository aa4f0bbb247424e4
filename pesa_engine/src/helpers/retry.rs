use std::{fmt::Display, future::Future, time::Duration};

use log::*;

/// How often, and how patiently, to retry an operation that fails transiently.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 5, initial_delay: Duration::from_millis(200), max_delay: Duration::from_secs(5) }
    }
}

impl RetryPolicy {
    /// A policy that retries immediately. Handy in tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self { max_attempts, initial_delay: Duration::ZERO, max_delay: Duration::ZERO }
    }

    /// The pause before retry number `attempt` (1-based). Doubles every attempt, up to `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Runs `op` until it succeeds or the policy's attempts are used up, sleeping with exponential backoff in between.
/// The last error is returned if every attempt fails.
pub async fn with_backoff<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt >= max_attempts => {
                error!("🔄️ {label} failed after {attempt} attempts. Giving up. {e}");
                return Err(e);
            },
            Err(e) => {
                let delay = policy.delay_for(attempt);
                warn!("🔄️ {label} failed (attempt {attempt}/{max_attempts}). Retrying in {delay:?}. {e}");
                tokio::time::sleep(delay).await;
                attempt += 1;
            },
        }
    }
}
