//! Composable call wrappers: bounded retry and the shared mutation gate.

use crate::config::RetryConfig;
use gatesync_core::GatewayError;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Errors that can tell a transient failure from a permanent one
pub trait Retryable {
    /// Whether another attempt may succeed
    fn is_retryable(&self) -> bool;

    /// Whether the failure was a rate-limit response
    fn is_rate_limited(&self) -> bool {
        false
    }

    /// Server-requested delay before the next attempt
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl Retryable for GatewayError {
    fn is_retryable(&self) -> bool {
        GatewayError::is_retryable(self)
    }

    fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        GatewayError::retry_after(self)
    }
}

/// Run `call` until it succeeds, fails permanently, or retries run out.
///
/// Backoff is exponential per [`RetryConfig::backoff_for`]; a server-provided
/// `Retry-After` takes precedence, capped at `max_backoff`.
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    operation: &str,
    mut call: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(operation, attempts = attempt + 1, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                let allowed =
                    err.is_retryable() && (config.retry_on_rate_limit || !err.is_rate_limited());
                if !allowed || attempt >= config.max_retries {
                    return Err(err);
                }
                let delay = err
                    .retry_after()
                    .map_or_else(|| config.backoff_for(attempt), |d| d.min(config.max_backoff));
                attempt += 1;
                warn!(
                    operation,
                    attempt,
                    max_retries = config.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Shared gate allowing at most one call per interval.
///
/// Callers block until the gate opens; nothing is ever rejected. A zero
/// interval disables throttling.
pub struct RateGate {
    limiter: Option<DefaultDirectRateLimiter>,
    interval: Duration,
}

impl std::fmt::Debug for RateGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateGate")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl RateGate {
    /// Gate admitting one call per `interval`
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            limiter: Quota::with_period(interval).map(RateLimiter::direct),
            interval,
        }
    }

    /// Gate that never waits
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Configured spacing between calls
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next call is allowed
    pub async fn until_ready(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

/// Run `call` once the gate admits it
pub async fn with_rate_limit<T, Fut>(gate: &RateGate, call: Fut) -> T
where
    Fut: Future<Output = T>,
{
    gate.until_ready().await;
    call.await
}
