//! Retry utilities with pluggable backoff.
//!
//! Branch tasks use a [`BackoffPolicy`] to space out attempts while an
//! upstream artifact is still materializing; the analysis stage uses
//! [`retry_async_notify`] for its single automatic retry.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Delay before a given retry.
pub trait BackoffPolicy: Send + Sync + fmt::Debug {
    /// `retry` is 1 for the first retry.
    fn delay_for_retry(&self, retry: u32) -> Duration;
}

/// Same delay before every retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBackoff {
    pub delay: Duration,
}

impl FixedBackoff {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

impl BackoffPolicy for FixedBackoff {
    fn delay_for_retry(&self, _retry: u32) -> Duration {
        self.delay
    }
}

/// `initial + step * (retry - 1)`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackoff {
    pub initial: Duration,
    pub step: Duration,
    pub max: Duration,
}

impl BackoffPolicy for LinearBackoff {
    fn delay_for_retry(&self, retry: u32) -> Duration {
        let steps = retry.saturating_sub(1);
        self.initial
            .saturating_add(self.step.saturating_mul(steps))
            .min(self.max)
    }
}

/// `base * 2^(retry - 1)`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    pub base: Duration,
    pub max: Duration,
}

impl BackoffPolicy for ExponentialBackoff {
    fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.base.saturating_mul(2u32.pow(exponent)).min(self.max)
    }
}

/// Backoff selector used by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffKind {
    #[default]
    Fixed,
    Linear,
    Exponential,
}

impl BackoffKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Some(Self::Fixed),
            "linear" => Some(Self::Linear),
            "exponential" => Some(Self::Exponential),
            _ => None,
        }
    }

    /// Build a policy whose first delay is `delay`.
    pub fn build(self, delay: Duration) -> Arc<dyn BackoffPolicy> {
        let max = delay.saturating_mul(10);
        match self {
            Self::Fixed => Arc::new(FixedBackoff::new(delay)),
            Self::Linear => Arc::new(LinearBackoff {
                initial: delay,
                step: delay,
                max,
            }),
            Self::Exponential => Arc::new(ExponentialBackoff { base: delay, max }),
        }
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt in
    /// [`retry_async`]. Dependency branches count every `Waiting`
    /// response instead, so for them this is the total number of attempts.
    pub max_retries: u32,
    pub backoff: Arc<dyn BackoffPolicy>,
    /// Operation name for logging.
    pub operation_name: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff: Arc::new(FixedBackoff::default()),
            operation_name: "operation".to_string(),
        }
    }
}

impl RetryConfig {
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, backoff: Arc<dyn BackoffPolicy>) -> Self {
        self.backoff = backoff;
        self
    }

    /// Shorthand for a fixed delay.
    pub fn with_fixed_delay(self, delay: Duration) -> Self {
        self.with_backoff(Arc::new(FixedBackoff::new(delay)))
    }

    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.backoff.delay_for_retry(retry)
    }
}

/// Result of a retry operation.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// Operation succeeded.
    Success(T),
    /// Operation failed after all retries exhausted.
    Failed { error: E, attempts: u32 },
}

impl<T, E> RetryResult<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, RetryResult::Success(_))
    }

    pub fn into_result(self) -> Result<T, (E, u32)> {
        match self {
            RetryResult::Success(v) => Ok(v),
            RetryResult::Failed { error, attempts } => Err((error, attempts)),
        }
    }
}

/// Execute an async operation with retry logic.
pub async fn retry_async<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    retry_async_notify(config, |_| operation(), |_, _, _| {}).await
}

/// Like [`retry_async`], passing the 1-based attempt number to `operation`
/// and calling `on_retry(next_attempt, &error, delay)` before each sleep.
pub async fn retry_async_notify<F, Fut, T, E, N>(
    config: &RetryConfig,
    mut operation: F,
    mut on_retry: N,
) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
    N: FnMut(u32, &E, Duration),
{
    let mut retries = 0u32;

    loop {
        match operation(retries + 1).await {
            Ok(value) => return RetryResult::Success(value),
            Err(e) if retries < config.max_retries => {
                retries += 1;
                let delay = config.delay_for_retry(retries);
                debug!(
                    "{} attempt {} failed, retrying in {:?}: {}",
                    config.operation_name, retries, delay, e
                );
                on_retry(retries + 1, &e, delay);
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return RetryResult::Failed {
                    error: e,
                    attempts: retries + 1,
                }
            }
        }
    }
}
