//! Retry utilities with exponential backoff for transient API failures.

use http::StatusCode;
use std::time::Duration;
use tokio::time::sleep;

use crate::resters::ResterError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Set the maximum number of attempts (at least one)
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Retry immediately without sleeping
    pub fn without_delay(mut self) -> Self {
        self.initial_delay = Duration::ZERO;
        self.max_delay = Duration::ZERO;
        self
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()).max(0.0))
    }
}

/// Transient errors that should trigger a retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientError {
    /// Network connectivity issues
    Network,
    /// Request timeout
    Timeout,
    /// Too many requests (429)
    TooManyRequests,
    /// Service unavailable (503)
    ServiceUnavailable,
    /// Gateway timeout (504)
    GatewayTimeout,
    /// Any other server error (5xx)
    ServerError,
}

impl TransientError {
    /// Classify an HTTP status
    pub fn from_status(status: StatusCode) -> Option<Self> {
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Some(TransientError::TooManyRequests);
        }
        if status == StatusCode::SERVICE_UNAVAILABLE {
            return Some(TransientError::ServiceUnavailable);
        }
        if status == StatusCode::GATEWAY_TIMEOUT {
            return Some(TransientError::GatewayTimeout);
        }
        if status.is_server_error() {
            return Some(TransientError::ServerError);
        }
        None
    }

    /// Check if a ResterError represents a transient error
    pub fn from_rester_error(err: &ResterError) -> Option<Self> {
        match err {
            ResterError::TransientServer {
                status: Some(status),
                ..
            } => StatusCode::from_u16(*status)
                .ok()
                .and_then(Self::from_status)
                .or(Some(TransientError::ServerError)),
            ResterError::TransientServer { timeout: true, .. } => Some(TransientError::Timeout),
            ResterError::TransientServer { .. } => Some(TransientError::Network),
            _ => None,
        }
    }
}

/// Result of a retry operation
#[derive(Debug)]
pub enum RetryResult<T> {
    /// Operation succeeded
    Success(T),
    /// Operation failed with a transient error on every attempt
    TransientFailure(ResterError, TransientError, u32),
    /// Operation failed with a permanent error
    PermanentFailure(ResterError),
}

/// Execute an async operation, retrying transient failures, and report how it
/// ended.
pub async fn with_retry_detailed<T, F, Fut>(config: RetryConfig, mut operation: F) -> RetryResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ResterError>>,
{
    let mut attempts = 0;

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    tracing::info!(
                        "Operation succeeded on attempt {} after {} transient failures",
                        attempts,
                        attempts - 1
                    );
                }
                return RetryResult::Success(result);
            }
            Err(error) => {
                let Some(transient) = TransientError::from_rester_error(&error) else {
                    return RetryResult::PermanentFailure(error);
                };

                if attempts >= config.max_attempts {
                    tracing::warn!(
                        "Operation failed after {} attempts: {}",
                        attempts,
                        error
                    );
                    return RetryResult::TransientFailure(error, transient, attempts);
                }

                let delay = config.delay_after(attempts);
                tracing::debug!(
                    "Transient error on attempt {}: {:?}, retrying in {:?}",
                    attempts,
                    transient,
                    delay
                );

                if !delay.is_zero() {
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Execute an async operation with retry logic, returning the last error once
/// retries are exhausted.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, operation: F) -> Result<T, ResterError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ResterError>>,
{
    match with_retry_detailed(config, operation).await {
        RetryResult::Success(value) => Ok(value),
        RetryResult::TransientFailure(error, _, _) | RetryResult::PermanentFailure(error) => {
            Err(error)
        }
    }
}
