// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry wrappers for operations that fail with transient infrastructure errors.
//!
//! Three flavours are provided:
//!
//! - [`retry_on_transient`] - bounded attempts with a fixed delay, for operations such
//!   as executing a command inside a node container where "container not found"
//!   during a restart is noise, but a wrong command output is a real failure
//! - [`retry_on_conflict`] - optimistic-concurrency updates, retried on HTTP 409 only,
//!   bounded by [`conflict_backoff`]
//! - [`retry_api_call`] - Kubernetes reads retried on 429/5xx/connection errors with
//!   exponential backoff, failing fast on everything else
//!
//! Non-transient errors are always returned immediately and unchanged.

use crate::constants::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_INTERVAL_SECS};
use crate::errors::{is_conflict, Classify, ConfigError, RetryError};
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Maximum total time to spend retrying Kubernetes reads (5 minutes)
const MAX_ELAPSED_TIME_SECS: u64 = 300;

/// Initial retry interval (100ms)
const INITIAL_INTERVAL_MILLIS: u64 = 100;

/// Maximum interval between retries (30 seconds)
const MAX_INTERVAL_SECS: u64 = 30;

/// Backoff multiplier (exponential growth factor)
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Randomization factor to prevent thundering herd (±10%)
const RANDOMIZATION_FACTOR: f64 = 0.1;

/// Conflict retry interval (10ms)
const CONFLICT_INTERVAL_MILLIS: u64 = 10;

/// Conflict retries after the first attempt (5 attempts total)
const CONFLICT_MAX_RETRIES: u32 = 4;

/// Bounded retry count with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    interval: Duration,
}

impl RetryPolicy {
    /// Create a retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `max_attempts` is zero.
    pub fn new(max_attempts: u32, interval: Duration) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry attempts must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            interval,
        })
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
        }
    }
}

/// Simple exponential backoff implementation.
///
/// Provides exponential backoff with randomization (jitter) to prevent thundering herd.
pub struct ExponentialBackoff {
    current_interval: Duration,
    initial_interval: Duration,
    max_interval: Duration,
    max_elapsed_time: Option<Duration>,
    max_retries: Option<u32>,
    multiplier: f64,
    randomization_factor: f64,
    retries: u32,
    start_time: Instant,
}

impl ExponentialBackoff {
    fn new(
        initial_interval: Duration,
        max_interval: Duration,
        max_elapsed_time: Option<Duration>,
        max_retries: Option<u32>,
        multiplier: f64,
        randomization_factor: f64,
    ) -> Self {
        Self {
            current_interval: initial_interval,
            initial_interval,
            max_interval,
            max_elapsed_time,
            max_retries,
            multiplier,
            randomization_factor,
            retries: 0,
            start_time: Instant::now(),
        }
    }

    /// Interval the next call to [`Self::next_backoff`] is based on
    #[must_use]
    pub fn current_interval(&self) -> Duration {
        self.current_interval
    }

    #[must_use]
    pub fn initial_interval(&self) -> Duration {
        self.initial_interval
    }

    /// Cap on a single interval
    #[must_use]
    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    /// Total time after which no further interval is handed out
    #[must_use]
    pub fn max_elapsed_time(&self) -> Option<Duration> {
        self.max_elapsed_time
    }

    /// Number of intervals handed out before giving up
    #[must_use]
    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    /// Growth factor applied after each interval (2.0 doubles)
    #[must_use]
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Jitter applied to each interval (0.1 is ±10%)
    #[must_use]
    pub fn randomization_factor(&self) -> f64 {
        self.randomization_factor
    }

    /// Get the next backoff interval, or None once retries are exhausted.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if let Some(max_elapsed) = self.max_elapsed_time {
            if self.start_time.elapsed() >= max_elapsed {
                return None;
            }
        }

        if let Some(max_retries) = self.max_retries {
            if self.retries >= max_retries {
                return None;
            }
        }
        self.retries += 1;

        let interval = self.current_interval;
        let jittered = self.apply_jitter(interval);

        let next = interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(next).min(self.max_interval);

        Some(jittered)
    }

    fn apply_jitter(&self, interval: Duration) -> Duration {
        if self.randomization_factor == 0.0 {
            return interval;
        }

        let secs = interval.as_secs_f64();
        let delta = secs * self.randomization_factor;
        let min = secs - delta;
        let max = secs + delta;

        let mut rng = rand::thread_rng();
        let jittered = rng.gen_range(min..=max);

        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Create default exponential backoff configuration for Kubernetes API retries.
///
/// # Configuration
///
/// - **Initial interval**: 100ms
/// - **Max interval**: 30 seconds
/// - **Max elapsed time**: 5 minutes total
/// - **Multiplier**: 2.0 (exponential growth)
/// - **Randomization**: ±10% (prevents thundering herd)
#[must_use]
pub fn default_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(INITIAL_INTERVAL_MILLIS),
        Duration::from_secs(MAX_INTERVAL_SECS),
        Some(Duration::from_secs(MAX_ELAPSED_TIME_SECS)),
        None,
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
    )
}

/// Create the backoff used for optimistic-concurrency conflict retries.
///
/// Conflicts resolve as soon as the caller re-reads the object, so the delay is
/// short and does not grow.
///
/// # Configuration
///
/// - **Interval**: 10ms, constant (multiplier 1.0)
/// - **Attempts**: 5 in total
/// - **Randomization**: ±10%
#[must_use]
pub fn conflict_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(CONFLICT_INTERVAL_MILLIS),
        Duration::from_millis(CONFLICT_INTERVAL_MILLIS),
        None,
        Some(CONFLICT_MAX_RETRIES),
        1.0,
        RANDOMIZATION_FACTOR,
    )
}

/// Retry an operation while its errors are classified transient.
///
/// The operation runs at most `policy.max_attempts()` times, sleeping
/// `policy.interval()` between attempts.
///
/// # Arguments
///
/// * `policy` - Attempt bound and fixed delay
/// * `operation_name` - Human-readable name for logging (e.g., "exec on spoke1")
/// * `is_transient` - Classifier deciding which errors are worth another attempt
/// * `operation` - The fallible operation
///
/// # Errors
///
/// - [`RetryError::Permanent`] with the untouched error if it is not transient
/// - [`RetryError::Exhausted`] if every attempt failed transiently
///
/// # Example
///
/// ```rust,no_run
/// use ranwait::retry::{retry_on_transient, RetryPolicy};
/// use std::time::Duration;
///
/// # async fn example() -> anyhow::Result<()> {
/// let policy = RetryPolicy::new(3, Duration::from_secs(10))?;
/// let output = retry_on_transient(
///     &policy,
///     "read chrony config",
///     |e: &std::io::Error| e.kind() == std::io::ErrorKind::NotFound,
///     || async { Ok::<_, std::io::Error>("server 10.0.0.1 iburst".to_string()) },
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_on_transient<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    operation_name: &str,
    is_transient: C,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        "Operation succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(e) if !is_transient(&e) => {
                debug!(
                    operation = operation_name,
                    attempt = attempt,
                    error = %e,
                    "Non-transient error, failing immediately"
                );
                return Err(RetryError::Permanent(e));
            }
            Err(e) if attempt >= max_attempts => {
                error!(
                    operation = operation_name,
                    attempt = attempt,
                    error = %e,
                    "Ran out of retries"
                );
                return Err(RetryError::Exhausted {
                    operation: operation_name.to_string(),
                    retries: attempt,
                    last: e,
                });
            }
            Err(e) => {
                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    retry_after = ?policy.interval,
                    error = %e,
                    "Transient error, will retry"
                );
                tokio::time::sleep(policy.interval).await;
            }
        }
    }
}

/// [`retry_on_transient`] using the error type's own [`Classify`] implementation.
///
/// # Errors
///
/// As [`retry_on_transient`].
pub async fn retry_classified<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + Display,
{
    retry_on_transient(
        policy,
        operation_name,
        |e: &E| e.class().is_transient(),
        operation,
    )
    .await
}

/// Retry an update while it fails with an optimistic-concurrency conflict.
///
/// The operation should re-read the object on every attempt so that it applies its
/// change on top of the latest `resourceVersion`. Only HTTP 409 is retried; any
/// other error is returned immediately. Retries are bounded by [`conflict_backoff`].
///
/// # Errors
///
/// - [`RetryError::Permanent`] for any non-conflict error
/// - [`RetryError::Exhausted`] if the object stayed contended for every attempt
pub async fn retry_on_conflict<T, F, Fut>(
    operation_name: &str,
    mut operation: F,
) -> Result<T, RetryError<kube::Error>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, kube::Error>>,
{
    let mut backoff = conflict_backoff();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if !is_conflict(&e) => return Err(RetryError::Permanent(e)),
            Err(e) => {
                if let Some(duration) = backoff.next_backoff() {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        retry_after = ?duration,
                        "Conflict updating resource, retrying with fresh copy"
                    );
                    tokio::time::sleep(duration).await;
                } else {
                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        error = %e,
                        "Conflict persisted, giving up"
                    );
                    return Err(RetryError::Exhausted {
                        operation: operation_name.to_string(),
                        retries: attempt,
                        last: e,
                    });
                }
            }
        }
    }
}

/// Retry a Kubernetes API call with exponential backoff.
///
/// Automatically retries on transient errors (HTTP 409, 429, 5xx, connection
/// failures) and fails immediately on permanent errors (other 4xx).
///
/// # Errors
///
/// - [`RetryError::Permanent`] for a non-retryable error
/// - [`RetryError::Exhausted`] once [`default_backoff`] runs out (5 minutes)
///
/// # Example
///
/// ```no_run
/// use kube::{Api, Client};
/// use k8s_openapi::api::core::v1::Node;
/// use ranwait::retry::retry_api_call;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = Client::try_default().await?;
/// let api: Api<Node> = Api::all(client);
///
/// let node = retry_api_call(|| api.get("master-0"), "get node master-0").await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_api_call<T, F, Fut>(
    mut operation: F,
    operation_name: &str,
) -> Result<T, RetryError<kube::Error>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, kube::Error>>,
{
    let mut backoff = default_backoff();
    let start_time = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        "Kubernetes API call succeeded after retries"
                    );
                } else {
                    debug!(operation = operation_name, "Kubernetes API call succeeded");
                }
                return Ok(value);
            }
            Err(e) if !e.class().is_transient() => {
                error!(
                    operation = operation_name,
                    error = %e,
                    "Non-retryable Kubernetes API error, failing immediately"
                );
                return Err(RetryError::Permanent(e));
            }
            Err(e) => {
                if let Some(duration) = backoff.next_backoff() {
                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        retry_after = ?duration,
                        error = %e,
                        "Retryable Kubernetes API error, will retry"
                    );
                    tokio::time::sleep(duration).await;
                } else {
                    error!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        error = %e,
                        "Backoff exhausted, giving up"
                    );
                    return Err(RetryError::Exhausted {
                        operation: operation_name.to_string(),
                        retries: attempt,
                        last: e,
                    });
                }
            }
        }
    }
}
