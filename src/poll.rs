// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic wait-until-condition primitive.
//!
//! A poller repeatedly invokes a probe on a fixed interval until the probe reports
//! that it is satisfied, the probe fails fatally, or the deadline elapses.
//!
//! - The first invocation happens immediately, with no initial delay.
//! - Between attempts the poller sleeps `min(interval, time remaining)`, so the
//!   final attempt lands on the deadline.
//! - A zero timeout means "try exactly once".
//! - A probe that blocks is never interrupted; the deadline only stops further
//!   attempts from being scheduled.
//!
//! # Example
//!
//! ```rust,no_run
//! use ranwait::poll::{poll_until, PollConfig, ProbeResult};
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = PollConfig::new(Duration::from_secs(5), Duration::from_secs(60))?;
//! let value = poll_until(&config, "answer to be computed", || async {
//!     Ok(ProbeResult::Satisfied(42))
//! })
//! .await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

use crate::constants::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_WAIT_TIMEOUT_SECS};
use crate::errors::{ConfigError, WaitError};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Interval and deadline for one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    interval: Duration,
    timeout: Duration,
}

impl PollConfig {
    /// Create a poll configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `interval` is zero.
    pub fn new(interval: Duration, timeout: Duration) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::Invalid(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self { interval, timeout })
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Same interval, different deadline.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_WAIT_TIMEOUT_SECS),
        }
    }
}

/// Outcome of one successful probe invocation.
///
/// A fatal failure is expressed as the probe returning `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult<T> {
    /// Not yet satisfied; poll again.
    Pending,
    /// Satisfied; stop and hand back the value.
    Satisfied(T),
}

impl<T> From<Option<T>> for ProbeResult<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Pending, Self::Satisfied)
    }
}

/// Poll `probe` until it is satisfied, fails, or `config.timeout()` elapses.
///
/// # Arguments
///
/// * `config` - Interval and deadline
/// * `what` - Human-readable description used in logs and errors (e.g., "CGU to succeed")
/// * `probe` - Closure returning one probe attempt
///
/// # Returns
///
/// The value carried by [`ProbeResult::Satisfied`].
///
/// # Errors
///
/// - [`WaitError::Probe`] with the probe's own error, returned immediately
/// - [`WaitError::Timeout`] if the deadline elapsed first
pub async fn poll_until<T, F, Fut>(config: &PollConfig, what: &str, probe: F) -> Result<T, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<ProbeResult<T>>>,
{
    poll_loop(config, what, None, probe).await
}

/// Like [`poll_until`], but also stops when `cancel` is triggered.
///
/// Cancellation is observed before each attempt and while sleeping between
/// attempts. A probe already running is allowed to finish.
///
/// # Errors
///
/// As [`poll_until`], plus [`WaitError::Cancelled`].
pub async fn poll_until_cancelled<T, F, Fut>(
    config: &PollConfig,
    what: &str,
    cancel: &CancellationToken,
    probe: F,
) -> Result<T, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<ProbeResult<T>>>,
{
    poll_loop(config, what, Some(cancel), probe).await
}

/// Poll a `() -> Result<bool>` probe until it returns `true`.
///
/// # Errors
///
/// As [`poll_until`].
pub async fn poll_until_true<F, Fut>(config: &PollConfig, what: &str, mut probe: F) -> Result<(), WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<bool>>,
{
    poll_loop(config, what, None, || {
        let attempt = probe();
        async move {
            Ok(if attempt.await? {
                ProbeResult::Satisfied(())
            } else {
                ProbeResult::Pending
            })
        }
    })
    .await
}

async fn poll_loop<T, F, Fut>(
    config: &PollConfig,
    what: &str,
    cancel: Option<&CancellationToken>,
    mut probe: F,
) -> Result<T, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<ProbeResult<T>>>,
{
    let start = Instant::now();
    // No representable deadline means wait forever
    let deadline = start.checked_add(config.timeout);
    let mut attempts: u32 = 0;

    loop {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            debug!(what, attempts, "Wait cancelled");
            return Err(WaitError::Cancelled {
                what: what.to_string(),
                attempts,
            });
        }

        attempts += 1;

        match probe().await {
            Ok(ProbeResult::Satisfied(value)) => {
                debug!(
                    what,
                    attempts,
                    elapsed = ?start.elapsed(),
                    "Wait condition satisfied"
                );
                return Ok(value);
            }
            Ok(ProbeResult::Pending) => {}
            Err(source) => {
                warn!(what, attempts, error = %source, "Probe failed, giving up");
                return Err(WaitError::Probe {
                    what: what.to_string(),
                    source,
                });
            }
        }

        let pause = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    warn!(
                        what,
                        attempts,
                        timeout = ?config.timeout,
                        "Timed out waiting for condition"
                    );
                    return Err(WaitError::Timeout {
                        what: what.to_string(),
                        timeout: config.timeout,
                        attempts,
                    });
                }
                config.interval.min(deadline - now)
            }
            None => config.interval,
        };

        debug!(what, attempts, retry_after = ?pause, "Condition not met yet");

        match cancel {
            Some(token) => {
                tokio::select! {
                    () = token.cancelled() => {
                        debug!(what, attempts, "Wait cancelled while sleeping");
                        return Err(WaitError::Cancelled {
                            what: what.to_string(),
                            attempts,
                        });
                    }
                    () = sleep(pause) => {}
                }
            }
            None => sleep(pause).await,
        }
    }
}
