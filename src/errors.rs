// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for polling, retrying, and remote command execution.
//!
//! This module provides the error taxonomy shared by every waiter in the crate:
//! - [`WaitError`] - a poll loop ended without the condition becoming true
//! - [`RetryError`] - a retried operation either failed permanently or ran out of retries
//! - [`ExecError`] - a command executed inside a cluster container failed
//! - [`ConfigError`] - suite configuration could not be loaded
//!
//! Transient-vs-fatal classification is typed: errors implement [`Classify`] and
//! report an [`ErrorClass`]. String matching is confined to [`classify_message`],
//! used only at the boundary to libraries that surface nothing but a message.

use crate::constants::TRANSIENT_ERROR_SUBSTRINGS;
use std::time::Duration;
use thiserror::Error;

/// Whether an error is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Infrastructure noise: the same call may succeed if repeated.
    Transient,
    /// A real failure: retrying would only mask it.
    Fatal,
}

impl ErrorClass {
    #[must_use]
    pub fn is_transient(self) -> bool {
        self == Self::Transient
    }
}

/// Classification of an error as transient or fatal.
pub trait Classify {
    fn class(&self) -> ErrorClass;
}

impl Classify for kube::Error {
    fn class(&self) -> ErrorClass {
        match self {
            // Optimistic-concurrency conflicts, rate limiting and server errors
            kube::Error::Api(api_err)
                if api_err.code == 409
                    || api_err.code == 429
                    || (api_err.code >= 500 && api_err.code < 600) =>
            {
                ErrorClass::Transient
            }
            // Network/connection errors
            kube::Error::Service(_) => ErrorClass::Transient,
            _ => ErrorClass::Fatal,
        }
    }
}

/// Classify a bare error message by substring.
///
/// Only for errors from libraries that expose nothing better than a message.
#[must_use]
pub fn classify_message(message: &str) -> ErrorClass {
    if TRANSIENT_ERROR_SUBSTRINGS
        .iter()
        .any(|needle| message.contains(needle))
    {
        ErrorClass::Transient
    } else {
        ErrorClass::Fatal
    }
}

/// Returns `true` if a Kubernetes error is an optimistic-concurrency conflict (HTTP 409).
#[must_use]
pub fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(api_err) if api_err.code == 409)
}

/// Returns `true` if a Kubernetes error is HTTP 404.
#[must_use]
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(api_err) if api_err.code == 404)
}

/// Errors returned by the poller and the waiters built on it.
#[derive(Error, Debug)]
pub enum WaitError {
    /// The condition never became true before the deadline.
    #[error("timed out waiting for {what} after {timeout:?} ({attempts} attempts)")]
    Timeout {
        /// What was being waited for
        what: String,
        /// The configured timeout
        timeout: Duration,
        /// Number of probe invocations made
        attempts: u32,
    },

    /// The probe decided the failure was not recoverable.
    #[error("failed while waiting for {what}: {source}")]
    Probe {
        /// What was being waited for
        what: String,
        /// The probe's own error, untouched
        source: anyhow::Error,
    },

    /// The caller cancelled the wait.
    #[error("cancelled waiting for {what} after {attempts} attempts")]
    Cancelled {
        /// What was being waited for
        what: String,
        /// Number of probe invocations made before cancellation
        attempts: u32,
    },

    /// The waiter was asked to match against a target that can never be meaningful.
    #[error("invalid wait target: {0}")]
    InvalidTarget(String),
}

impl WaitError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The probe's error, if the wait ended because of one.
    #[must_use]
    pub fn probe_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Probe { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors returned by the retry wrappers.
#[derive(Error, Debug)]
pub enum RetryError<E> {
    /// Every attempt failed with a transient error.
    #[error("{operation}: ran out of {retries} retries, last error: {last}")]
    Exhausted {
        /// Human-readable operation name
        operation: String,
        /// Number of attempts made
        retries: u32,
        /// Error from the final attempt
        last: E,
    },

    /// The operation failed with a non-transient error and was not retried.
    #[error(transparent)]
    Permanent(E),
}

impl<E> RetryError<E> {
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// The underlying error (the last one, for exhaustion).
    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { last, .. } => last,
            Self::Permanent(e) => e,
        }
    }
}

/// Errors from running a command inside a cluster container.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// The target pod or container does not exist (yet), typically during a restart.
    #[error("container not found: {pod}/{container}")]
    ContainerNotFound {
        /// Pod name
        pod: String,
        /// Container name
        container: String,
    },

    /// The exec stream could not be established or broke mid-command.
    #[error("error executing command in container: {0}")]
    Stream(String),

    /// The API server refused the exec request.
    #[error("exec request rejected: {0}")]
    Rejected(String),

    /// The command ran and reported failure.
    #[error("command {command:?} failed: {message}")]
    CommandFailed {
        /// The command that was run
        command: String,
        /// Failure message and any stderr output
        message: String,
    },
}

impl Classify for ExecError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::ContainerNotFound { .. } | Self::Stream(_) => ErrorClass::Transient,
            Self::Rejected(_) | Self::CommandFailed { .. } => ErrorClass::Fatal,
        }
    }
}

/// Errors loading or validating suite configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path of the file
        path: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for [`crate::config::RanConfig`].
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path of the file
        path: String,
        /// Underlying YAML error
        source: serde_yaml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for environment variable {var}")]
    InvalidEnv {
        /// Variable name
        var: String,
        /// Offending value
        value: String,
    },

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
