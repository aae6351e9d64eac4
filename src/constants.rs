// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the RAN condition waiters.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Polling Defaults
// ============================================================================

/// Default interval between probe invocations (seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Default deadline for a wait (seconds)
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 300;

/// Default number of attempts for transient-error retries
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default fixed delay between transient-error retries (seconds)
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 10;

// ============================================================================
// Transient Error Classification
// ============================================================================

/// Message fragments that mark an untyped error as infrastructure noise.
pub const TRANSIENT_ERROR_SUBSTRINGS: &[&str] = &[
    "error executing command in container",
    "container not found",
];

// ============================================================================
// Condition Values
// ============================================================================

/// Condition status: the condition holds
pub const CONDITION_STATUS_TRUE: &str = "True";

/// Condition status: the condition does not hold
pub const CONDITION_STATUS_FALSE: &str = "False";

// ClusterGroupUpgrade condition types

/// The upgrade passed validation
pub const CGU_CONDITION_VALIDATED: &str = "Validated";

/// Remediation is in progress
pub const CGU_CONDITION_PROGRESSING: &str = "Progressing";

/// Remediation completed
pub const CGU_CONDITION_SUCCEEDED: &str = "Succeeded";

// ClusterGroupUpgrade condition reasons

/// Every cluster was remediated
pub const CGU_REASON_COMPLETED: &str = "Completed";

/// Remediation is running
pub const CGU_REASON_IN_PROGRESS: &str = "InProgress";

/// The upgrade hit its timeout
pub const CGU_REASON_TIMED_OUT: &str = "TimedOut";

// ============================================================================
// Policy Compliance
// ============================================================================

/// `status.compliant` value of a compliant policy
pub const POLICY_COMPLIANT: &str = "Compliant";

/// `status.compliant` value of a non-compliant policy
pub const POLICY_NON_COMPLIANT: &str = "NonCompliant";

// ============================================================================
// Environment Variables
// ============================================================================

/// Path to a YAML configuration file
pub const ENV_CONFIG_FILE: &str = "RAN_CONFIG_FILE";

/// Hub cluster kubeconfig path
pub const ENV_HUB_KUBECONFIG: &str = "RAN_HUB_KUBECONFIG";

/// First spoke kubeconfig path
pub const ENV_SPOKE1_KUBECONFIG: &str = "RAN_SPOKE1_KUBECONFIG";

/// Second spoke kubeconfig path
pub const ENV_SPOKE2_KUBECONFIG: &str = "RAN_SPOKE2_KUBECONFIG";

/// Standard kubeconfig variable, fallback for the first spoke
pub const ENV_KUBECONFIG: &str = "KUBECONFIG";

/// Poll interval override (seconds)
pub const ENV_POLL_INTERVAL_SECS: &str = "RAN_POLL_INTERVAL_SECS";

/// Default timeout override (seconds)
pub const ENV_DEFAULT_TIMEOUT_SECS: &str = "RAN_DEFAULT_TIMEOUT_SECS";

/// Retry attempts override
pub const ENV_RETRY_ATTEMPTS: &str = "RAN_RETRY_ATTEMPTS";

/// Retry interval override (seconds)
pub const ENV_RETRY_INTERVAL_SECS: &str = "RAN_RETRY_INTERVAL_SECS";

/// Log output format (`json` or `text`)
pub const ENV_LOG_FORMAT: &str = "RUST_LOG_FORMAT";
