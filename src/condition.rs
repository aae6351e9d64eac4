// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition matching for Kubernetes resources.
//!
//! Kubernetes conditions follow a standard format:
//! - `type`: The aspect of the resource being reported (e.g., "Succeeded", "Progressing")
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the condition changed
//!
//! A [`ConditionTarget`] describes the condition a test is waiting for. Any field
//! left unset (or set to the empty string) is a wildcard; every populated field
//! must equal the live condition's field exactly. Live conditions are scanned in
//! order and the first match wins.
//!
//! # Example
//!
//! ```rust
//! use ranwait::condition::{create_condition, matches_any, ConditionTarget};
//!
//! let live = vec![
//!     create_condition("Progressing", "False", "Completed", "All clusters are compliant"),
//!     create_condition("Succeeded", "True", "Completed", "All clusters are compliant"),
//! ];
//!
//! let target = ConditionTarget::of_type("Succeeded").with_status("True");
//! assert!(matches_any(&live, &target));
//! ```

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A live condition as reported in a resource's `status.conditions`.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (e.g., Succeeded, Progressing, Validated).
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    #[serde(default)]
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl Condition {
    /// Parsed `lastTransitionTime`, if present and valid RFC3339.
    #[must_use]
    pub fn transition_time(&self) -> Option<DateTime<Utc>> {
        self.last_transition_time
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc))
    }

    /// Returns `true` if the condition last transitioned strictly after `instant`.
    ///
    /// A missing or unparseable timestamp never counts as "after".
    #[must_use]
    pub fn transitioned_after(&self, instant: DateTime<Utc>) -> bool {
        self.transition_time().is_some_and(|t| t > instant)
    }
}

/// Create a new condition with the current timestamp.
///
/// # Example
///
/// ```rust
/// # use ranwait::condition::create_condition;
/// let condition = create_condition("Succeeded", "True", "Completed", "Upgrade finished");
/// assert_eq!(condition.r#type, "Succeeded");
/// assert_eq!(condition.status, "True");
/// ```
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// The condition a caller is waiting for.
///
/// Unset or empty fields match anything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConditionTarget {
    condition_type: Option<String>,
    status: Option<String>,
    reason: Option<String>,
    message: Option<String>,
}

impl ConditionTarget {
    /// Target a condition type; other fields start as wildcards.
    #[must_use]
    pub fn of_type(condition_type: impl Into<String>) -> Self {
        Self {
            condition_type: Some(condition_type.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Returns `true` if no field is populated.
    ///
    /// A wildcard target matches the first live condition of any non-empty list,
    /// which is never what a caller means.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        [
            &self.condition_type,
            &self.status,
            &self.reason,
            &self.message,
        ]
        .iter()
        .all(|field| populated(field).is_none())
    }

    /// Returns `true` if every populated field equals the live condition's field.
    #[must_use]
    pub fn matches(&self, live: &Condition) -> bool {
        field_matches(&self.condition_type, &live.r#type)
            && field_matches(&self.status, &live.status)
            && field_matches(&self.reason, live.reason.as_deref().unwrap_or_default())
            && field_matches(&self.message, live.message.as_deref().unwrap_or_default())
    }
}

impl fmt::Display for ConditionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |field: &Option<String>| populated(field).unwrap_or("*").to_string();
        write!(
            f,
            "condition type={} status={} reason={} message={}",
            show(&self.condition_type),
            show(&self.status),
            show(&self.reason),
            show(&self.message)
        )
    }
}

fn populated(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

fn field_matches(target: &Option<String>, live: &str) -> bool {
    populated(target).is_none_or(|wanted| wanted == live)
}

/// Return the first live condition matching `target`, in iteration order.
#[must_use]
pub fn find_matching<'a>(live: &'a [Condition], target: &ConditionTarget) -> Option<&'a Condition> {
    live.iter().find(|condition| target.matches(condition))
}

/// Returns `true` if any live condition matches `target`.
#[must_use]
pub fn matches_any(live: &[Condition], target: &ConditionTarget) -> bool {
    find_matching(live, target).is_some()
}

/// Find a condition by type in a list of conditions.
///
/// # Example
///
/// ```rust
/// # use ranwait::condition::{create_condition, find_condition};
/// let conditions = vec![create_condition("Validated", "True", "Completed", "ok")];
/// assert!(find_condition(&conditions, "Validated").is_some());
/// assert!(find_condition(&conditions, "Succeeded").is_none());
/// ```
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Extract `status.conditions` from a serialized resource.
///
/// Missing (or null) status or conditions yields an empty list; the controller
/// may not have reported yet.
///
/// # Errors
///
/// Returns an error if `status.conditions` is present but is not a list, or if
/// any entry is not a condition.
pub fn conditions_from_value(resource: &serde_json::Value) -> anyhow::Result<Vec<Condition>> {
    let conditions = match resource.pointer("/status/conditions") {
        None | Some(serde_json::Value::Null) => return Ok(Vec::new()),
        Some(conditions) => conditions,
    };

    let Some(entries) = conditions.as_array() else {
        bail!("malformed status.conditions: expected a list, got {conditions}");
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            Condition::deserialize(entry)
                .with_context(|| format!("malformed status.conditions[{index}]: {entry}"))
        })
        .collect()
}
