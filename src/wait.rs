// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Waiters that poll live Kubernetes objects.
//!
//! Every waiter here is a thin probe around [`crate::poll::poll_until`]: it fetches
//! the current object (or list), decides whether the caller's expectation holds,
//! and hands the poller a [`ProbeResult`]. The waiters are generic over the
//! resource type, so they serve typed resources (`Api<Node>`) and the RAN custom
//! resources addressed through `Api<DynamicObject>` alike.
//!
//! # Error policy inside probes
//!
//! - Transient API errors (429, 5xx, connection failures) keep the poll going;
//!   the API server is eventually consistent and may briefly be unavailable.
//! - Any other API error ends the wait immediately.
//! - A missing object is governed by [`NotFoundPolicy`], chosen per call site.

use crate::condition::{conditions_from_value, find_matching, ConditionTarget};
use crate::constants::POLICY_COMPLIANT;
use crate::errors::{Classify, RetryError, WaitError};
use crate::poll::{poll_until, PollConfig, ProbeResult};
use crate::retry::retry_on_conflict;
use kube::api::{Api, ListParams, PostParams};
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info, warn};

/// What a waiter does when the object it polls does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotFoundPolicy {
    /// The object may not have been created yet; keep polling.
    #[default]
    Pending,
    /// The object must already exist; fail immediately.
    Fatal,
}

/// Fetch one object, mapping errors onto probe semantics.
///
/// Returns `Ok(None)` when the probe should report "not yet".
async fn fetch<K>(api: &Api<K>, name: &str, not_found: NotFoundPolicy) -> anyhow::Result<Option<K>>
where
    K: Resource + Clone + Debug + DeserializeOwned,
{
    match api.get_opt(name).await {
        Ok(Some(obj)) => Ok(Some(obj)),
        Ok(None) => match not_found {
            NotFoundPolicy::Pending => {
                debug!(name, "Object not found yet");
                Ok(None)
            }
            NotFoundPolicy::Fatal => Err(anyhow::anyhow!("{name} not found")),
        },
        Err(e) if e.class().is_transient() => {
            warn!(name, error = %e, "Transient error fetching object, will poll again");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Wait until the named object satisfies `predicate`, returning the object.
///
/// # Errors
///
/// - [`WaitError::Timeout`] if the predicate never held
/// - [`WaitError::Probe`] on a non-transient API error, or a missing object under
///   [`NotFoundPolicy::Fatal`]
pub async fn wait_for_object<K, P>(
    api: &Api<K>,
    name: &str,
    not_found: NotFoundPolicy,
    config: &PollConfig,
    predicate: P,
) -> Result<K, WaitError>
where
    K: Resource + Clone + Debug + DeserializeOwned,
    P: Fn(&K) -> bool,
{
    let predicate = &predicate;
    let what = format!("{name} to reach the expected state");

    poll_until(config, &what, move || async move {
        Ok(fetch(api, name, not_found)
            .await?
            .filter(|obj| predicate(obj))
            .into())
    })
    .await
}

/// Wait until the named object reports a condition matching `target`.
///
/// # Arguments
///
/// * `api` - API for the object's kind and namespace
/// * `name` - Object name
/// * `target` - The condition to wait for; unset fields are wildcards
/// * `not_found` - Whether a missing object keeps the wait going
/// * `config` - Interval and deadline
///
/// # Returns
///
/// The object as it was when the condition matched.
///
/// # Errors
///
/// - [`WaitError::InvalidTarget`] if `target` has no populated field
/// - [`WaitError::Probe`] if the object's `status.conditions` is malformed
/// - as [`wait_for_object`] otherwise
///
/// # Example
///
/// ```rust,no_run
/// use ranwait::condition::ConditionTarget;
/// use ranwait::constants::{CGU_CONDITION_SUCCEEDED, CONDITION_STATUS_TRUE};
/// use ranwait::poll::PollConfig;
/// use ranwait::resources::{dynamic_api, RanKind};
/// use ranwait::wait::{wait_for_condition, NotFoundPolicy};
/// use std::time::Duration;
///
/// # async fn example(client: kube::Client) -> anyhow::Result<()> {
/// let cgus = dynamic_api(client, RanKind::ClusterGroupUpgrade, Some("ztp-install"));
/// let succeeded = ConditionTarget::of_type(CGU_CONDITION_SUCCEEDED).with_status(CONDITION_STATUS_TRUE);
/// let config = PollConfig::new(Duration::from_secs(10), Duration::from_secs(1800))?;
///
/// wait_for_condition(&cgus, "cgu-upgrade", &succeeded, NotFoundPolicy::Fatal, &config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn wait_for_condition<K>(
    api: &Api<K>,
    name: &str,
    target: &ConditionTarget,
    not_found: NotFoundPolicy,
    config: &PollConfig,
) -> Result<K, WaitError>
where
    K: Resource + Clone + Debug + DeserializeOwned + Serialize,
{
    if target.is_wildcard() {
        return Err(WaitError::InvalidTarget(format!(
            "condition target for {name} has no populated field"
        )));
    }

    let what = format!("{name} to report {target}");

    let found = poll_until(config, &what, move || async move {
        let Some(obj) = fetch(api, name, not_found).await? else {
            return Ok(ProbeResult::Pending);
        };

        let conditions = conditions_from_value(&serde_json::to_value(&obj)?)?;
        Ok(match find_matching(&conditions, target) {
            Some(matched) => {
                debug!(
                    name,
                    condition = %matched.r#type,
                    status = %matched.status,
                    "Condition matched"
                );
                ProbeResult::Satisfied(obj)
            }
            None => ProbeResult::Pending,
        })
    })
    .await?;

    info!(name, target = %target, "Object reached expected condition");
    Ok(found)
}

/// Wait until the named object no longer exists.
///
/// # Errors
///
/// - [`WaitError::Timeout`] if the object still existed at the deadline
/// - [`WaitError::Probe`] on a non-transient API error
pub async fn wait_until_deleted<K>(api: &Api<K>, name: &str, config: &PollConfig) -> Result<(), WaitError>
where
    K: Resource + Clone + Debug + DeserializeOwned,
{
    let what = format!("{name} to be deleted");

    poll_until(config, &what, move || async move {
        match api.get_opt(name).await {
            Ok(None) => Ok(ProbeResult::Satisfied(())),
            Ok(Some(_)) => Ok(ProbeResult::Pending),
            Err(e) if e.class().is_transient() => {
                warn!(name, error = %e, "Transient error checking deletion, will poll again");
                Ok(ProbeResult::Pending)
            }
            Err(e) => Err(e.into()),
        }
    })
    .await
}

/// Wait until exactly `expected` listed objects satisfy `predicate`.
///
/// # Returns
///
/// The matching objects from the final listing.
///
/// # Errors
///
/// - [`WaitError::Timeout`] if the count never matched
/// - [`WaitError::Probe`] on a non-transient API error
pub async fn wait_for_count<K, P>(
    api: &Api<K>,
    params: &ListParams,
    expected: usize,
    config: &PollConfig,
    predicate: P,
) -> Result<Vec<K>, WaitError>
where
    K: Resource + Clone + Debug + DeserializeOwned,
    P: Fn(&K) -> bool,
{
    let predicate = &predicate;
    let what = format!("{expected} matching objects");

    poll_until(config, &what, move || async move {
        let listed = match api.list(params).await {
            Ok(listed) => listed,
            Err(e) if e.class().is_transient() => {
                warn!(error = %e, "Transient error listing objects, will poll again");
                return Ok(ProbeResult::Pending);
            }
            Err(e) => return Err(e.into()),
        };

        let matching: Vec<K> = listed.items.into_iter().filter(|obj| predicate(obj)).collect();
        debug!(found = matching.len(), expected, "Counted matching objects");

        Ok(if matching.len() == expected {
            ProbeResult::Satisfied(matching)
        } else {
            ProbeResult::Pending
        })
    })
    .await
}

/// Returns `true` if a governance policy reports `status.compliant == "Compliant"`.
///
/// # Errors
///
/// Returns an error if the policy cannot be serialized.
pub fn is_compliant<K: Serialize>(policy: &K) -> anyhow::Result<bool> {
    let value = serde_json::to_value(policy)?;
    Ok(value
        .pointer("/status/compliant")
        .and_then(serde_json::Value::as_str)
        == Some(POLICY_COMPLIANT))
}

/// Wait until every named policy is compliant.
///
/// Policies that do not exist yet count as not compliant, since the hub may not
/// have propagated them.
///
/// # Errors
///
/// - [`WaitError::Timeout`] if any policy was still non-compliant at the deadline
/// - [`WaitError::Probe`] on a non-transient API error
pub async fn wait_until_compliant<K>(api: &Api<K>, names: &[&str], config: &PollConfig) -> Result<(), WaitError>
where
    K: Resource + Clone + Debug + DeserializeOwned + Serialize,
{
    let what = format!("policies {names:?} to be compliant");

    poll_until(config, &what, move || async move {
        let fetched = futures::future::try_join_all(
            names
                .iter()
                .map(|name| fetch(api, name, NotFoundPolicy::Pending)),
        )
        .await?;

        for (name, policy) in names.iter().zip(&fetched) {
            let compliant = match policy {
                Some(policy) => is_compliant(policy)?,
                None => false,
            };
            if !compliant {
                debug!(policy = name, "Policy not compliant yet");
                return Ok(ProbeResult::Pending);
            }
        }

        Ok(ProbeResult::Satisfied(()))
    })
    .await
}

/// Apply `mutate` to the latest copy of an object, retrying on update conflicts.
///
/// Each attempt re-reads the object so the change lands on the current
/// `resourceVersion`; controllers such as TALM write status concurrently.
///
/// # Errors
///
/// - [`RetryError::Permanent`] for a non-conflict API error
/// - [`RetryError::Exhausted`] if every attempt conflicted
pub async fn update_with_conflict_retry<K, M>(
    api: &Api<K>,
    name: &str,
    mutate: M,
) -> Result<K, RetryError<kube::Error>>
where
    K: Resource + Clone + Debug + DeserializeOwned + Serialize,
    M: Fn(&mut K),
{
    let mutate = &mutate;
    let operation = format!("update {name}");

    retry_on_conflict(&operation, move || async move {
        let mut obj = api.get(name).await?;
        mutate(&mut obj);
        api.replace(name, &PostParams::default(), &obj).await
    })
    .await
}
