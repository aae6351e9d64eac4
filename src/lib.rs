// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # ranwait - wait and retry primitives for RAN end-to-end suites
//!
//! Suites exercising Telco RAN deployments on OpenShift spend most of their time
//! waiting: for a `ClusterGroupUpgrade` to report `Succeeded`, for policies to turn
//! compliant, for a node to come back after a reboot. This library provides the
//! primitives those waits are built from.
//!
//! ## Modules
//!
//! - [`poll`] - Generic poll-until-satisfied loop with interval, deadline and cancellation
//! - [`condition`] - Status condition model and wildcard matching
//! - [`retry`] - Retry-on-transient and retry-on-conflict wrappers
//! - [`wait`] - Waiters over live Kubernetes objects
//! - [`exec`] - Command execution in cluster containers with retries
//! - [`resources`] - Catalogue of RAN custom resource kinds
//! - [`config`] - Suite configuration from YAML and environment
//! - [`clients`] - Clients for spoke and hub clusters
//! - [`errors`] - Error types and transient/fatal classification
//! - [`logging`] - Tracing subscriber setup
//!
//! ## Example
//!
//! ```rust,no_run
//! use ranwait::clients::ClusterClients;
//! use ranwait::condition::ConditionTarget;
//! use ranwait::constants::{CGU_CONDITION_SUCCEEDED, CONDITION_STATUS_TRUE};
//! use ranwait::config::RanConfig;
//! use ranwait::resources::{dynamic_api, RanKind};
//! use ranwait::wait::{wait_for_condition, NotFoundPolicy};
//!
//! # async fn example() -> anyhow::Result<()> {
//! ranwait::logging::init_logging();
//!
//! let config = RanConfig::load()?;
//! let clients = ClusterClients::from_config(&config).await?;
//! let cgus = dynamic_api(clients.require_hub()?.clone(), RanKind::ClusterGroupUpgrade, Some("ztp-install"));
//!
//! let succeeded = ConditionTarget::of_type(CGU_CONDITION_SUCCEEDED).with_status(CONDITION_STATUS_TRUE);
//! wait_for_condition(&cgus, "cgu-upgrade", &succeeded, NotFoundPolicy::Fatal, &config.poll_config()?).await?;
//! # Ok(())
//! # }
//! ```

pub mod clients;
pub mod condition;
pub mod config;
pub mod constants;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod poll;
pub mod resources;
pub mod retry;
pub mod wait;

#[cfg(test)]
mod config_tests;
#[cfg(test)]
mod wait_tests;
