// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes clients for the clusters a RAN suite talks to.
//!
//! A suite always has a first spoke. The second spoke and the hub are optional and
//! only built when a kubeconfig for them is configured.

use crate::config::RanConfig;
use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Connect timeout applied to every cluster client
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Read timeout applied to every cluster client
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Clients for the spokes and the hub.
#[derive(Clone)]
pub struct ClusterClients {
    pub spoke1: Client,
    pub spoke2: Option<Client>,
    pub hub: Option<Client>,
}

impl ClusterClients {
    /// Build clients from suite configuration.
    ///
    /// The first spoke uses the ambient configuration (in-cluster or `~/.kube/config`)
    /// when no kubeconfig is set for it.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured kubeconfig cannot be loaded.
    pub async fn from_config(config: &RanConfig) -> Result<Self> {
        let spoke1 = match &config.spoke1_kubeconfig {
            Some(path) => client_from_kubeconfig(path)
                .await
                .context("failed to build spoke1 client")?,
            None => {
                debug!("No spoke1 kubeconfig set, using default client configuration");
                Client::try_default()
                    .await
                    .context("failed to build default spoke1 client")?
            }
        };

        let spoke2 = optional_client(config.spoke2_kubeconfig.as_deref(), "spoke2").await?;
        let hub = optional_client(config.hub_kubeconfig.as_deref(), "hub").await?;

        info!(
            spoke2 = spoke2.is_some(),
            hub = hub.is_some(),
            "Cluster clients initialized"
        );

        Ok(Self { spoke1, spoke2, hub })
    }

    /// The hub client, or an error naming the missing configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no hub kubeconfig was configured.
    pub fn require_hub(&self) -> Result<&Client> {
        self.hub
            .as_ref()
            .context("hub client required but RAN_HUB_KUBECONFIG is not set")
    }

    /// The second spoke client, or an error naming the missing configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no spoke2 kubeconfig was configured.
    pub fn require_spoke2(&self) -> Result<&Client> {
        self.spoke2
            .as_ref()
            .context("spoke2 client required but RAN_SPOKE2_KUBECONFIG is not set")
    }
}

async fn optional_client(path: Option<&Path>, cluster: &str) -> Result<Option<Client>> {
    match path {
        Some(path) => client_from_kubeconfig(path)
            .await
            .with_context(|| format!("failed to build {cluster} client"))
            .map(Some),
        None => Ok(None),
    }
}

/// Build a client from a kubeconfig file, using its current context.
///
/// # Errors
///
/// Returns an error if the file cannot be read or describes no usable cluster.
pub async fn client_from_kubeconfig(path: &Path) -> Result<Client> {
    debug!(path = %path.display(), "Loading kubeconfig");

    let kubeconfig = Kubeconfig::read_from(path)
        .with_context(|| format!("failed to read kubeconfig {}", path.display()))?;

    let mut config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .with_context(|| format!("failed to load kubeconfig {}", path.display()))?;
    config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
    config.read_timeout = Some(DEFAULT_READ_TIMEOUT);

    Client::try_from(config).context("failed to create Kubernetes client")
}
