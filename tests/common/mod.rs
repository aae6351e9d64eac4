// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, PostParams};
use kube::client::Client;
use ranwait::clients::ClusterClients;
use ranwait::config::RanConfig;
use ranwait::errors::is_not_found;
use std::collections::BTreeMap;

/// Build the suite clients, or skip the test if no cluster is reachable
pub async fn get_clients_or_skip() -> Option<ClusterClients> {
    ranwait::logging::init_logging();

    let config = match RanConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Skipping integration test: invalid suite configuration: {e}");
            return None;
        }
    };

    match ClusterClients::from_config(&config).await {
        Ok(clients) => Some(clients),
        Err(e) => {
            eprintln!("Skipping integration test: no reachable cluster: {e:#}");
            None
        }
    }
}

/// Create a test namespace
pub async fn create_test_namespace(client: &Client, name: &str) -> Result<(), kube::Error> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    let mut labels = BTreeMap::new();
    labels.insert("test".to_string(), "integration".to_string());
    labels.insert("managed-by".to_string(), "ranwait-test".to_string());

    let ns = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        ..Default::default()
    };

    match namespaces.create(&PostParams::default(), &ns).await {
        Ok(_) => {
            println!("Created test namespace: {name}");
            Ok(())
        }
        Err(kube::Error::Api(ae)) if ae.code == 409 => {
            println!("Test namespace already exists: {name}");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Delete a test namespace without waiting for it to go away
pub async fn cleanup_test_namespace(client: &Client, name: &str) -> Result<(), kube::Error> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    match namespaces.delete(name, &DeleteParams::default()).await {
        Ok(_) => {
            println!("Deleted test namespace: {name}");
            Ok(())
        }
        Err(e) if is_not_found(&e) => {
            println!("Test namespace already deleted: {name}");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
