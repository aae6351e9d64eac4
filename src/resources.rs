// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Catalogue of the custom resources RAN suites wait on.
//!
//! The controllers behind these kinds (TALM, siteconfig-operator, metal3, ACM,
//! O-RAN O2IMS) are external; the suite only reads and patches their objects.
//! Each kind is addressed through `Api<DynamicObject>` so the crate needs no
//! generated types for them.

use kube::api::{Api, DynamicObject};
use kube::core::{ApiResource, GroupVersionKind};
use kube::Client;
use std::fmt;

/// A custom resource kind exercised by RAN end-to-end suites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RanKind {
    /// TALM upgrade/backup/precache orchestration
    ClusterGroupUpgrade,
    /// TALM precache configuration
    PreCachingConfig,
    /// Lifecycle-agent image-based upgrades driven across a group of clusters
    ImageBasedGroupUpgrade,
    /// ACM governance policy
    Policy,
    /// ACM managed cluster (cluster-scoped)
    ManagedCluster,
    /// metal3 bare-metal host
    BareMetalHost,
    /// siteconfig-operator cluster installation
    ClusterInstance,
    /// O-RAN provisioning request (cluster-scoped)
    ProvisioningRequest,
}

impl RanKind {
    /// Every kind in the catalogue.
    pub const ALL: [RanKind; 8] = [
        RanKind::ClusterGroupUpgrade,
        RanKind::PreCachingConfig,
        RanKind::ImageBasedGroupUpgrade,
        RanKind::Policy,
        RanKind::ManagedCluster,
        RanKind::BareMetalHost,
        RanKind::ClusterInstance,
        RanKind::ProvisioningRequest,
    ];

    fn coordinates(self) -> (&'static str, &'static str, &'static str, &'static str) {
        match self {
            Self::ClusterGroupUpgrade => (
                "ran.openshift.io",
                "v1alpha1",
                "ClusterGroupUpgrade",
                "clustergroupupgrades",
            ),
            Self::PreCachingConfig => (
                "ran.openshift.io",
                "v1alpha1",
                "PreCachingConfig",
                "precachingconfigs",
            ),
            Self::ImageBasedGroupUpgrade => (
                "lcm.openshift.io",
                "v1alpha1",
                "ImageBasedGroupUpgrade",
                "imagebasedgroupupgrades",
            ),
            Self::Policy => (
                "policy.open-cluster-management.io",
                "v1",
                "Policy",
                "policies",
            ),
            Self::ManagedCluster => (
                "cluster.open-cluster-management.io",
                "v1",
                "ManagedCluster",
                "managedclusters",
            ),
            Self::BareMetalHost => ("metal3.io", "v1alpha1", "BareMetalHost", "baremetalhosts"),
            Self::ClusterInstance => (
                "siteconfig.open-cluster-management.io",
                "v1alpha1",
                "ClusterInstance",
                "clusterinstances",
            ),
            Self::ProvisioningRequest => (
                "clcm.openshift.io",
                "v1alpha1",
                "ProvisioningRequest",
                "provisioningrequests",
            ),
        }
    }

    /// Group/version/kind/plural for building dynamic APIs.
    #[must_use]
    pub fn api_resource(self) -> ApiResource {
        let (group, version, kind, plural) = self.coordinates();
        ApiResource::from_gvk_with_plural(&GroupVersionKind::gvk(group, version, kind), plural)
    }

    #[must_use]
    pub fn is_namespaced(self) -> bool {
        !matches!(self, Self::ManagedCluster | Self::ProvisioningRequest)
    }
}

impl fmt::Display for RanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.coordinates().2)
    }
}

/// Build an `Api<DynamicObject>` for a catalogue kind.
///
/// Cluster-scoped kinds ignore `namespace`. A namespaced kind with no namespace
/// gets an all-namespaces API (list/watch only).
#[must_use]
pub fn dynamic_api(client: Client, kind: RanKind, namespace: Option<&str>) -> Api<DynamicObject> {
    let resource = kind.api_resource();
    match namespace {
        Some(ns) if kind.is_namespaced() => Api::namespaced_with(client, ns, &resource),
        _ => Api::all_with(client, &resource),
    }
}
