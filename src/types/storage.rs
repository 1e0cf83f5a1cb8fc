// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// A storage cluster managed by the operator
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[kube(group = "storage.stevedore.io", version = "v1alpha1", kind = "StorageCluster")]
#[kube(namespaced)]
#[serde(rename_all = "camelCase")]
pub struct StorageClusterSpec {
    /// Storage technology backing this cluster, e.g. "glusterfs"
    pub storage_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
}

/// A node contributing devices to a storage cluster
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[kube(group = "storage.stevedore.io", version = "v1alpha1", kind = "StorageNode")]
#[kube(namespaced)]
#[serde(rename_all = "camelCase")]
pub struct StorageNodeSpec {
    /// Name of the StorageCluster this node belongs to
    pub cluster: String,
    /// Kubernetes node the storage lives on
    pub node_name: String,
    #[serde(default)]
    pub devices: Vec<String>,
}

/// Health report published for a storage cluster
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[kube(
    group = "storage.stevedore.io",
    version = "v1alpha1",
    kind = "StorageStatus",
    plural = "storagestatuses"
)]
#[kube(namespaced)]
#[serde(rename_all = "camelCase")]
pub struct StorageStatusSpec {
    pub cluster: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
