// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! ServiceAccount, Deployment and Service for a storage management daemon.

use crate::constants::{annotations, backend, labels, OPERATOR_NAME};
use crate::kubernetes::ReadinessQuery;
use crate::resources::ResourceDescription;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EmptyDirVolumeSource, EnvVar, HTTPGetAction, PodSpec,
    PodTemplateSpec, Probe, Service, ServiceAccount, ServicePort, ServiceSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

/// Everything needed to describe a management daemon
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendSpec {
    pub namespace: String,
    /// Logical name, used for the Deployment, the Service and the role label
    pub name: String,
    /// Storage technology label value, e.g. "glusterfs"
    pub technology: String,
    pub image: String,
    pub port: i32,
    pub replicas: i32,
    pub env: BTreeMap<String, String>,
    /// HTTP path answering readiness and liveness probes
    pub health_path: Option<String>,
    /// Where the daemon keeps its state; backed by an emptyDir volume
    pub data_dir: Option<String>,
}

impl BackendSpec {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        technology: impl Into<String>,
        image: impl Into<String>,
        port: i32,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            technology: technology.into(),
            image: image.into(),
            port,
            replicas: backend::DEFAULT_REPLICAS,
            env: BTreeMap::new(),
            health_path: None,
            data_dir: None,
        }
    }

    /// The GlusterFS management daemon (heketi) with its executor settings
    pub fn glusterfs_management(namespace: impl Into<String>, image: impl Into<String>) -> Self {
        Self::new(
            namespace,
            backend::DEFAULT_NAME,
            "glusterfs",
            image,
            backend::DEFAULT_PORT,
        )
        .with_env("HEKETI_EXECUTOR", "kubernetes")
        .with_env("HEKETI_FSTAB", "/var/lib/heketi/fstab")
        .with_env("HEKETI_SNAPSHOT_LIMIT", "14")
        .with_health_path("/hello")
        .with_data_dir("/var/lib/heketi")
    }

    pub fn with_replicas(mut self, replicas: i32) -> Self {
        self.replicas = replicas;
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    pub fn with_health_path(mut self, path: impl Into<String>) -> Self {
        self.health_path = Some(path.into());
        self
    }

    pub fn with_data_dir(mut self, path: impl Into<String>) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    pub fn service_account_name(&self) -> String {
        format!("{}{}", self.name, backend::SERVICE_ACCOUNT_SUFFIX)
    }

    /// What must hold before the daemon's Service is worth creating
    pub fn readiness_query(&self) -> ReadinessQuery {
        ReadinessQuery::Deployment {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            target_replicas: self.replicas,
        }
    }
}

/// Labels shared by every object of a backend.
///
/// The Deployment selector, its pod template and the Service selector are all
/// taken from this one map, so the Service always routes to the daemon's pods.
pub fn pod_labels(spec: &BackendSpec) -> BTreeMap<String, String> {
    BTreeMap::from([
        (labels::STORAGE.to_string(), spec.technology.clone()),
        (labels::ROLE.to_string(), spec.name.clone()),
        (labels::MANAGED_BY.to_string(), OPERATOR_NAME.to_string()),
    ])
}

fn object_meta(name: String, spec: &BackendSpec, description: Option<&str>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: Some(spec.namespace.clone()),
        labels: Some(pod_labels(spec)),
        annotations: description.map(|d| {
            BTreeMap::from([(annotations::DESCRIPTION.to_string(), d.to_string())])
        }),
        ..Default::default()
    }
}

pub fn service_account(spec: &BackendSpec) -> ServiceAccount {
    ServiceAccount {
        metadata: object_meta(spec.service_account_name(), spec, None),
        ..Default::default()
    }
}

pub fn deployment(spec: &BackendSpec) -> Deployment {
    let labels = pod_labels(spec);

    Deployment {
        metadata: object_meta(
            spec.name.clone(),
            spec,
            Some(&format!("Defines how to deploy {}", spec.name)),
        ),
        spec: Some(DeploymentSpec {
            replicas: Some(spec.replicas),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(pod_spec(spec)),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn pod_spec(spec: &BackendSpec) -> PodSpec {
    let env = spec
        .env
        .iter()
        .map(|(name, value)| EnvVar {
            name: name.clone(),
            value: Some(value.clone()),
            ..Default::default()
        })
        .collect::<Vec<_>>();

    let volume_mounts = spec.data_dir.as_ref().map(|path| {
        vec![VolumeMount {
            name: backend::DATA_VOLUME.to_string(),
            mount_path: path.clone(),
            ..Default::default()
        }]
    });

    let volumes = spec.data_dir.as_ref().map(|_| {
        vec![Volume {
            name: backend::DATA_VOLUME.to_string(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        }]
    });

    PodSpec {
        service_account_name: Some(spec.service_account_name()),
        containers: vec![Container {
            name: spec.name.clone(),
            image: Some(spec.image.clone()),
            image_pull_policy: Some("IfNotPresent".to_string()),
            env: (!env.is_empty()).then_some(env),
            ports: Some(vec![ContainerPort {
                container_port: spec.port,
                ..Default::default()
            }]),
            volume_mounts,
            readiness_probe: spec
                .health_path
                .as_deref()
                .map(|path| http_probe(path, spec.port, 3)),
            liveness_probe: spec
                .health_path
                .as_deref()
                .map(|path| http_probe(path, spec.port, 30)),
            ..Default::default()
        }],
        volumes,
        ..Default::default()
    }
}

fn http_probe(path: &str, port: i32, initial_delay_seconds: i32) -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some(path.to_string()),
            port: IntOrString::Int(port),
            ..Default::default()
        }),
        initial_delay_seconds: Some(initial_delay_seconds),
        timeout_seconds: Some(3),
        ..Default::default()
    }
}

pub fn service(spec: &BackendSpec) -> Service {
    Service {
        metadata: object_meta(
            spec.name.clone(),
            spec,
            Some(&format!("Exposes the {} API", spec.name)),
        ),
        spec: Some(ServiceSpec {
            selector: Some(pod_labels(spec)),
            ports: Some(vec![ServicePort {
                name: Some(spec.name.clone()),
                port: spec.port,
                target_port: Some(IntOrString::Int(spec.port)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            type_: Some("ClusterIP".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// All objects of a backend, in the order they must be created
pub fn backend_descriptions(spec: &BackendSpec) -> [ResourceDescription; 3] {
    [
        service_account(spec).into(),
        deployment(spec).into(),
        service(spec).into(),
    ]
}
