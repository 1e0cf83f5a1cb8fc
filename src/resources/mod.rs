// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Pure builders for the objects the operator submits to the control plane.

pub mod backend;
pub mod custom_types;

pub use backend::{backend_descriptions, deployment, pod_labels, service, service_account, BackendSpec};
pub use custom_types::{
    custom_resource_definition, registration_name, storage_type_descriptors,
    CustomTypeDescriptor, TypeScope,
};

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Service, ServiceAccount};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::Resource as _;
use serde::Serialize;
use std::fmt;

/// An object ready to be created, tagged by kind
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResourceDescription {
    ServiceAccount(ServiceAccount),
    Deployment(Deployment),
    Service(Service),
    CustomType(CustomResourceDefinition),
}

/// The (kind, namespace, name) tuple identifying a described object
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectIdentity {
    pub kind: &'static str,
    pub namespace: Option<String>,
    pub name: String,
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}/{}/{}", self.kind, namespace, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

impl ResourceDescription {
    pub fn identity(&self) -> ObjectIdentity {
        let kind = match self {
            ResourceDescription::ServiceAccount(_) => ServiceAccount::KIND,
            ResourceDescription::Deployment(_) => Deployment::KIND,
            ResourceDescription::Service(_) => Service::KIND,
            ResourceDescription::CustomType(_) => CustomResourceDefinition::KIND,
        };
        let metadata = self.metadata();

        ObjectIdentity {
            kind,
            namespace: metadata.namespace.clone(),
            name: metadata.name.clone().unwrap_or_default(),
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            ResourceDescription::ServiceAccount(o) => &o.metadata,
            ResourceDescription::Deployment(o) => &o.metadata,
            ResourceDescription::Service(o) => &o.metadata,
            ResourceDescription::CustomType(o) => &o.metadata,
        }
    }
}

impl From<ServiceAccount> for ResourceDescription {
    fn from(o: ServiceAccount) -> Self {
        ResourceDescription::ServiceAccount(o)
    }
}

impl From<Deployment> for ResourceDescription {
    fn from(o: Deployment) -> Self {
        ResourceDescription::Deployment(o)
    }
}

impl From<Service> for ResourceDescription {
    fn from(o: Service) -> Self {
        ResourceDescription::Service(o)
    }
}

impl From<CustomResourceDefinition> for ResourceDescription {
    fn from(o: CustomResourceDefinition) -> Self {
        ResourceDescription::CustomType(o)
    }
}
