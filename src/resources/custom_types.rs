// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CustomResourceDefinitions for the operator's own resource types.

use crate::constants::{labels, OPERATOR_NAME};
use crate::kubernetes::ReadinessQuery;
use crate::types::{StorageCluster, StorageNode, StorageStatus};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
    CustomResourceDefinition, CustomResourceDefinitionNames, CustomResourceDefinitionSpec,
    CustomResourceDefinitionVersion, CustomResourceValidation, JSONSchemaProps,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::CustomResourceExt;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeScope {
    Namespaced,
    Cluster,
}

impl TypeScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeScope::Namespaced => "Namespaced",
            TypeScope::Cluster => "Cluster",
        }
    }
}

/// A custom resource type to register, identified by (plural, group)
#[derive(Clone, Debug, PartialEq)]
pub struct CustomTypeDescriptor {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub plural: String,
    pub scope: TypeScope,
    /// OpenAPI v3 schema; unknown fields are preserved when absent
    pub schema: Option<JSONSchemaProps>,
}

impl CustomTypeDescriptor {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
        plural: impl Into<String>,
        scope: TypeScope,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
            plural: plural.into(),
            scope,
            schema: None,
        }
    }

    /// Describe a `#[derive(CustomResource)]` type, keeping its generated schema
    pub fn for_resource<K: CustomResourceExt>() -> Self {
        let resource = K::api_resource();
        let crd = K::crd();
        let scope = match crd.spec.scope.as_str() {
            "Cluster" => TypeScope::Cluster,
            _ => TypeScope::Namespaced,
        };
        let schema = crd
            .spec
            .versions
            .into_iter()
            .find(|v| v.name == resource.version)
            .and_then(|v| v.schema)
            .and_then(|s| s.open_api_v3_schema);

        Self {
            group: resource.group,
            version: resource.version,
            kind: resource.kind,
            plural: resource.plural,
            scope,
            schema,
        }
    }

    pub fn registration_name(&self) -> String {
        registration_name(&self.plural, &self.group)
    }

    /// Discovery must list the plural before instances can be watched
    pub fn readiness_query(&self) -> ReadinessQuery {
        ReadinessQuery::CustomType {
            group: self.group.clone(),
            version: self.version.clone(),
            plural: self.plural.clone(),
        }
    }
}

/// Name of the CustomResourceDefinition object registering `plural` in `group`
pub fn registration_name(plural: &str, group: &str) -> String {
    format!("{plural}.{group}")
}

fn preserve_unknown_fields() -> JSONSchemaProps {
    JSONSchemaProps {
        type_: Some("object".to_string()),
        x_kubernetes_preserve_unknown_fields: Some(true),
        ..Default::default()
    }
}

pub fn custom_resource_definition(descriptor: &CustomTypeDescriptor) -> CustomResourceDefinition {
    let schema = descriptor
        .schema
        .clone()
        .unwrap_or_else(preserve_unknown_fields);

    CustomResourceDefinition {
        metadata: ObjectMeta {
            name: Some(descriptor.registration_name()),
            labels: Some(BTreeMap::from([
                (labels::STORAGE.to_string(), descriptor.group.clone()),
                (labels::ROLE.to_string(), descriptor.plural.clone()),
                (labels::MANAGED_BY.to_string(), OPERATOR_NAME.to_string()),
            ])),
            ..Default::default()
        },
        spec: CustomResourceDefinitionSpec {
            group: descriptor.group.clone(),
            names: CustomResourceDefinitionNames {
                kind: descriptor.kind.clone(),
                plural: descriptor.plural.clone(),
                singular: Some(descriptor.kind.to_lowercase()),
                ..Default::default()
            },
            scope: descriptor.scope.as_str().to_string(),
            versions: vec![CustomResourceDefinitionVersion {
                name: descriptor.version.clone(),
                served: true,
                storage: true,
                schema: Some(CustomResourceValidation {
                    open_api_v3_schema: Some(schema),
                }),
                ..Default::default()
            }],
            ..Default::default()
        },
        status: None,
    }
}

/// StorageCluster, StorageNode and StorageStatus
pub fn storage_type_descriptors() -> Vec<CustomTypeDescriptor> {
    vec![
        CustomTypeDescriptor::for_resource::<StorageCluster>(),
        CustomTypeDescriptor::for_resource::<StorageNode>(),
        CustomTypeDescriptor::for_resource::<StorageStatus>(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::crd::{GROUP, VERSION};

    #[test]
    fn test_registration_name() {
        assert_eq!(
            registration_name("storagestatuses", "storage.stevedore.io"),
            "storagestatuses.storage.stevedore.io"
        );
    }

    #[test]
    fn test_registration_name_matches_derived_crd_name() {
        let descriptors = storage_type_descriptors();
        let derived = [
            StorageCluster::crd_name(),
            StorageNode::crd_name(),
            StorageStatus::crd_name(),
        ];

        for (descriptor, crd_name) in descriptors.iter().zip(derived) {
            assert_eq!(descriptor.registration_name(), crd_name);
            assert_eq!(
                custom_resource_definition(descriptor).metadata.name.as_deref(),
                Some(crd_name)
            );
        }
    }

    #[test]
    fn test_storage_type_descriptors() {
        let descriptors = storage_type_descriptors();
        let kinds: Vec<_> = descriptors.iter().map(|d| d.kind.as_str()).collect();
        assert_eq!(kinds, vec!["StorageCluster", "StorageNode", "StorageStatus"]);

        for descriptor in &descriptors {
            assert_eq!(descriptor.group, GROUP);
            assert_eq!(descriptor.version, VERSION);
            assert_eq!(descriptor.scope, TypeScope::Namespaced);
            assert!(descriptor.schema.is_some());
        }
    }

    #[test]
    fn test_definition_without_schema_preserves_fields() {
        let descriptor = CustomTypeDescriptor::new(
            "example.io",
            "v1",
            "Widget",
            "widgets",
            TypeScope::Cluster,
        );
        let crd = custom_resource_definition(&descriptor);

        assert_eq!(crd.spec.scope, "Cluster");
        assert_eq!(crd.spec.names.singular.as_deref(), Some("widget"));

        let version = &crd.spec.versions[0];
        assert!(version.served && version.storage);
        let schema = version
            .schema
            .as_ref()
            .and_then(|s| s.open_api_v3_schema.as_ref())
            .unwrap();
        assert_eq!(schema.x_kubernetes_preserve_unknown_fields, Some(true));
    }

    #[test]
    fn test_readiness_query() {
        let descriptor = CustomTypeDescriptor::for_resource::<StorageNode>();
        assert_eq!(
            descriptor.readiness_query(),
            ReadinessQuery::CustomType {
                group: GROUP.to_string(),
                version: VERSION.to_string(),
                plural: "storagenodes".to_string(),
            }
        );
    }
}
