// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Create-if-absent submission of object descriptions

use crate::error::{OperatorError, Result};
use crate::resources::ResourceDescription;
use kube::{api::PostParams, core::NamespaceResourceScope, Api, Client, Resource};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use tracing::{debug, error, info, instrument};

/// What a successful apply did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    AlreadyExists,
}

impl ApplyOutcome {
    pub fn created(&self) -> bool {
        matches!(self, ApplyOutcome::Created)
    }
}

/// Submits descriptions, absorbing AlreadyExists
#[derive(Clone)]
pub struct Applier {
    client: Client,
}

impl Applier {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create the described object unless an object with the same kind,
    /// namespace and name already exists. Failures are never retried here.
    #[instrument(skip(self, description), fields(object = %description.identity()))]
    pub async fn apply(&self, description: &ResourceDescription) -> Result<ApplyOutcome> {
        let identity = description.identity();
        let namespace = identity.namespace.as_deref();

        let result = match description {
            ResourceDescription::ServiceAccount(o) => {
                create_if_absent(self.namespaced(namespace), o).await
            }
            ResourceDescription::Deployment(o) => {
                create_if_absent(self.namespaced(namespace), o).await
            }
            ResourceDescription::Service(o) => {
                create_if_absent(self.namespaced(namespace), o).await
            }
            ResourceDescription::CustomType(o) => {
                create_if_absent(Api::all(self.client.clone()), o).await
            }
        };

        match result {
            Ok(ApplyOutcome::Created) => {
                info!("{} created", identity);
                Ok(ApplyOutcome::Created)
            }
            Ok(ApplyOutcome::AlreadyExists) => {
                debug!("{} already exists", identity);
                Ok(ApplyOutcome::AlreadyExists)
            }
            Err(e) => {
                error!("Failed to create {}: {}", identity, e);
                Err(OperatorError::ControlPlane {
                    action: "creating",
                    target: identity.to_string(),
                    source: e,
                })
            }
        }
    }

    fn namespaced<K>(&self, namespace: Option<&str>) -> Api<K>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    {
        match namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::default_namespaced(self.client.clone()),
        }
    }
}

async fn create_if_absent<K>(api: Api<K>, object: &K) -> kube::Result<ApplyOutcome>
where
    K: Resource + Clone + Debug + Serialize + DeserializeOwned,
{
    match api.create(&PostParams::default(), object).await {
        Ok(_) => Ok(ApplyOutcome::Created),
        Err(e) if is_already_exists(&e) => Ok(ApplyOutcome::AlreadyExists),
        Err(e) => Err(e),
    }
}

/// A 409 is only idempotent success when the name is taken; a write
/// conflict on an existing object is not.
pub fn is_already_exists(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(ae) if ae.code == 409 && ae.reason == "AlreadyExists")
}
