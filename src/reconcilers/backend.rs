// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Backend provisioner - stands up a storage management daemon in dependency
//! order: ServiceAccount, Deployment (awaited), Service, then its address.

use crate::error::{OperatorError, Result};
use crate::kubernetes::{Applier, ApplyOutcome, ReadinessWaiter, WaitSettings};
use crate::resources::{deployment, service, service_account, BackendSpec};
use k8s_openapi::api::core::v1::Service;
use kube::{Api, Client};
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};
use url::Url;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProvisionStage {
    ServiceAccount,
    Deployment,
    Service,
}

impl ProvisionStage {
    pub const ORDER: [ProvisionStage; 3] = [
        ProvisionStage::ServiceAccount,
        ProvisionStage::Deployment,
        ProvisionStage::Service,
    ];

    /// Stages that depend on this one and are skipped when it fails
    pub fn dependents(self) -> Vec<ProvisionStage> {
        Self::ORDER
            .iter()
            .skip_while(|stage| **stage != self)
            .skip(1)
            .copied()
            .collect()
    }
}

impl fmt::Display for ProvisionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionStage::ServiceAccount => f.write_str("service-account"),
            ProvisionStage::Deployment => f.write_str("deployment"),
            ProvisionStage::Service => f.write_str("service"),
        }
    }
}

/// A fully provisioned, reachable backend
#[derive(Clone, Debug, PartialEq)]
pub struct ProvisionedBackend {
    /// `http://<cluster-ip>:<port>` of the daemon's Service
    pub address: Url,
    pub outcomes: Vec<(ProvisionStage, ApplyOutcome)>,
}

pub struct BackendProvisioner {
    client: Client,
    applier: Applier,
    waiter: ReadinessWaiter,
    settings: WaitSettings,
}

impl BackendProvisioner {
    pub fn new(client: Client, settings: WaitSettings) -> Self {
        Self {
            applier: Applier::new(client.clone()),
            waiter: ReadinessWaiter::new(client.clone()),
            client,
            settings,
        }
    }

    /// Provision the daemon described by `spec` and return its address.
    ///
    /// Safe to re-run after a partial failure: objects created earlier are
    /// accepted as they are and only the incomplete stage does real work. The
    /// Deployment is awaited even when it already existed.
    #[instrument(skip(self, spec, cancel), fields(namespace = %spec.namespace, backend = %spec.name))]
    pub async fn provision(
        &self,
        spec: &BackendSpec,
        cancel: &CancellationToken,
    ) -> Result<ProvisionedBackend> {
        let mut outcomes = Vec::with_capacity(ProvisionStage::ORDER.len());

        let stage = ProvisionStage::ServiceAccount;
        let outcome = self
            .applier
            .apply(&service_account(spec).into())
            .await
            .map_err(|e| abort(stage, e))?;
        outcomes.push((stage, outcome));

        let stage = ProvisionStage::Deployment;
        let outcome = self
            .applier
            .apply(&deployment(spec).into())
            .await
            .map_err(|e| abort(stage, e))?;
        outcomes.push((stage, outcome));

        debug!("Waiting for {} replica(s) of {}", spec.replicas, spec.name);
        self.waiter
            .wait(&spec.readiness_query(), self.settings, cancel)
            .await
            .map_err(|e| abort(stage, e))?;

        let stage = ProvisionStage::Service;
        let outcome = self
            .applier
            .apply(&service(spec).into())
            .await
            .map_err(|e| abort(stage, e))?;
        outcomes.push((stage, outcome));

        let address = self
            .resolve_address(&spec.namespace, &spec.name)
            .await
            .map_err(|e| abort(stage, e))?;

        info!("Backend {} is reachable at {}", spec.name, address);
        Ok(ProvisionedBackend { address, outcomes })
    }

    /// Address of an existing backend Service, for building its API client
    #[instrument(skip(self))]
    pub async fn resolve_address(&self, namespace: &str, name: &str) -> Result<Url> {
        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let service = services
            .get(name)
            .await
            .map_err(|source| OperatorError::ControlPlane {
                action: "reading",
                target: format!("Service/{namespace}/{name}"),
                source,
            })?;

        let address = service_address(&service)?;
        debug!("Resolved {}/{} to {}", namespace, name, address);
        Ok(address)
    }
}

fn abort(stage: ProvisionStage, source: OperatorError) -> OperatorError {
    let skipped = stage.dependents();
    error!("Provisioning stage {} failed, skipping {:?}: {}", stage, skipped, source);
    OperatorError::DependencyAborted {
        stage,
        skipped,
        source: Box::new(source),
    }
}

/// `http://<cluster-ip>:<first port>` of a Service
pub fn service_address(service: &Service) -> Result<Url> {
    let name = service.metadata.name.as_deref().unwrap_or_default();
    let spec = service
        .spec
        .as_ref()
        .ok_or_else(|| OperatorError::AddressResolution(format!("service {name} has no spec")))?;

    let cluster_ip = spec
        .cluster_ip
        .as_deref()
        .filter(|ip| !ip.is_empty() && *ip != "None")
        .ok_or_else(|| {
            OperatorError::AddressResolution(format!("service {name} has no cluster IP"))
        })?;

    let port = spec
        .ports
        .as_ref()
        .and_then(|ports| ports.first())
        .map(|p| p.port)
        .ok_or_else(|| {
            OperatorError::AddressResolution(format!("service {name} is missing a port"))
        })?;

    let host = if cluster_ip.contains(':') {
        format!("[{cluster_ip}]")
    } else {
        cluster_ip.to_string()
    };
    Ok(Url::parse(&format!("http://{host}:{port}"))?)
}
