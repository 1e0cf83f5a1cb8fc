// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom type registrar - registers CustomResourceDefinitions and waits
//! until discovery serves every one of them.

use crate::error::{OperatorError, Result};
use crate::kubernetes::{Applier, ApplyOutcome, ReadinessWaiter, WaitSettings};
use crate::resources::{custom_resource_definition, storage_type_descriptors, CustomTypeDescriptor};
use futures::future::try_join_all;
use kube::Client;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationPhase {
    Submit,
    Await,
}

impl fmt::Display for RegistrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationPhase::Submit => f.write_str("submit"),
            RegistrationPhase::Await => f.write_str("await"),
        }
    }
}

/// Per-type outcome of a successful registration, keyed by registration name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationReport {
    pub outcomes: Vec<(String, ApplyOutcome)>,
}

impl RegistrationReport {
    pub fn created(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.created()).count()
    }

    pub fn already_existing(&self) -> usize {
        self.outcomes.len() - self.created()
    }
}

pub struct CustomTypeRegistrar {
    applier: Applier,
    waiter: ReadinessWaiter,
    settings: WaitSettings,
}

impl CustomTypeRegistrar {
    pub fn new(client: Client, settings: WaitSettings) -> Self {
        Self {
            applier: Applier::new(client.clone()),
            waiter: ReadinessWaiter::new(client),
            settings,
        }
    }

    /// Register every descriptor, then wait until all of them are served.
    ///
    /// Submission continues past a failing descriptor so the others still get
    /// registered, but the first failure is returned and nothing is awaited.
    /// Success means every type is queryable; there is no partial result.
    #[instrument(skip_all, fields(count = descriptors.len()))]
    pub async fn register(
        &self,
        descriptors: &[CustomTypeDescriptor],
        cancel: &CancellationToken,
    ) -> Result<RegistrationReport> {
        let mut outcomes = Vec::with_capacity(descriptors.len());
        let mut first_failure = None;

        for descriptor in descriptors {
            let name = descriptor.registration_name();
            match self
                .applier
                .apply(&custom_resource_definition(descriptor).into())
                .await
            {
                Ok(outcome) => outcomes.push((name, outcome)),
                Err(source) => {
                    first_failure.get_or_insert(OperatorError::Registration {
                        name,
                        phase: RegistrationPhase::Submit,
                        source: Box::new(source),
                    });
                }
            }
        }

        if let Some(failure) = first_failure {
            return Err(failure);
        }

        try_join_all(descriptors.iter().map(|descriptor| async move {
            self.waiter
                .wait(&descriptor.readiness_query(), self.settings, cancel)
                .await
                .map_err(|source| OperatorError::Registration {
                    name: descriptor.registration_name(),
                    phase: RegistrationPhase::Await,
                    source: Box::new(source),
                })
        }))
        .await?;

        let report = RegistrationReport { outcomes };
        info!(
            "{} custom types served ({} created, {} already registered)",
            descriptors.len(),
            report.created(),
            report.already_existing()
        );
        Ok(report)
    }

    /// Register StorageCluster, StorageNode and StorageStatus
    pub async fn register_storage_types(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RegistrationReport> {
        self.register(&storage_type_descriptors(), cancel).await
    }
}
