// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Polling the control plane until an object is observably usable

use crate::constants::readiness::{CRD_TIMEOUT_SECS, POLL_INTERVAL_SECS, ROLLOUT_TIMEOUT_SECS};
use crate::error::{OperatorError, Result};
use k8s_openapi::api::apps::v1::Deployment;
use kube::{Api, Client};
use std::time::Duration;
use tokio::time::{sleep, timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

const FAR_FUTURE_SECS: u64 = 30 * 365 * 24 * 60 * 60;

/// What must be true before dependents may proceed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadinessQuery {
    /// At least `target_replicas` replicas observed, all of them ready
    Deployment {
        namespace: String,
        name: String,
        target_replicas: i32,
    },
    /// `plural` is listed by the discovery endpoint of `group/version`
    CustomType {
        group: String,
        version: String,
        plural: String,
    },
}

impl ReadinessQuery {
    pub fn target(&self) -> String {
        match self {
            ReadinessQuery::Deployment {
                namespace, name, ..
            } => format!("Deployment/{namespace}/{name}"),
            ReadinessQuery::CustomType {
                group,
                version,
                plural,
            } => format!("{plural}.{group}/{version}"),
        }
    }

    pub fn predicate(&self) -> String {
        match self {
            ReadinessQuery::Deployment {
                target_replicas, ..
            } => format!("{target_replicas} ready replica(s)"),
            ReadinessQuery::CustomType { group, version, .. } => {
                format!("served by /apis/{group}/{version}")
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let malformed = match self {
            ReadinessQuery::Deployment {
                namespace,
                name,
                target_replicas,
            } => namespace.is_empty() || name.is_empty() || *target_replicas < 0,
            ReadinessQuery::CustomType {
                group,
                version,
                plural,
            } => group.is_empty() || version.is_empty() || plural.is_empty(),
        };

        if malformed {
            return Err(OperatorError::Configuration(format!(
                "malformed readiness query {self:?}"
            )));
        }
        Ok(())
    }
}

/// Result of a single poll
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    Ready,
    NotReady(String),
    /// The control plane could not be asked; keep polling
    Unreachable(String),
    /// The query can never succeed
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WaitState {
    Polling { attempt: u32 },
    Ready,
    TimedOut,
    Failed(String),
}

impl WaitState {
    /// Transition on a probe outcome; `deadline_passed` is sampled after the
    /// probe returned.
    pub fn advance(self, probe: ProbeOutcome, deadline_passed: bool) -> WaitState {
        let WaitState::Polling { attempt } = self else {
            return self;
        };

        match probe {
            ProbeOutcome::Ready => WaitState::Ready,
            ProbeOutcome::Invalid(reason) => WaitState::Failed(reason),
            ProbeOutcome::NotReady(_) | ProbeOutcome::Unreachable(_) if deadline_passed => {
                WaitState::TimedOut
            }
            ProbeOutcome::NotReady(_) | ProbeOutcome::Unreachable(_) => WaitState::Polling {
                attempt: attempt + 1,
            },
        }
    }
}

/// Poll cadence and deadline for one wait
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitSettings {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl WaitSettings {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    /// Defaults for newly registered custom types
    pub fn custom_types() -> Self {
        Self::new(
            Duration::from_secs(POLL_INTERVAL_SECS),
            Duration::from_secs(CRD_TIMEOUT_SECS),
        )
    }

    /// Defaults for a backend rollout
    pub fn rollout() -> Self {
        Self::new(
            Duration::from_secs(POLL_INTERVAL_SECS),
            Duration::from_secs(ROLLOUT_TIMEOUT_SECS),
        )
    }
}

#[derive(Clone)]
pub struct ReadinessWaiter {
    client: Client,
}

impl ReadinessWaiter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn wait(
        &self,
        query: &ReadinessQuery,
        settings: WaitSettings,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.wait_until_ready(query, settings.poll_interval, settings.timeout, cancel)
            .await
    }

    /// Block until `query` is observed ready, `timeout` elapses or `cancel`
    /// fires. Unavailability of the control plane is retried until the
    /// deadline; a query the API rejects as malformed fails immediately.
    #[instrument(skip(self, cancel), fields(target = %query.target()))]
    pub async fn wait_until_ready(
        &self,
        query: &ReadinessQuery,
        poll_interval: Duration,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<()> {
        query.validate()?;
        if poll_interval.is_zero() {
            return Err(OperatorError::Configuration(
                "poll interval must be positive".to_string(),
            ));
        }

        let target = query.target();
        let deadline = deadline_after(timeout);
        let mut state = WaitState::Polling { attempt: 1 };

        loop {
            let probe = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(OperatorError::Cancelled { target }),
                probe = timeout_at(deadline, self.probe(query)) => probe.unwrap_or_else(|_| {
                    ProbeOutcome::Unreachable("probe still in flight at deadline".to_string())
                }),
            };

            match &probe {
                ProbeOutcome::NotReady(reason) => debug!("{} not ready: {}", target, reason),
                ProbeOutcome::Unreachable(reason) => {
                    warn!("Error checking {}: {}, retrying", target, reason)
                }
                _ => {}
            }

            state = state.advance(probe, Instant::now() >= deadline);
            match &state {
                WaitState::Polling { attempt } => {
                    debug!("Waiting {:?} before poll {}", poll_interval, attempt)
                }
                WaitState::Ready => {
                    info!("{} is ready", target);
                    return Ok(());
                }
                WaitState::TimedOut => {
                    return Err(OperatorError::ReadinessTimeout {
                        target,
                        predicate: query.predicate(),
                        timeout,
                    });
                }
                WaitState::Failed(reason) => {
                    return Err(OperatorError::Configuration(format!("{target}: {reason}")));
                }
            }

            let pause = poll_interval.min(deadline.saturating_duration_since(Instant::now()));
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(OperatorError::Cancelled { target }),
                _ = sleep(pause) => {}
            }
        }
    }

    async fn probe(&self, query: &ReadinessQuery) -> ProbeOutcome {
        match query {
            ReadinessQuery::Deployment {
                namespace,
                name,
                target_replicas,
            } => {
                let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
                match deployments.get(name).await {
                    Ok(deployment) => deployment_readiness(&deployment, *target_replicas),
                    Err(e) => classify(e),
                }
            }
            ReadinessQuery::CustomType {
                group,
                version,
                plural,
            } => {
                let group_version = format!("{group}/{version}");
                match self.client.list_api_group_resources(&group_version).await {
                    Ok(list) if list.resources.iter().any(|r| r.name == *plural) => {
                        ProbeOutcome::Ready
                    }
                    Ok(_) => ProbeOutcome::NotReady(format!(
                        "{plural} not yet listed by {group_version}"
                    )),
                    Err(e) => classify(e),
                }
            }
        }
    }
}

/// Deadline `timeout` from now; timeouts past what `Instant` can hold wait
/// for thirty years instead.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(FAR_FUTURE_SECS))
}

/// Readiness of a fetched Deployment against the requested replica count
pub fn deployment_readiness(deployment: &Deployment, target_replicas: i32) -> ProbeOutcome {
    let status = deployment.status.as_ref();
    let observed = status.and_then(|s| s.replicas).unwrap_or(0);
    let ready = status.and_then(|s| s.ready_replicas).unwrap_or(0);

    if observed < target_replicas {
        ProbeOutcome::NotReady(format!("{observed}/{target_replicas} replicas observed"))
    } else if ready < observed {
        ProbeOutcome::NotReady(format!("{ready}/{observed} replicas ready"))
    } else {
        ProbeOutcome::Ready
    }
}

// 404 is expected while a new object or API group propagates.
fn classify(error: kube::Error) -> ProbeOutcome {
    match &error {
        kube::Error::Api(ae) if ae.code == 400 || ae.code == 422 => {
            ProbeOutcome::Invalid(ae.message.clone())
        }
        kube::Error::Api(ae) if ae.code == 404 => ProbeOutcome::NotReady(ae.message.clone()),
        _ => ProbeOutcome::Unreachable(error.to_string()),
    }
}
