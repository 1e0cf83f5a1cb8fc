// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{backend, readiness};
use crate::kubernetes::WaitSettings;
use crate::resources::BackendSpec;
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Namespace the management daemon is provisioned into
    pub namespace: String,
    pub backend_name: String,
    pub backend_image: String,
    pub backend_replicas: i32,
    pub backend_port: i32,
    pub poll_interval: Duration,
    pub crd_timeout: Duration,
    pub rollout_timeout: Duration,
    /// Print the objects as YAML instead of submitting them
    pub render_only: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let namespace =
            lookup("STEVEDORE_NAMESPACE").context("STEVEDORE_NAMESPACE environment variable not set")?;

        Ok(Config {
            namespace,
            backend_name: lookup("STEVEDORE_BACKEND_NAME")
                .unwrap_or_else(|| backend::DEFAULT_NAME.to_string()),
            backend_image: lookup("STEVEDORE_BACKEND_IMAGE")
                .unwrap_or_else(|| backend::DEFAULT_IMAGE.to_string()),
            backend_replicas: parse_or(&lookup, "STEVEDORE_BACKEND_REPLICAS", backend::DEFAULT_REPLICAS)?,
            backend_port: parse_or(&lookup, "STEVEDORE_BACKEND_PORT", backend::DEFAULT_PORT)?,
            poll_interval: Duration::from_secs(parse_or(
                &lookup,
                "STEVEDORE_POLL_INTERVAL_SECS",
                readiness::POLL_INTERVAL_SECS,
            )?),
            crd_timeout: Duration::from_secs(parse_or(
                &lookup,
                "STEVEDORE_CRD_TIMEOUT_SECS",
                readiness::CRD_TIMEOUT_SECS,
            )?),
            rollout_timeout: Duration::from_secs(parse_or(
                &lookup,
                "STEVEDORE_ROLLOUT_TIMEOUT_SECS",
                readiness::ROLLOUT_TIMEOUT_SECS,
            )?),
            render_only: parse_or(&lookup, "STEVEDORE_RENDER_ONLY", false)?,
        })
    }

    /// The management daemon this configuration asks for
    pub fn backend_spec(&self) -> BackendSpec {
        let mut spec = BackendSpec::glusterfs_management(&self.namespace, &self.backend_image)
            .with_replicas(self.backend_replicas);
        spec.name = self.backend_name.clone();
        spec.port = self.backend_port;
        spec
    }

    pub fn crd_wait(&self) -> WaitSettings {
        WaitSettings::new(self.poll_interval, self.crd_timeout)
    }

    pub fn rollout_wait(&self) -> WaitSettings {
        WaitSettings::new(self.poll_interval, self.rollout_timeout)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .parse()
            .with_context(|| format!("{key} has an invalid value: {value}")),
        None => Ok(default),
    }
}
