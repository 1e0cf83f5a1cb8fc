// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::reconcilers::backend::ProvisionStage;
use crate::reconcilers::registrar::RegistrationPhase;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OperatorError {
    #[error("Kubernetes API error while {action} {target}: {source}")]
    ControlPlane {
        action: &'static str,
        target: String,
        #[source]
        source: kube::Error,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Timed out after {timeout:?} waiting for {target} ({predicate})")]
    ReadinessTimeout {
        target: String,
        predicate: String,
        timeout: Duration,
    },

    #[error("Cancelled while waiting for {target}")]
    Cancelled { target: String },

    #[error("Stage {stage} failed, skipped {skipped:?}: {source}")]
    DependencyAborted {
        stage: ProvisionStage,
        skipped: Vec<ProvisionStage>,
        #[source]
        source: Box<OperatorError>,
    },

    #[error("Registration of {name} failed during {phase}: {source}")]
    Registration {
        name: String,
        phase: RegistrationPhase,
        #[source]
        source: Box<OperatorError>,
    },

    #[error("Address resolution failed: {0}")]
    AddressResolution(String),

    #[error("Invalid backend address: {0}")]
    InvalidAddress(#[from] url::ParseError),
}

impl OperatorError {
    /// The innermost error, unwrapping stage and registration context
    pub fn root_cause(&self) -> &OperatorError {
        match self {
            OperatorError::DependencyAborted { source, .. }
            | OperatorError::Registration { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// The provisioning stage this error aborted, if any
    pub fn stage(&self) -> Option<ProvisionStage> {
        match self {
            OperatorError::DependencyAborted { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Control-plane failures that may succeed when the caller retries later
    pub fn is_transient(&self) -> bool {
        matches!(
            self.root_cause(),
            OperatorError::ControlPlane { .. } | OperatorError::ReadinessTimeout { .. }
        )
    }

    /// Malformed input that will fail again no matter how often it is retried
    pub fn is_configuration(&self) -> bool {
        matches!(self.root_cause(), OperatorError::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, OperatorError>;
