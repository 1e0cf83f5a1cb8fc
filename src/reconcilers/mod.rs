// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! One-shot reconcilers that bring the cluster to the state the operator needs.

pub mod backend;
pub mod registrar;

pub use backend::{service_address, BackendProvisioner, ProvisionStage, ProvisionedBackend};
pub use registrar::{CustomTypeRegistrar, RegistrationPhase, RegistrationReport};
