// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Control-plane plumbing: idempotent creation and readiness polling.

pub mod apply;
pub mod readiness;

pub use apply::{Applier, ApplyOutcome};
pub use readiness::{ReadinessQuery, ReadinessWaiter, WaitSettings, WaitState};
