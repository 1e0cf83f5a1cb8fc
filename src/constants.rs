// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// The operator name, used as the managed-by label value
pub const OPERATOR_NAME: &str = "stevedore";

/// Labels stamped on every object the operator creates
pub mod labels {
    /// Storage technology the object belongs to (e.g. "glusterfs")
    pub const STORAGE: &str = "stevedore.io/storage";
    /// Logical role of the object within its storage technology
    pub const ROLE: &str = "stevedore.io/role";
    /// Standard managed-by label
    pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";
}

/// Annotation keys
pub mod annotations {
    pub const DESCRIPTION: &str = "description";
}

/// Custom resource types registered by the operator
pub mod crd {
    pub const GROUP: &str = "storage.stevedore.io";
    pub const VERSION: &str = "v1alpha1";
}

/// Readiness polling defaults
pub mod readiness {
    /// Polling interval in seconds while waiting for objects to become ready
    pub const POLL_INTERVAL_SECS: u64 = 2;
    /// How long newly registered custom types get to show up in discovery
    pub const CRD_TIMEOUT_SECS: u64 = 60;
    /// How long a backend deployment gets to roll out (image pulls are slow)
    pub const ROLLOUT_TIMEOUT_SECS: u64 = 300;
}

/// Management daemon defaults
pub mod backend {
    pub const DEFAULT_NAME: &str = "heketi";
    pub const DEFAULT_IMAGE: &str = "heketi/heketi:dev";
    pub const DEFAULT_PORT: i32 = 8080;
    pub const DEFAULT_REPLICAS: i32 = 1;
    pub const SERVICE_ACCOUNT_SUFFIX: &str = "-service-account";
    pub const DATA_VOLUME: &str = "db";
}
