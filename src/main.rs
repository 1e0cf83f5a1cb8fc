// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use stevedore::config::Config;
use stevedore::reconcilers::{BackendProvisioner, CustomTypeRegistrar};
use stevedore::resources::{
    backend_descriptions, custom_resource_definition, storage_type_descriptors,
    ResourceDescription,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: namespace={}, backend={} ({})",
        config.namespace, config.backend_name, config.backend_image
    );

    let spec = config.backend_spec();
    if config.render_only {
        return render(&spec);
    }

    let client = Client::try_default()
        .await
        .context("failed to connect to the Kubernetes cluster")?;
    info!("Connected to Kubernetes cluster");

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, abandoning outstanding waits");
            on_signal.cancel();
        }
    });

    CustomTypeRegistrar::new(client.clone(), config.crd_wait())
        .register_storage_types(&cancel)
        .await
        .context("failed to register storage custom types")?;

    let backend = BackendProvisioner::new(client, config.rollout_wait())
        .provision(&spec, &cancel)
        .await
        .with_context(|| format!("failed to provision {}", spec.name))?;

    info!("Storage management API available at {}", backend.address);
    Ok(())
}

/// Print every object the operator would submit as a multi-document YAML stream
fn render(spec: &stevedore::resources::BackendSpec) -> Result<()> {
    let objects: Vec<ResourceDescription> = storage_type_descriptors()
        .iter()
        .map(|descriptor| custom_resource_definition(descriptor).into())
        .chain(backend_descriptions(spec))
        .collect();

    for object in &objects {
        let yaml = serde_yaml::to_string(object)
            .with_context(|| format!("failed to render {}", object.identity()))?;
        println!("---\n{}", yaml.trim_end());
    }
    Ok(())
}
