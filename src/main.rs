// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{bail, Result};
use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use webhook_certs::bootstrap::{
    BootstrapSettings, DeploymentPatch, ServingCertSetup, TlsBootstrapper,
};
use webhook_certs::certs::resolve_annotations;
use webhook_certs::config::{Config, Platform};
use webhook_certs::constants::OPERATOR_NAME;
use webhook_certs::driver::BootstrapManager;
use webhook_certs::reconcilers::TlsSecretReconciler;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting {}", OPERATOR_NAME);

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: namespace={}, platform={:?}, secret={}",
        config.namespace, config.platform, config.server_tls_secret
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
        }
        shutdown.cancel();
    });

    let webhook_annotations =
        resolve_annotations(&client, &config.server_tls_secret, &config.namespace).await?;
    info!("Webhook configuration annotations: {:?}", webhook_annotations);

    match config.platform {
        Platform::OpenShift => {
            let setup = ServingCertSetup::new(client.clone(), &config);
            if setup.run().await? == DeploymentPatch::Updated {
                bail!("Controller deployment updated with webhook certificates, controller needs to restart");
            }
            info!("Webhook certificates are served by the cluster service CA");
            cancel.cancelled().await;
        }
        Platform::Kubernetes => {
            let settings = BootstrapSettings::from_config(&config)?;
            let bootstrapper = TlsBootstrapper::new(client.clone(), settings, config.poll_interval);
            let (manager, handle) =
                BootstrapManager::new(client.clone(), bootstrapper, &config, cancel.clone());
            let reconciler = TlsSecretReconciler::new(client.clone(), &config, handle, cancel.clone());

            info!("Starting bootstrap manager and secret reconciler...");
            tokio::try_join!(manager.run(), reconciler.run())?;

            if !cancel.is_cancelled() {
                warn!("Reconcilers stopped unexpectedly");
            }
        }
    }

    Ok(())
}
