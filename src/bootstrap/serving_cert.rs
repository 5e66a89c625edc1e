// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Serving certificates issued by the cluster's service CA.
//!
//! Instead of running a job, the webhook Service is annotated so the service
//! CA operator writes a serving certificate into the server TLS secret, and a
//! ConfigMap is annotated to receive the CA bundle. Both are then mounted
//! into the controller Deployment.

use crate::bootstrap::deployment::{patch_controller_deployment, DeploymentPatch};
use crate::bootstrap::service::{
    serving_cert_annotations, sync_secure_config_map, sync_secure_service,
};
use crate::config::Config;
use crate::error::Result;
use kube::Client;
use tracing::{info, instrument};

pub struct ServingCertSetup {
    client: Client,
    namespace: String,
    server_tls_secret: String,
    controller_deployment: String,
}

impl ServingCertSetup {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            namespace: config.namespace.clone(),
            server_tls_secret: config.server_tls_secret.clone(),
            controller_deployment: config.controller_deployment.clone(),
        }
    }

    /// Returns whether the controller Deployment had to be changed. A changed
    /// Deployment rolls out new pods; the current process should exit.
    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn run(&self) -> Result<DeploymentPatch> {
        sync_secure_service(
            &self.client,
            &self.namespace,
            serving_cert_annotations(&self.server_tls_secret),
        )
        .await?;
        sync_secure_config_map(&self.client, &self.namespace).await?;

        let patch = patch_controller_deployment(
            &self.client,
            &self.namespace,
            &self.controller_deployment,
            &self.server_tls_secret,
        )
        .await?;
        info!("Service CA certificate setup complete ({:?})", patch);
        Ok(patch)
    }
}
