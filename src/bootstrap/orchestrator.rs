// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Self-signed TLS bootstrap for the webhook server.
//!
//! When the server TLS secret is missing, a one-shot job generates a fresh CA
//! and server certificate. The bootstrapper keeps no state of its own between
//! runs: everything it needs to resume after a failed pass is observable in
//! the cluster, and every step tolerates being repeated.

use crate::bootstrap::service::{serving_cert_annotations, sync_secure_service, tls_domain};
use crate::config::Config;
use crate::constants::{job_env, names};
use crate::error::{Result, WebhookCertsError};
use crate::jobs::{build_job, JobManager, JobParams};
use crate::kubernetes::delete_if_exists;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Secret;
use kube::api::DeleteParams;
use kube::{Api, Client};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

/// Lifecycle of the certificate material during one bootstrap run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Absent,
    ProvisioningJobRunning,
    Provisioned,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The server TLS secret was already there; nothing was touched
    AlreadyProvisioned,
    /// The job generated new certificate material and was cleaned up
    Provisioned,
}

/// Names and knobs of a bootstrap run
#[derive(Debug, Clone)]
pub struct BootstrapSettings {
    pub namespace: String,
    pub server_tls_secret: String,
    pub ca_secret: String,
    pub job_name: String,
    pub service_account: String,
    pub job_image: String,
    pub job_timeout: Duration,
}

impl BootstrapSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let job_image = config.job_image.clone().ok_or_else(|| {
            WebhookCertsError::ConfigError("no image configured for the TLS job".to_string())
        })?;

        Ok(Self {
            namespace: config.namespace.clone(),
            server_tls_secret: config.server_tls_secret.clone(),
            ca_secret: names::CA_SECRET.to_string(),
            job_name: names::TLS_JOB.to_string(),
            service_account: config.service_account.clone(),
            job_image,
            job_timeout: config.job_timeout,
        })
    }

    /// Environment handed to the TLS job container
    pub fn job_env(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (job_env::DOMAIN.to_string(), tls_domain(&self.namespace)),
            (job_env::NAMESPACE.to_string(), self.namespace.clone()),
            (job_env::SERVER_TLS_SECRET_NAME.to_string(), self.server_tls_secret.clone()),
            (job_env::CA_CERTIFICATE_SECRET_NAME.to_string(), self.ca_secret.clone()),
        ])
    }

    fn job(&self) -> Job {
        build_job(&JobParams {
            name: self.job_name.clone(),
            namespace: self.namespace.clone(),
            service_account: self.service_account.clone(),
            image: self.job_image.clone(),
            env: self.job_env(),
        })
    }
}

/// Step of the provisioning sequence, reported when it fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    RemoveCaSecret,
    SubmitJob,
    SyncService,
    AwaitJob,
    Teardown,
}

fn transition(state: &mut BootstrapState, next: BootstrapState) {
    let from = *state;
    info!(?from, to = ?next, "TLS bootstrap state change");
    *state = next;
}

pub struct TlsBootstrapper {
    client: Client,
    settings: BootstrapSettings,
    jobs: JobManager,
}

impl TlsBootstrapper {
    pub fn new(client: Client, settings: BootstrapSettings, poll_interval: Duration) -> Self {
        let jobs = JobManager::new(client.clone(), poll_interval);
        Self {
            client,
            settings,
            jobs,
        }
    }

    pub fn settings(&self) -> &BootstrapSettings {
        &self.settings
    }

    /// Make sure the webhook server TLS secret exists, generating it if needed.
    ///
    /// Cancellation drops whatever remote call is in flight. Nothing is rolled
    /// back: a Job or Service left behind is picked up by the next run.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<BootstrapOutcome> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(WebhookCertsError::Cancelled("TLS bootstrap".to_string())),
            res = self.bootstrap(cancel) => res,
        }
    }

    #[instrument(skip(self, cancel), fields(namespace = %self.settings.namespace))]
    async fn bootstrap(&self, cancel: &CancellationToken) -> Result<BootstrapOutcome> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &self.settings.namespace);

        let existing = secrets
            .get_opt(&self.settings.server_tls_secret)
            .await
            .inspect_err(|e| {
                error!(
                    "Error getting webhook server TLS secret {}: {}",
                    self.settings.server_tls_secret, e
                )
            })?;
        if existing.is_some() {
            debug!("Webhook server TLS secret {} present", self.settings.server_tls_secret);
            return Ok(BootstrapOutcome::AlreadyProvisioned);
        }

        let mut state = BootstrapState::Absent;
        info!(
            "Webhook server TLS secret {} not found, generating a self-signed certificate",
            self.settings.server_tls_secret
        );
        transition(&mut state, BootstrapState::ProvisioningJobRunning);

        let mut step = ProvisionStep::RemoveCaSecret;
        match self.provision(&secrets, cancel, &mut step).await {
            Ok(()) => {
                transition(&mut state, BootstrapState::Provisioned);
                Ok(BootstrapOutcome::Provisioned)
            }
            Err(e) => {
                transition(&mut state, BootstrapState::Error);
                error!(?step, "TLS bootstrap failed: {}", e);
                Err(e)
            }
        }
    }

    /// Runs the provisioning sequence, leaving `step` at the one that failed
    async fn provision(
        &self,
        secrets: &Api<Secret>,
        cancel: &CancellationToken,
        step: &mut ProvisionStep,
    ) -> Result<()> {
        let s = &self.settings;

        // The CA and server certificate are generated together
        *step = ProvisionStep::RemoveCaSecret;
        if delete_if_exists(secrets, &s.ca_secret, &DeleteParams::default()).await? {
            info!("Removed stale self-signed CA secret {}", s.ca_secret);
        }

        *step = ProvisionStep::SubmitJob;
        self.jobs.submit(s.job()).await?;

        *step = ProvisionStep::SyncService;
        sync_secure_service(
            &self.client,
            &s.namespace,
            serving_cert_annotations(&s.server_tls_secret),
        )
        .await?;

        *step = ProvisionStep::AwaitJob;
        let finished = self
            .jobs
            .await_completion(&s.job_name, &s.namespace, s.job_timeout, cancel)
            .await?;

        *step = ProvisionStep::Teardown;
        self.jobs.teardown(&finished).await
    }

    /// Remove a provisioning job left behind by an earlier, unfinished run.
    ///
    /// Callers racing cancellation must wrap this themselves; a teardown that
    /// already started is not rolled back.
    pub async fn clean_stale_job(&self) -> Result<bool> {
        let found = self
            .jobs
            .clean_job(&self.settings.job_name, &self.settings.namespace)
            .await?;
        if found {
            info!("Removed leftover TLS job {}", self.settings.job_name);
        }
        Ok(found)
    }
}
