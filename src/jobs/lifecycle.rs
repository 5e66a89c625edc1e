// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Submission, completion tracking and teardown of one-shot jobs.

use crate::constants::{labels, names};
use crate::error::{Result, WebhookCertsError};
use crate::kubernetes::{delete_if_exists, sync_resource, SyncOutcome};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{DeleteParams, ListParams};
use kube::{Api, Client, ResourceExt};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Drives a Job from submission to cleanup
#[derive(Clone)]
pub struct JobManager {
    client: Client,
    poll_interval: Duration,
}

impl JobManager {
    pub fn new(client: Client, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }

    fn namespace_of(&self, job: &Job) -> String {
        job.namespace()
            .unwrap_or_else(|| self.client.default_namespace().to_string())
    }

    /// Create the Job, or update the one already registered under its name
    #[instrument(skip(self, job), fields(job = %job.name_any()))]
    pub async fn submit(&self, job: Job) -> Result<SyncOutcome> {
        let jobs: Api<Job> = Api::namespaced(self.client.clone(), &self.namespace_of(&job));
        let (_, outcome) = sync_resource(&jobs, job).await?;
        Ok(outcome)
    }

    /// Poll the Job until it reports a succeeded pod.
    ///
    /// The first check happens immediately, then once per poll interval. Fails
    /// with `DeadlineExceeded` once `timeout` has elapsed, and with `Cancelled`
    /// as soon as the token fires. Read errors end the wait immediately.
    #[instrument(skip(self, cancel))]
    pub async fn await_completion(
        &self,
        name: &str,
        namespace: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Job> {
        let jobs: Api<Job> = Api::namespaced(self.client.clone(), namespace);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(WebhookCertsError::Cancelled(format!(
                "waiting for job {}/{}",
                namespace, name
            ))),
            res = tokio::time::timeout(timeout, self.poll_until_succeeded(&jobs, name)) => match res {
                Ok(job) => job,
                Err(_) => Err(WebhookCertsError::DeadlineExceeded {
                    name: name.to_string(),
                    namespace: namespace.to_string(),
                    timeout,
                }),
            },
        }
    }

    async fn poll_until_succeeded(&self, jobs: &Api<Job>, name: &str) -> Result<Job> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures_seen = 0;

        loop {
            ticker.tick().await;
            let job = jobs.get(name).await?;
            let status = job.status.as_ref();

            if status.and_then(|s| s.succeeded).unwrap_or(0) > 0 {
                info!("Job {} succeeded", name);
                info!(
                    "Please import public part of the self-signed CA certificate from secret {} into your browser",
                    names::CA_SECRET
                );
                return Ok(job);
            }

            let failed = status.and_then(|s| s.failed).unwrap_or(0);
            if failed > failures_seen {
                warn!("Job {} has {} failed pod(s), still waiting", name, failed);
                failures_seen = failed;
            }
            debug!("Job {} not complete yet", name);
        }
    }

    /// Delete every pod spawned by the Job, then the Job itself.
    ///
    /// Objects that are already gone are skipped, so a partially completed
    /// teardown can simply be run again.
    #[instrument(skip(self, job), fields(job = %job.name_any()))]
    pub async fn teardown(&self, job: &Job) -> Result<()> {
        let name = job.name_any();
        let namespace = self.namespace_of(job);
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &namespace);
        let jobs: Api<Job> = Api::namespaced(self.client.clone(), &namespace);

        let selector = format!("{}={}", labels::JOB_NAME, name);
        let owned = pods.list(&ListParams::default().labels(&selector)).await?;
        debug!("Found {} pod(s) for job {}", owned.items.len(), name);

        for pod in &owned.items {
            delete_if_exists(&pods, &pod.name_any(), &DeleteParams::default()).await?;
        }

        delete_if_exists(&jobs, &name, &DeleteParams::background()).await?;
        info!("Cleaned up job {}/{}", namespace, name);
        Ok(())
    }

    /// Tear down the named Job if it exists. Returns whether one was found.
    #[instrument(skip(self))]
    pub async fn clean_job(&self, name: &str, namespace: &str) -> Result<bool> {
        let jobs: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        match jobs.get_opt(name).await? {
            Some(job) => {
                self.teardown(&job).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
