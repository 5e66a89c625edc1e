// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Object builder for the certificate generation job.

use crate::constants::job;
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{Container, EnvVar, PodSpec, PodTemplateSpec};
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

/// Inputs for a one-shot job
#[derive(Debug, Clone)]
pub struct JobParams {
    pub name: String,
    pub namespace: String,
    pub service_account: String,
    pub image: String,
    /// Container environment. Ordered so repeated builds yield identical objects.
    pub env: BTreeMap<String, String>,
}

/// Build a run-once Job that is cleaned up shortly after it finishes
pub fn build_job(params: &JobParams) -> Job {
    let env: Vec<EnvVar> = params
        .env
        .iter()
        .map(|(name, value)| EnvVar {
            name: name.clone(),
            value: Some(value.clone()),
            ..Default::default()
        })
        .collect();

    Job {
        metadata: ObjectMeta {
            name: Some(params.name.clone()),
            namespace: Some(params.namespace.clone()),
            ..Default::default()
        },
        spec: Some(JobSpec {
            backoff_limit: Some(job::BACKOFF_LIMIT),
            ttl_seconds_after_finished: Some(job::TTL_SECONDS_AFTER_FINISHED),
            template: PodTemplateSpec {
                metadata: None,
                spec: Some(PodSpec {
                    service_account_name: Some(params.service_account.clone()),
                    restart_policy: Some("Never".to_string()),
                    termination_grace_period_seconds: Some(job::TERMINATION_GRACE_PERIOD_SECS),
                    containers: vec![Container {
                        name: format!("{}-container", params.name),
                        image: Some(params.image.clone()),
                        image_pull_policy: Some("IfNotPresent".to_string()),
                        env: Some(env),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}
