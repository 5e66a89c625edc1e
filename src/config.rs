// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{self, job, names};
use anyhow::{bail, Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// How the webhook server obtains its serving certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Plain Kubernetes: a one-shot job generates a self-signed certificate
    Kubernetes,
    /// The cluster service CA issues the certificate
    OpenShift,
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "kubernetes" => Ok(Platform::Kubernetes),
            "openshift" => Ok(Platform::OpenShift),
            other => bail!("unknown platform '{}', expected 'kubernetes' or 'openshift'", other),
        }
    }
}

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace the controller and its webhook server run in
    pub namespace: String,
    pub platform: Platform,
    /// Image of the certificate generation job (required on Kubernetes)
    pub job_image: Option<String>,
    pub service_account: String,
    pub server_tls_secret: String,
    /// The controller's own deployment, patched with the cert volume
    pub controller_deployment: String,
    pub job_timeout: Duration,
    pub poll_interval: Duration,
    pub resync_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok(), || {
            std::fs::read_to_string(constants::SERVICE_ACCOUNT_NAMESPACE_FILE).ok()
        })
    }

    fn from_lookup<F, N>(lookup: F, sa_namespace: N) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
        N: FnOnce() -> Option<String>,
    {
        let namespace = match lookup("OPERATOR_NAMESPACE") {
            Some(ns) => ns,
            None => sa_namespace()
                .map(|ns| ns.trim().to_string())
                .filter(|ns| !ns.is_empty())
                .context("OPERATOR_NAMESPACE environment variable not set and not running in a pod")?,
        };

        let platform = match lookup("WEBHOOK_TLS_PLATFORM") {
            Some(p) => p.parse().context("Invalid WEBHOOK_TLS_PLATFORM")?,
            None => Platform::Kubernetes,
        };

        let job_image = lookup("WEBHOOK_CERT_JOB_IMAGE").filter(|i| !i.is_empty());
        if platform == Platform::Kubernetes && job_image.is_none() {
            bail!("WEBHOOK_CERT_JOB_IMAGE environment variable not set");
        }

        Ok(Config {
            namespace,
            platform,
            job_image,
            service_account: lookup("WEBHOOK_SERVER_SERVICE_ACCOUNT")
                .unwrap_or_else(|| names::DEFAULT_SERVICE_ACCOUNT.to_string()),
            server_tls_secret: lookup("WEBHOOK_SERVER_TLS_SECRET_NAME")
                .unwrap_or_else(|| names::DEFAULT_SERVER_TLS_SECRET.to_string()),
            controller_deployment: lookup("CONTROLLER_DEPLOYMENT_NAME")
                .unwrap_or_else(|| names::DEFAULT_CONTROLLER_DEPLOYMENT.to_string()),
            job_timeout: secs(&lookup, "TLS_JOB_TIMEOUT_SECS", job::TIMEOUT_SECS)?,
            poll_interval: secs(&lookup, "TLS_JOB_POLL_INTERVAL_SECS", job::POLL_INTERVAL_SECS)?,
            resync_interval: secs(&lookup, "RESYNC_INTERVAL_SECS", constants::RESYNC_INTERVAL_SECS)?,
        })
    }
}

fn secs<F>(lookup: &F, key: &str, default: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let value = match lookup(key) {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("{} must be a whole number of seconds, got '{}'", key, raw))?,
        None => default,
    };
    if value == 0 {
        bail!("{} must be greater than zero", key);
    }
    Ok(Duration::from_secs(value))
}
