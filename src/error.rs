// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebhookCertsError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Job {namespace}/{name} did not succeed within {timeout:?}")]
    DeadlineExceeded {
        name: String,
        namespace: String,
        timeout: Duration,
    },

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Deployment patch failed: {0}")]
    DeploymentError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl WebhookCertsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KubeError(e) if is_not_found(e))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::KubeError(e) if is_conflict(e))
    }
}

/// The store has no object under the requested name
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

/// A create raced with an existing object of the same name
pub fn is_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 409 && ae.reason == "AlreadyExists")
}

/// An update carried a stale resourceVersion
pub fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 409 && ae.reason == "Conflict")
}

pub type Result<T> = std::result::Result<T, WebhookCertsError>;
