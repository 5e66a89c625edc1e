// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deciding where the webhook server certificate comes from.
//!
//! A server TLS secret carrying cert-manager annotations is managed by
//! cert-manager; the webhook configuration then needs a CA injection
//! annotation pointing at the backing Certificate. Otherwise the certificate
//! is self-signed and the webhook configuration carries no extra annotations.

use crate::constants::annotations;
use crate::error::Result;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateMode {
    ExternallyManaged,
    SelfSigned,
}

impl CertificateMode {
    /// Classify a secret by its annotation keys
    pub fn detect(secret_annotations: &BTreeMap<String, String>) -> Self {
        if secret_annotations
            .keys()
            .any(|k| k.starts_with(annotations::CERT_MANAGER_PREFIX))
        {
            CertificateMode::ExternallyManaged
        } else {
            CertificateMode::SelfSigned
        }
    }
}

/// Annotations the webhook configuration needs in the given mode
pub fn webhook_annotations(mode: CertificateMode, namespace: &str) -> BTreeMap<String, String> {
    match mode {
        CertificateMode::ExternallyManaged => BTreeMap::from([(
            annotations::CERT_MANAGER_INJECT_CA_FROM.to_string(),
            format!("{}/{}", namespace, annotations::CERT_MANAGER_CERTIFICATE),
        )]),
        CertificateMode::SelfSigned => BTreeMap::new(),
    }
}

/// Mode of the named secret, or `None` while it does not exist yet
#[instrument(skip(client))]
pub async fn resolve_mode(
    client: &Client,
    secret_name: &str,
    namespace: &str,
) -> Result<Option<CertificateMode>> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let Some(secret) = secrets.get_opt(secret_name).await? else {
        debug!("Secret {} not found, certificate mode undetermined", secret_name);
        return Ok(None);
    };

    let mode = secret
        .metadata
        .annotations
        .as_ref()
        .map_or(CertificateMode::SelfSigned, CertificateMode::detect);
    debug!("Secret {} is {:?}", secret_name, mode);
    Ok(Some(mode))
}

/// Annotations to attach to the webhook configuration. Empty unless the
/// secret exists and is managed by cert-manager.
pub async fn resolve_annotations(
    client: &Client,
    secret_name: &str,
    namespace: &str,
) -> Result<BTreeMap<String, String>> {
    Ok(resolve_mode(client, secret_name, namespace)
        .await?
        .map(|mode| webhook_annotations(mode, namespace))
        .unwrap_or_default())
}
