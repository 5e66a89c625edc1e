// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Mounting the webhook certificates into the controller's own Deployment.

use crate::constants::{names, SERVICE_CA_KEY, WEBHOOK_CERT_DIR};
use crate::error::{Result, WebhookCertsError};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{
    ConfigMapProjection, KeyToPath, ProjectedVolumeSource, SecretProjection, Volume,
    VolumeMount, VolumeProjection,
};
use kube::api::PostParams;
use kube::{Api, Client};
use tracing::{debug, info, instrument};

/// Result of patching the Deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentPatch {
    /// Volume or mount was appended and the Deployment was written back
    Updated,
    NoChangeNeeded,
}

/// Projected volume combining the CA bundle and the serving certificate
pub fn cert_volume(secret_name: &str) -> Volume {
    Volume {
        name: names::CERT_VOLUME.to_string(),
        projected: Some(ProjectedVolumeSource {
            sources: Some(vec![
                VolumeProjection {
                    config_map: Some(ConfigMapProjection {
                        name: names::SECURE_CONFIG_MAP.to_string(),
                        items: Some(vec![KeyToPath {
                            key: SERVICE_CA_KEY.to_string(),
                            path: "./ca.crt".to_string(),
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                VolumeProjection {
                    secret: Some(SecretProjection {
                        name: secret_name.to_string(),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn cert_volume_mount() -> VolumeMount {
    VolumeMount {
        name: names::CERT_VOLUME.to_string(),
        mount_path: WEBHOOK_CERT_DIR.to_string(),
        read_only: Some(true),
        ..Default::default()
    }
}

/// Append `volume` unless one with the same name exists. Returns whether it was appended.
pub fn append_volume_if_missing(volumes: &mut Vec<Volume>, volume: Volume) -> bool {
    if volumes.iter().any(|v| v.name == volume.name) {
        return false;
    }
    volumes.push(volume);
    true
}

/// Append `mount` unless one with the same name exists. Returns whether it was appended.
pub fn append_volume_mount_if_missing(mounts: &mut Vec<VolumeMount>, mount: VolumeMount) -> bool {
    if mounts.iter().any(|m| m.name == mount.name) {
        return false;
    }
    mounts.push(mount);
    true
}

/// Add the cert volume to the pod template and mount it into the first container.
///
/// Returns whether anything was appended.
pub fn apply_cert_volume(deployment: &mut Deployment, secret_name: &str) -> Result<bool> {
    let pod = deployment
        .spec
        .as_mut()
        .and_then(|s| s.template.spec.as_mut())
        .ok_or_else(|| WebhookCertsError::DeploymentError("deployment has no pod template".to_string()))?;

    let volume_added = append_volume_if_missing(
        pod.volumes.get_or_insert_with(Vec::new),
        cert_volume(secret_name),
    );

    let container = pod
        .containers
        .first_mut()
        .ok_or_else(|| WebhookCertsError::DeploymentError("deployment has no containers".to_string()))?;
    let mount_added = append_volume_mount_if_missing(
        container.volume_mounts.get_or_insert_with(Vec::new),
        cert_volume_mount(),
    );

    Ok(volume_added || mount_added)
}

/// Patch the named Deployment, writing it back only when something was appended
#[instrument(skip(client))]
pub async fn patch_controller_deployment(
    client: &Client,
    namespace: &str,
    name: &str,
    secret_name: &str,
) -> Result<DeploymentPatch> {
    let deployments: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let mut deployment = deployments.get(name).await?;

    if !apply_cert_volume(&mut deployment, secret_name)? {
        debug!("Deployment {} already mounts the webhook certificates", name);
        return Ok(DeploymentPatch::NoChangeNeeded);
    }

    deployments
        .replace(name, &PostParams::default(), &deployment)
        .await?;
    info!("Mounted webhook certificates into deployment {}", name);
    Ok(DeploymentPatch::Updated)
}
