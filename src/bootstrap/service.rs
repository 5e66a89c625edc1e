// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The Service fronting the webhook server and the CA bundle ConfigMap.

use crate::constants::{annotations, labels, names};
use crate::error::Result;
use crate::kubernetes::{sync_resource, SyncOutcome};
use k8s_openapi::api::core::v1::{ConfigMap, Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;
use kube::{Api, Client};
use std::collections::BTreeMap;
use tracing::instrument;

const HTTPS_PORT: i32 = 443;

/// Labels selecting the webhook server pods
pub fn webhook_app_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(labels::APP.to_string(), names::WEBHOOK_APP.to_string())])
}

/// DNS name the webhook server certificate is issued for
pub fn tls_domain(namespace: &str) -> String {
    format!("{}.{}.svc", names::WEBHOOK_SERVICE, namespace)
}

/// Asks the cluster certificate service to write a serving cert into `secret_name`
pub fn serving_cert_annotations(secret_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(
        annotations::SERVING_CERT_SECRET_NAME.to_string(),
        secret_name.to_string(),
    )])
}

pub fn secure_service(namespace: &str, annotations: BTreeMap<String, String>) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(names::WEBHOOK_SERVICE.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(webhook_app_labels()),
            annotations: (!annotations.is_empty()).then_some(annotations),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                port: HTTPS_PORT,
                protocol: Some("TCP".to_string()),
                target_port: Some(IntOrString::String(names::WEBHOOK_PORT_NAME.to_string())),
                ..Default::default()
            }]),
            selector: Some(webhook_app_labels()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn secure_config_map(namespace: &str) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(names::SECURE_CONFIG_MAP.to_string()),
            namespace: Some(namespace.to_string()),
            annotations: Some(BTreeMap::from([(
                annotations::INJECT_CABUNDLE.to_string(),
                "true".to_string(),
            )])),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[instrument(skip(client, annotations))]
pub async fn sync_secure_service(
    client: &Client,
    namespace: &str,
    annotations: BTreeMap<String, String>,
) -> Result<SyncOutcome> {
    let services: Api<Service> = Api::namespaced(client.clone(), namespace);
    let (_, outcome) = sync_resource(&services, secure_service(namespace, annotations)).await?;
    Ok(outcome)
}

#[instrument(skip(client))]
pub async fn sync_secure_config_map(client: &Client, namespace: &str) -> Result<SyncOutcome> {
    let config_maps: Api<ConfigMap> = Api::namespaced(client.clone(), namespace);
    let (_, outcome) = sync_resource(&config_maps, secure_config_map(namespace)).await?;
    Ok(outcome)
}
