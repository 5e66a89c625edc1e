// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Create-or-update of managed objects under optimistic concurrency.
//!
//! Every higher-level routine funnels its writes through [`sync_resource`]:
//! try a create, and when the store reports the name as taken, fetch the live
//! object, carry its resourceVersion (plus any kind-specific immutable fields)
//! onto the desired object and replace. A stale resourceVersion makes the
//! replace fail with a conflict, which is returned to the caller untouched.

use crate::error::{is_already_exists, Result};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use kube::api::PostParams;
use kube::{Api, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info, instrument};

/// Which write made the store accept the desired object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Created,
    Updated,
}

/// Kinds that can be synchronized with [`sync_resource`]
pub trait Reconcilable:
    Resource<DynamicType = ()> + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Copy fields the store refuses to change from the live object onto the
    /// desired one. Runs after the resourceVersion has been carried over.
    fn preserve_immutable_fields(&mut self, _live: &Self) {}
}

impl Reconcilable for ConfigMap {}

impl Reconcilable for Service {
    fn preserve_immutable_fields(&mut self, live: &Self) {
        let Some(live_spec) = live.spec.as_ref() else {
            return;
        };
        let spec = self.spec.get_or_insert_with(Default::default);
        spec.cluster_ip = live_spec.cluster_ip.clone();
        spec.cluster_ips = live_spec.cluster_ips.clone();
    }
}

impl Reconcilable for Job {
    fn preserve_immutable_fields(&mut self, live: &Self) {
        let Some(live_spec) = live.spec.as_ref() else {
            return;
        };
        let Some(spec) = self.spec.as_mut() else {
            return;
        };
        // Both are generated by the job controller and frozen after creation
        spec.selector = live_spec.selector.clone();
        let live_labels = live_spec
            .template
            .metadata
            .as_ref()
            .and_then(|m| m.labels.clone());
        spec.template
            .metadata
            .get_or_insert_with(Default::default)
            .labels = live_labels;
    }
}

/// Create the desired object, or update the existing one with the same name.
///
/// Errors other than "already exists" on create, and any error of the
/// fallback get/replace, are returned as-is.
#[instrument(skip(api, desired), fields(kind = %K::kind(&()), name = %desired.name_any()))]
pub async fn sync_resource<K: Reconcilable>(api: &Api<K>, mut desired: K) -> Result<(K, SyncOutcome)> {
    let name = desired.name_any();

    match api.create(&PostParams::default(), &desired).await {
        Ok(created) => {
            info!("Created {} {}", K::kind(&()), name);
            Ok((created, SyncOutcome::Created))
        }
        Err(e) if is_already_exists(&e) => {
            debug!("{} {} already exists, updating", K::kind(&()), name);
            let live = api.get(&name).await?;
            desired.meta_mut().resource_version = live.resource_version();
            desired.preserve_immutable_fields(&live);

            let updated = api.replace(&name, &PostParams::default(), &desired).await?;
            info!("Updated {} {}", K::kind(&()), name);
            Ok((updated, SyncOutcome::Updated))
        }
        Err(e) => Err(e.into()),
    }
}
