// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Idempotent deletion

use crate::error::{is_not_found, Result};
use kube::api::DeleteParams;
use kube::Api;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

/// Delete an object by name. An object that is already gone counts as deleted.
///
/// Returns whether this call removed something.
pub async fn delete_if_exists<K>(api: &Api<K>, name: &str, params: &DeleteParams) -> Result<bool>
where
    K: kube::Resource + Clone + DeserializeOwned + Debug,
{
    match api.delete(name, params).await {
        Ok(_) => Ok(true),
        Err(e) if is_not_found(&e) => {
            debug!("{} already deleted", name);
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
