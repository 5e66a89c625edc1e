// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Watches the server TLS secret and notifies the bootstrap manager when it
//! disappears.

use crate::config::Config;
use crate::driver::{BootstrapEvent, BootstrapManagerHandle};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube_runtime::{watcher, WatchStreamExt};
use kube::{Api, Client, ResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Turns watcher events for a single secret into bootstrap events
#[derive(Debug, Default)]
pub struct SecretWatchState {
    seen_during_init: bool,
}

impl SecretWatchState {
    pub fn on_event(&mut self, event: &watcher::Event<Secret>) -> Option<BootstrapEvent> {
        match event {
            watcher::Event::Init => {
                self.seen_during_init = false;
                None
            }
            watcher::Event::InitApply(_) => {
                self.seen_during_init = true;
                Some(BootstrapEvent::SecretObserved)
            }
            // A (re)list that found nothing means the secret is gone
            watcher::Event::InitDone => {
                (!self.seen_during_init).then_some(BootstrapEvent::SecretRemoved)
            }
            watcher::Event::Apply(_) => Some(BootstrapEvent::SecretObserved),
            watcher::Event::Delete(_) => Some(BootstrapEvent::SecretRemoved),
        }
    }
}

pub struct TlsSecretReconciler {
    client: Client,
    namespace: String,
    secret_name: String,
    handle: BootstrapManagerHandle,
    cancel: CancellationToken,
}

impl TlsSecretReconciler {
    pub fn new(
        client: Client,
        config: &Config,
        handle: BootstrapManagerHandle,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            namespace: config.namespace.clone(),
            secret_name: config.server_tls_secret.clone(),
            handle,
            cancel,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &self.namespace);
        let selector = format!("metadata.name={}", self.secret_name);
        let stream = watcher(secrets, watcher::Config::default().fields(&selector)).default_backoff();
        tokio::pin!(stream);

        info!("Watching secret {}/{}", self.namespace, self.secret_name);
        let mut state = SecretWatchState::default();
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("Secret watch cancelled");
                    break;
                }
                event = stream.next() => match event {
                    Some(Ok(event)) => {
                        if let watcher::Event::Apply(s) | watcher::Event::Delete(s) = &event {
                            debug!("Secret event for {}", s.name_any());
                        }
                        if let Some(e) = state.on_event(&event) {
                            self.handle.send(e).await;
                        }
                    }
                    // The stream retries with backoff on its own
                    Some(Err(e)) => warn!("Secret watch error: {}", e),
                    None => break,
                },
            }
        }

        Ok(())
    }
}
