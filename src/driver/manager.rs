// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Re-runs the TLS bootstrap whenever the server secret may need it.

use crate::bootstrap::{BootstrapOutcome, TlsBootstrapper};
use crate::certs::{resolve_mode, CertificateMode};
use crate::config::Config;
use crate::error::{Result, WebhookCertsError};
use kube::Client;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

/// Events that trigger a bootstrap pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapEvent {
    /// The server TLS secret was deleted or never existed
    SecretRemoved,
    /// The server TLS secret was created or changed
    SecretObserved,
    /// Periodic safety net
    Resync,
}

/// Serializes bootstrap passes. Events from the secret reconciler and the
/// resync timer all funnel into a single loop, so at most one pass runs at
/// a time.
pub struct BootstrapManager {
    client: Client,
    bootstrapper: TlsBootstrapper,
    resync_interval: Duration,
    cancel: CancellationToken,
    event_rx: mpsc::Receiver<BootstrapEvent>,
}

/// Handle to send events to the BootstrapManager
#[derive(Clone)]
pub struct BootstrapManagerHandle {
    event_tx: mpsc::Sender<BootstrapEvent>,
}

impl BootstrapManagerHandle {
    pub async fn send(&self, event: BootstrapEvent) {
        if let Err(e) = self.event_tx.send(event).await {
            error!("Failed to send event to BootstrapManager: {}", e);
        }
    }
}

impl BootstrapManager {
    pub fn new(
        client: Client,
        bootstrapper: TlsBootstrapper,
        config: &Config,
        cancel: CancellationToken,
    ) -> (Self, BootstrapManagerHandle) {
        let (event_tx, event_rx) = mpsc::channel(256);

        let manager = Self {
            client,
            bootstrapper,
            resync_interval: config.resync_interval,
            cancel,
            event_rx,
        };

        (manager, BootstrapManagerHandle { event_tx })
    }

    /// Process events until cancelled or every handle is dropped
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut resync = tokio::time::interval(self.resync_interval);
        resync.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("BootstrapManager started");
        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("BootstrapManager cancelled");
                    break;
                }
                _ = resync.tick() => BootstrapEvent::Resync,
                event = self.event_rx.recv() => match event {
                    Some(event) => event,
                    None => {
                        debug!("All event senders dropped, stopping");
                        break;
                    }
                },
            };
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("BootstrapManager cancelled");
                    break;
                }
                _ = self.handle_event(event) => {}
            }
        }

        Ok(())
    }

    async fn handle_event(&self, event: BootstrapEvent) {
        debug!("Handling event: {:?}", event);

        match event {
            BootstrapEvent::SecretObserved => {
                debug!("Server TLS secret present, nothing to do");
            }
            BootstrapEvent::SecretRemoved | BootstrapEvent::Resync => match self.reconcile().await {
                Ok(()) => {}
                Err(WebhookCertsError::Cancelled(what)) => info!("{} cancelled", what),
                // The next event or resync retries from whatever was left behind
                Err(e) => error!("TLS bootstrap pass failed: {}", e),
            },
        }
    }

    /// One bootstrap pass. Cancellation drops the pass wherever it is, before
    /// any further remote call is made.
    pub async fn reconcile(&self) -> Result<()> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(WebhookCertsError::Cancelled("bootstrap pass".to_string())),
            res = self.reconcile_pass() => res,
        }
    }

    #[instrument(skip(self))]
    async fn reconcile_pass(&self) -> Result<()> {
        let settings = self.bootstrapper.settings();
        let mode = resolve_mode(&self.client, &settings.server_tls_secret, &settings.namespace).await?;
        if mode == Some(CertificateMode::ExternallyManaged) {
            debug!("Server TLS secret is managed by cert-manager, skipping bootstrap");
            return Ok(());
        }

        self.bootstrapper.clean_stale_job().await?;

        match self.bootstrapper.run(&self.cancel).await? {
            BootstrapOutcome::AlreadyProvisioned => debug!("Server TLS secret already provisioned"),
            BootstrapOutcome::Provisioned => info!("Server TLS secret provisioned"),
        }
        Ok(())
    }
}
