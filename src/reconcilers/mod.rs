// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

pub mod tls_secret;

pub use tls_secret::{SecretWatchState, TlsSecretReconciler};
