// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Getting a serving certificate in front of the webhook server.

pub mod deployment;
pub mod orchestrator;
pub mod service;
pub mod serving_cert;

pub use deployment::DeploymentPatch;
pub use orchestrator::{BootstrapOutcome, BootstrapSettings, BootstrapState, TlsBootstrapper};
pub use serving_cert::ServingCertSetup;
