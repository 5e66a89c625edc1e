// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! One-shot Kubernetes jobs: building, running and cleaning up.

pub mod lifecycle;
pub mod spec;

pub use lifecycle::JobManager;
pub use spec::{build_job, JobParams};
