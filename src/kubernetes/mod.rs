// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes primitives shared by every reconciliation routine.

pub mod delete;
pub mod sync;

pub use delete::delete_if_exists;
pub use sync::{sync_resource, Reconcilable, SyncOutcome};
