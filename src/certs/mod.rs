// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

pub mod source;

pub use source::{resolve_annotations, resolve_mode, webhook_annotations, CertificateMode};
