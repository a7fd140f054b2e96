// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for virtual client creation and the secret store.

pub mod client;
pub mod store;

pub use client::create_virtual_client;
pub use store::KubeSecretStore;
