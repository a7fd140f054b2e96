// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Watchers that turn secret events on either side into sync events.

pub mod secret;

pub use secret::SecretReconciler;
