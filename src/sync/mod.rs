// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reconciliation of secrets between the host and the virtual cluster.

pub mod conflict;
pub mod decider;
pub mod manager;
pub mod merge;
pub mod names;
pub mod ownership;
pub mod reconciler;
pub mod record;
pub mod store;

pub use decider::{Decision, ReconcileDecider, ReconcileRequest, SyncAction};
pub use manager::{SyncEvent, SyncManager, SyncManagerHandle};
pub use reconciler::Reconciler;
pub use record::{ObjectRef, SecretRecord, Side};
pub use store::SecretStore;
