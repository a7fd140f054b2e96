// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Point operations the reconciler needs from each side's object store.

use crate::error::StoreError;
use crate::sync::record::{ObjectRef, SecretRecord};
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

/// Client for one side's secrets.
///
/// Implementations validate that what they read really is a secret and
/// report anything else as [`StoreError::Decode`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch a secret, `None` when it does not exist
    async fn get(&self, id: &ObjectRef) -> Result<Option<SecretRecord>, StoreError>;

    async fn create(&self, record: &SecretRecord) -> Result<(), StoreError>;

    /// Replace a secret, guarded by the record's resource version when set
    async fn update(&self, record: &SecretRecord) -> Result<(), StoreError>;

    /// Delete a secret; deleting a missing secret succeeds
    async fn delete(&self, id: &ObjectRef) -> Result<(), StoreError>;

    /// Secrets called `name` in every namespace that carry the label `key=value`
    async fn find_labelled(&self, name: &str, key: &str, value: &str) -> Result<Vec<SecretRecord>, StoreError>;
}
