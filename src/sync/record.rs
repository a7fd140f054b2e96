// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! In-memory secret model shared by both sides of the sync.

use crate::constants::DEFAULT_SECRET_TYPE;
use bytes::Bytes;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;
use std::fmt;

/// Which store an object lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The host cluster
    Physical,
    /// The tenant-scoped virtual cluster
    Virtual,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Physical => f.write_str("physical"),
            Side::Virtual => f.write_str("virtual"),
        }
    }
}

/// Namespaced identity of a secret
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectRef {
    pub namespace: String,
    pub name: String,
}

impl ObjectRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A secret as seen by the reconciler.
///
/// Empty maps and absent maps are the same thing here, which matches how the
/// API server compares them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretRecord {
    pub id: ObjectRef,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub data: BTreeMap<String, Bytes>,
    pub string_data: BTreeMap<String, String>,
    pub type_: Option<String>,
    pub immutable: bool,
    /// Optimistic concurrency token of the stored object, never copied to a counterpart
    pub resource_version: Option<String>,
}

impl SecretRecord {
    pub fn new(id: ObjectRef) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    /// The secret type, defaulted the way the API server defaults it
    pub fn secret_type(&self) -> &str {
        self.type_.as_deref().unwrap_or(DEFAULT_SECRET_TYPE)
    }

    /// Whether both records carry the same payload (binary and string data)
    pub fn same_payload(&self, other: &SecretRecord) -> bool {
        self.data == other.data && self.string_data == other.string_data
    }

    /// Convert back into a Kubernetes Secret for writing
    pub fn into_secret(self) -> Secret {
        fn non_empty<V>(map: BTreeMap<String, V>) -> Option<BTreeMap<String, V>> {
            (!map.is_empty()).then_some(map)
        }

        let data = self
            .data
            .into_iter()
            .map(|(k, v)| (k, ByteString(v.to_vec())))
            .collect();

        Secret {
            metadata: ObjectMeta {
                name: Some(self.id.name),
                namespace: Some(self.id.namespace),
                labels: non_empty(self.labels),
                annotations: non_empty(self.annotations),
                resource_version: self.resource_version,
                ..Default::default()
            },
            data: non_empty(data),
            string_data: non_empty(self.string_data),
            type_: self.type_,
            immutable: self.immutable.then_some(true),
        }
    }
}

impl From<Secret> for SecretRecord {
    fn from(secret: Secret) -> Self {
        let metadata = secret.metadata;
        SecretRecord {
            id: ObjectRef {
                namespace: metadata.namespace.unwrap_or_default(),
                name: metadata.name.unwrap_or_default(),
            },
            labels: metadata.labels.unwrap_or_default(),
            annotations: metadata.annotations.unwrap_or_default(),
            data: secret
                .data
                .unwrap_or_default()
                .into_iter()
                .map(|(k, v)| (k, Bytes::from(v.0)))
                .collect(),
            string_data: secret.string_data.unwrap_or_default(),
            type_: secret.type_,
            immutable: secret.immutable.unwrap_or(false),
            resource_version: metadata.resource_version,
        }
    }
}
