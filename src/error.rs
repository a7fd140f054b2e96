// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::sync::record::{ObjectRef, Side};
use std::fmt;
use thiserror::Error;

/// Failure reported by a secret store client
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    #[error("object {target} is a {found}, not a Secret")]
    Decode { target: ObjectRef, found: String },

    #[error("Namespace creation failed: {0}")]
    Namespace(String),

    #[error("store error: {0}")]
    Backend(String),
}

/// Store write operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Create,
    Update,
    Delete,
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteOp::Create => f.write_str("create"),
            WriteOp::Update => f.write_str("update"),
            WriteOp::Delete => f.write_str("delete"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Kubeconfig error: {0}")]
    KubeconfigError(String),

    #[error("failed to read {side} secret {target}: {source}")]
    StoreRead {
        side: Side,
        target: ObjectRef,
        #[source]
        source: StoreError,
    },

    #[error("failed to {op} {side} secret {target}: {source}")]
    StoreWrite {
        op: WriteOp,
        side: Side,
        target: ObjectRef,
        #[source]
        source: StoreError,
    },

    #[error("{side} object {target} is not a Secret (found {found})")]
    TypeMismatch {
        side: Side,
        target: ObjectRef,
        found: String,
    },
}

impl SyncError {
    /// Whether the scheduler should requeue the request that produced this error
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SyncError::TypeMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
