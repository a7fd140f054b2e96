// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Secret watcher - watches Secrets on one side and notifies the sync manager.
//!
//! Deletions are forwarded too: the reconcile reads both sides again, so the
//! watcher only has to name the identity pair that changed.

use crate::sync::{ReconcileDecider, ReconcileRequest, SecretRecord, Side, SyncEvent, SyncManagerHandle};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    runtime::{watcher, WatchStreamExt},
    Api, Client,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct SecretReconciler {
    api: Api<Secret>,
    side: Side,
    decider: Arc<ReconcileDecider>,
    sync_handle: SyncManagerHandle,
}

impl SecretReconciler {
    /// Watch the host namespace holding the physical secrets
    pub fn physical(
        client: Client,
        host_namespace: &str,
        decider: Arc<ReconcileDecider>,
        sync_handle: SyncManagerHandle,
    ) -> Self {
        Self {
            api: Api::namespaced(client, host_namespace),
            side: Side::Physical,
            decider,
            sync_handle,
        }
    }

    /// Watch the virtual cluster, restricted to one namespace when given
    pub fn virtual_side(
        client: Client,
        watch_namespace: Option<&str>,
        decider: Arc<ReconcileDecider>,
        sync_handle: SyncManagerHandle,
    ) -> Self {
        let api = match watch_namespace {
            Some(ns) => Api::namespaced(client, ns),
            None => Api::all(client),
        };
        Self {
            api,
            side: Side::Virtual,
            decider,
            sync_handle,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        info!("Watching {} secrets", self.side);

        let mut stream = watcher(self.api.clone(), WatcherConfig::default())
            .default_backoff()
            .touched_objects()
            .boxed();

        while let Some(res) = stream.next().await {
            match res {
                Ok(secret) => self.notify(secret).await,
                Err(e) => warn!("{} secret watch error: {}", self.side, e),
            }
        }

        warn!("{} secret watch ended", self.side);
        Ok(())
    }

    async fn notify(&self, secret: Secret) {
        let record = SecretRecord::from(secret);
        let request = self.request_for(&record);
        debug!("{} secret {} touched, queueing {}", self.side, record.id, request);

        self.sync_handle
            .send(SyncEvent::SecretChanged {
                side: self.side,
                request,
            })
            .await;
    }

    fn request_for(&self, record: &SecretRecord) -> ReconcileRequest {
        match self.side {
            Side::Physical => self.decider.request_for_physical(record),
            Side::Virtual => self.decider.request_for_virtual(record),
        }
    }
}
