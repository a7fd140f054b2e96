// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reads both sides, asks the decider what to do and performs that one write.

use crate::constants::labels;
use crate::error::{Result, StoreError, SyncError, WriteOp};
use crate::sync::decider::{Decision, ReconcileDecider, ReconcileRequest, Skip, SyncAction};
use crate::sync::record::{ObjectRef, SecretRecord, Side};
use crate::sync::store::SecretStore;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct Reconciler {
    decider: Arc<ReconcileDecider>,
    physical: Arc<dyn SecretStore>,
    virtual_store: Arc<dyn SecretStore>,
}

impl Reconciler {
    pub fn new(
        decider: Arc<ReconcileDecider>,
        physical: Arc<dyn SecretStore>,
        virtual_store: Arc<dyn SecretStore>,
    ) -> Self {
        Self {
            decider,
            physical,
            virtual_store,
        }
    }

    pub fn decider(&self) -> &ReconcileDecider {
        &self.decider
    }

    fn store(&self, side: Side) -> &dyn SecretStore {
        match side {
            Side::Physical => self.physical.as_ref(),
            Side::Virtual => self.virtual_store.as_ref(),
        }
    }

    /// Reconcile one identity pair.
    ///
    /// Safe to call any number of times: a pair already in sync performs no
    /// write. Failed writes come back as retryable errors for the scheduler.
    #[instrument(skip(self), fields(request = %request))]
    pub async fn reconcile(&self, request: &ReconcileRequest) -> Result<SyncAction> {
        let pobj = self.fetch(Side::Physical, request.physical_ref.as_ref()).await?;
        let vobj = self.fetch(Side::Virtual, request.virtual_ref.as_ref()).await?;

        let decision = self.decider.decide(pobj.as_ref(), vobj.as_ref());
        self.apply(decision).await
    }

    /// Requests for owned virtual copies of the request's host secret that no
    /// longer sit at its current target, e.g. after a namespace override moved.
    pub async fn stale_copies(&self, request: &ReconcileRequest) -> Result<Vec<ReconcileRequest>> {
        let (Some(physical_ref), Some(virtual_ref)) = (&request.physical_ref, &request.virtual_ref) else {
            return Ok(Vec::new());
        };

        let copies = self
            .virtual_store
            .find_labelled(
                &physical_ref.name,
                labels::MANAGED_BY,
                self.decider.ownership().plugin_name(),
            )
            .await
            .map_err(|source| SyncError::StoreRead {
                side: Side::Virtual,
                target: virtual_ref.clone(),
                source,
            })?;

        Ok(copies
            .into_iter()
            .filter(|copy| copy.id != *virtual_ref)
            .map(|copy| ReconcileRequest {
                physical_ref: Some(physical_ref.clone()),
                virtual_ref: Some(copy.id),
            })
            .collect())
    }

    async fn fetch(&self, side: Side, id: Option<&ObjectRef>) -> Result<Option<SecretRecord>> {
        let Some(id) = id else {
            return Ok(None);
        };

        match self.store(side).get(id).await {
            Ok(record) => Ok(record),
            Err(StoreError::Decode { target, found }) => Err(SyncError::TypeMismatch { side, target, found }),
            Err(source) => Err(SyncError::StoreRead {
                side,
                target: id.clone(),
                source,
            }),
        }
    }

    async fn apply(&self, decision: Decision) -> Result<SyncAction> {
        let action = decision.action();

        match decision {
            Decision::Skip(Skip::NameCollision) => {
                warn!("Not syncing: {}", Skip::NameCollision);
            }
            Decision::Skip(reason) => {
                debug!("Nothing to do: {}", reason);
            }
            Decision::Create { side, record } => {
                self.store(side)
                    .create(&record)
                    .await
                    .map_err(|source| write_error(WriteOp::Create, side, &record.id, source))?;
                info!("Created {} secret {}", side, record.id);
            }
            Decision::Update { side, record } => {
                self.store(side)
                    .update(&record)
                    .await
                    .map_err(|source| write_error(WriteOp::Update, side, &record.id, source))?;
                info!("Updated {} secret {}", side, record.id);
            }
            Decision::Delete { side, target, reason } => {
                self.store(side)
                    .delete(&target)
                    .await
                    .map_err(|source| write_error(WriteOp::Delete, side, &target, source))?;
                info!("Deleted {} secret {} because {}", side, target, reason);
            }
            Decision::Recreate { side, target, reason } => {
                self.store(side)
                    .delete(&target)
                    .await
                    .map_err(|source| write_error(WriteOp::Delete, side, &target, source))?;
                info!(
                    "Deleted {} secret {} ({}), it will be recreated on the next pass",
                    side, target, reason
                );
            }
        }

        Ok(action)
    }
}

fn write_error(op: WriteOp, side: Side, target: &ObjectRef, source: StoreError) -> SyncError {
    SyncError::StoreWrite {
        op,
        side,
        target: target.clone(),
        source,
    }
}
