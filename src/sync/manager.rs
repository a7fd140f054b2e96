// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Central coordinator that runs reconciles for watch events.

use crate::constants::{requeue, EVENT_CHANNEL_CAPACITY};
use crate::sync::decider::ReconcileRequest;
use crate::sync::reconciler::Reconciler;
use crate::sync::record::Side;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Events that watchers send to the SyncManager
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A secret on `side` was created, updated or deleted
    SecretChanged { side: Side, request: ReconcileRequest },
    /// A request is due again after a failure or a recreate
    Requeue { request: ReconcileRequest, attempt: u32 },
}

/// Runs one reconcile at a time, so reconciles of the same identity never overlap.
pub struct SyncManager {
    reconciler: Reconciler,
    event_rx: mpsc::Receiver<SyncEvent>,
    handle: SyncManagerHandle,
}

/// Handle to send events to the SyncManager
#[derive(Clone)]
pub struct SyncManagerHandle {
    event_tx: mpsc::Sender<SyncEvent>,
}

/// When to revisit a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Retry {
    attempt: u32,
    delay: Duration,
}

impl SyncManagerHandle {
    pub async fn send(&self, event: SyncEvent) {
        if let Err(e) = self.event_tx.send(event).await {
            error!("Failed to send event to SyncManager: {}", e);
        }
    }
}

impl SyncManager {
    pub fn new(reconciler: Reconciler) -> (Self, SyncManagerHandle) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let handle = SyncManagerHandle { event_tx };

        let manager = Self {
            reconciler,
            event_rx,
            handle: handle.clone(),
        };
        (manager, handle)
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("SyncManager started, listening for events...");

        while let Some(event) = self.event_rx.recv().await {
            self.handle_event(event).await;
        }

        Ok(())
    }

    async fn handle_event(&self, event: SyncEvent) {
        match event {
            SyncEvent::SecretChanged { side, request } => {
                debug!("{} secret changed: {}", side, request);
                let sweep = (side == Side::Physical).then(|| request.clone());
                self.run_request(request, 0).await;
                if let Some(request) = sweep {
                    self.sweep_stale_copies(&request).await;
                }
            }
            SyncEvent::Requeue { request, attempt } => {
                debug!("Requeued request {} (attempt {})", request, attempt);
                self.run_request(request, attempt).await;
            }
        }
    }

    async fn run_request(&self, request: ReconcileRequest, attempt: u32) {
        if let Some(retry) = self.process(&request, attempt).await {
            self.requeue(request, retry.attempt, retry.delay);
        }
    }

    /// Copies left behind in another namespace are only reachable from the host event
    async fn sweep_stale_copies(&self, request: &ReconcileRequest) {
        match self.reconciler.stale_copies(request).await {
            Ok(stale) => {
                for request in stale {
                    self.run_request(request, 0).await;
                }
            }
            Err(e) => warn!("Failed to look up stale copies for {}: {}", request, e),
        }
    }

    /// Reconcile one request and tell whether it has to be revisited
    #[instrument(skip(self, request), fields(request = %request))]
    async fn process(&self, request: &ReconcileRequest, attempt: u32) -> Option<Retry> {
        let skipped = request
            .virtual_ref
            .as_ref()
            .is_some_and(|v| self.reconciler.decider().should_skip(&v.namespace));
        if skipped {
            debug!("Skipping request outside the watched namespace");
            return None;
        }

        match self.reconciler.reconcile(request).await {
            Ok(action) if action.requires_requeue() => {
                debug!("Reconciled ({}), revisiting", action);
                Some(Retry {
                    attempt: 0,
                    delay: Duration::from_secs(requeue::RECREATE_SECS),
                })
            }
            Ok(action) => {
                debug!("Reconciled: {}", action);
                None
            }
            Err(e) if e.is_retryable() => {
                let delay = backoff_delay(attempt);
                warn!("Reconciliation error: {}, retrying in {:?}", e, delay);
                Some(Retry {
                    attempt: attempt.saturating_add(1),
                    delay,
                })
            }
            Err(e) => {
                error!("Coding error, dropping request: {}", e);
                None
            }
        }
    }

    fn requeue(&self, request: ReconcileRequest, attempt: u32, delay: Duration) {
        let handle = self.handle.clone();
        tokio::spawn(async move {
            sleep(delay).await;
            handle.send(SyncEvent::Requeue { request, attempt }).await;
        });
    }
}

/// Exponential backoff starting at requeue::INITIAL_SECS with a max cap
pub fn backoff_delay(attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_secs(
        requeue::INITIAL_SECS
            .saturating_mul(factor)
            .min(requeue::MAX_SECS),
    )
}
