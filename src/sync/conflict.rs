// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Recovery for copies that became immutable and can no longer be updated.
//!
//! The store rejects in-place payload changes on an immutable secret, so the
//! copy is deleted and the identity revisited; the next pass sees only the
//! source and recreates the copy from it.

use crate::sync::decider::Decision;
use crate::sync::merge::ConflictReason;
use crate::sync::record::{SecretRecord, Side};
use tracing::warn;

/// Decide how to recover from an immutable `destination` on `side`.
///
/// Only ever deletes the immutable copy; creation is left to the next pass.
pub fn resolve_immutability_conflict(side: Side, destination: &SecretRecord, reason: ConflictReason) -> Decision {
    warn!(
        "{} secret {} cannot be updated in place ({}), recreating it",
        side, destination.id, reason
    );
    Decision::Recreate {
        side,
        target: destination.id.clone(),
        reason,
    }
}
