// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-identity decision: given what exists on each side, pick one action.

use crate::config::{Config, SyncMode};
use crate::constants::labels;
use crate::sync::conflict::resolve_immutability_conflict;
use crate::sync::merge::{build_copy, compute_update, ConflictReason, CopyStamp, MergeOutcome};
use crate::sync::names::NameMapper;
use crate::sync::ownership::OwnershipClassifier;
use crate::sync::record::{ObjectRef, SecretRecord, Side};
use std::collections::BTreeMap;
use std::fmt;

/// Identity pair handed to a reconcile; either side may be unknown
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ReconcileRequest {
    pub physical_ref: Option<ObjectRef>,
    pub virtual_ref: Option<ObjectRef>,
}

impl fmt::Display for ReconcileRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn show(id: &Option<ObjectRef>) -> String {
            id.as_ref().map_or_else(|| "-".to_string(), ObjectRef::to_string)
        }
        write!(f, "physical={} virtual={}", show(&self.physical_ref), show(&self.virtual_ref))
    }
}

/// Why a reconcile did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// Neither side exists
    NoObjects,
    /// The host secret does not opt into syncing
    NotEligible,
    /// The virtual secret was not created by us and is left alone
    NotOwned,
    /// Both sides already agree
    InSync,
    /// An unrelated secret already occupies the counterpart identity
    NameCollision,
    /// A host copy lost the annotations pointing at its virtual origin
    MissingOrigin,
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Skip::NoObjects => "no objects on either side",
            Skip::NotEligible => "host secret is not eligible for syncing",
            Skip::NotOwned => "virtual secret is not managed by this plugin",
            Skip::InSync => "already in sync",
            Skip::NameCollision => "counterpart name is taken by an unmanaged secret",
            Skip::MissingOrigin => "host copy has no origin annotations",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteReason {
    /// The object this copy mirrors is gone
    OriginDeleted,
    /// The host secret no longer opts into syncing
    EligibilityRevoked,
    /// The host secret now maps to a different virtual namespace
    Relocated,
}

impl fmt::Display for DeleteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteReason::OriginDeleted => f.write_str("origin secret no longer exists"),
            DeleteReason::EligibilityRevoked => f.write_str("host secret is no longer eligible"),
            DeleteReason::Relocated => f.write_str("host secret now targets another namespace"),
        }
    }
}

/// The single write a reconcile should perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Skip(Skip),
    Create { side: Side, record: SecretRecord },
    Update { side: Side, record: SecretRecord },
    Delete { side: Side, target: ObjectRef, reason: DeleteReason },
    /// Delete an immutable copy so the next pass can create it again
    Recreate { side: Side, target: ObjectRef, reason: ConflictReason },
}

impl Decision {
    pub fn action(&self) -> SyncAction {
        match self {
            Decision::Skip(_) => SyncAction::NoOp,
            Decision::Create { side, record } => SyncAction::Created {
                side: *side,
                target: record.id.clone(),
            },
            Decision::Update { side, record } => SyncAction::Updated {
                side: *side,
                target: record.id.clone(),
            },
            Decision::Delete { side, target, .. } => SyncAction::Deleted {
                side: *side,
                target: target.clone(),
            },
            Decision::Recreate { side, target, .. } => SyncAction::Recreating {
                side: *side,
                target: target.clone(),
            },
        }
    }
}

/// Outcome of a completed reconcile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    NoOp,
    Created { side: Side, target: ObjectRef },
    Updated { side: Side, target: ObjectRef },
    Deleted { side: Side, target: ObjectRef },
    /// An immutable copy was deleted; the identity must be reconciled again
    Recreating { side: Side, target: ObjectRef },
}

impl SyncAction {
    pub fn requires_requeue(&self) -> bool {
        matches!(self, SyncAction::Recreating { .. })
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncAction::NoOp => f.write_str("no-op"),
            SyncAction::Created { side, target } => write!(f, "create {} {}", side, target),
            SyncAction::Updated { side, target } => write!(f, "update {} {}", side, target),
            SyncAction::Deleted { side, target } => write!(f, "delete {} {}", side, target),
            SyncAction::Recreating { side, target } => write!(f, "recreate {} {}", side, target),
        }
    }
}

/// Stateless decision engine; one instance is shared by every reconcile.
#[derive(Debug, Clone)]
pub struct ReconcileDecider {
    names: NameMapper,
    ownership: OwnershipClassifier,
    watch_namespace: Option<String>,
}

impl ReconcileDecider {
    pub fn new(config: &Config) -> Self {
        Self {
            names: NameMapper::new(config),
            ownership: OwnershipClassifier::new(config),
            watch_namespace: config.watch_namespace.clone(),
        }
    }

    pub fn names(&self) -> &NameMapper {
        &self.names
    }

    pub fn ownership(&self) -> &OwnershipClassifier {
        &self.ownership
    }

    /// Pre-filter for requests whose virtual namespace is outside the watched one
    pub fn should_skip(&self, namespace: &str) -> bool {
        self.watch_namespace
            .as_deref()
            .is_some_and(|watched| watched != namespace)
    }

    /// Identity pair a change to a host secret has to reconcile
    pub fn request_for_physical(&self, pobj: &SecretRecord) -> ReconcileRequest {
        let virtual_ref = if self.ownership.is_translated_copy(pobj) {
            NameMapper::origin_from_annotations(&pobj.annotations)
        } else {
            Some(self.expected_virtual(pobj))
        };

        ReconcileRequest {
            physical_ref: Some(pobj.id.clone()),
            virtual_ref,
        }
    }

    /// Identity pair a change to a virtual secret has to reconcile
    pub fn request_for_virtual(&self, vobj: &SecretRecord) -> ReconcileRequest {
        let mirrors_up =
            self.ownership.mode() == SyncMode::Generic && !self.ownership.is_reconciler_owned(vobj);
        let physical_ref = if mirrors_up {
            self.names.translated(&vobj.id)
        } else {
            self.names.counterpart(Side::Virtual, &vobj.id, None)
        };

        ReconcileRequest {
            physical_ref: Some(physical_ref),
            virtual_ref: Some(vobj.id.clone()),
        }
    }

    /// Decide what to do for one identity pair.
    ///
    /// Virtual secrets without our managed-by label are never written to or
    /// deleted, whatever happens on the host side.
    pub fn decide(&self, pobj: Option<&SecretRecord>, vobj: Option<&SecretRecord>) -> Decision {
        match (pobj, vobj) {
            (None, None) => Decision::Skip(Skip::NoObjects),
            (Some(pobj), None) => self.decide_physical_only(pobj),
            (None, Some(vobj)) => self.decide_virtual_only(vobj),
            (Some(pobj), Some(vobj)) => self.decide_pair(pobj, vobj),
        }
    }

    fn decide_physical_only(&self, pobj: &SecretRecord) -> Decision {
        if self.ownership.is_translated_copy(pobj) {
            return match NameMapper::origin_from_annotations(&pobj.annotations) {
                Some(_) => Decision::Delete {
                    side: Side::Physical,
                    target: pobj.id.clone(),
                    reason: DeleteReason::OriginDeleted,
                },
                None => Decision::Skip(Skip::MissingOrigin),
            };
        }
        if !self.ownership.is_sync_eligible(pobj) {
            return Decision::Skip(Skip::NotEligible);
        }

        Decision::Create {
            side: Side::Virtual,
            record: build_copy(pobj, self.expected_virtual(pobj), &self.down_stamp()),
        }
    }

    fn decide_virtual_only(&self, vobj: &SecretRecord) -> Decision {
        if self.ownership.is_reconciler_owned(vobj) {
            return Decision::Delete {
                side: Side::Virtual,
                target: vobj.id.clone(),
                reason: DeleteReason::OriginDeleted,
            };
        }

        match self.ownership.mode() {
            SyncMode::Generic => Decision::Create {
                side: Side::Physical,
                record: build_copy(vobj, self.names.translated(&vobj.id), &self.up_stamp(&vobj.id)),
            },
            SyncMode::Annotation => Decision::Skip(Skip::NotOwned),
        }
    }

    fn decide_pair(&self, pobj: &SecretRecord, vobj: &SecretRecord) -> Decision {
        if self.ownership.is_reconciler_owned(vobj) {
            if !self.ownership.is_sync_eligible(pobj) {
                return Decision::Delete {
                    side: Side::Virtual,
                    target: vobj.id.clone(),
                    reason: DeleteReason::EligibilityRevoked,
                };
            }
            if self.expected_virtual(pobj) != vobj.id {
                return Decision::Delete {
                    side: Side::Virtual,
                    target: vobj.id.clone(),
                    reason: DeleteReason::Relocated,
                };
            }
            return merge_into(Side::Virtual, pobj, vobj, &self.down_stamp());
        }

        if self.ownership.is_translated_copy(pobj) {
            if NameMapper::origin_from_annotations(&pobj.annotations).as_ref() != Some(&vobj.id) {
                return Decision::Skip(Skip::NameCollision);
            }
            return merge_into(Side::Physical, vobj, pobj, &self.up_stamp(&vobj.id));
        }

        if self.ownership.is_sync_eligible(pobj) {
            Decision::Skip(Skip::NameCollision)
        } else {
            Decision::Skip(Skip::NotOwned)
        }
    }

    fn expected_virtual(&self, pobj: &SecretRecord) -> ObjectRef {
        self.names
            .counterpart(Side::Physical, &pobj.id, self.ownership.namespace_override(pobj))
    }

    fn down_stamp(&self) -> CopyStamp {
        CopyStamp {
            labels: BTreeMap::from([(
                labels::MANAGED_BY.to_string(),
                self.ownership.plugin_name().to_string(),
            )]),
            ..Default::default()
        }
    }

    // Host copies of tenant secrets are append-only
    fn up_stamp(&self, origin: &ObjectRef) -> CopyStamp {
        CopyStamp {
            labels: BTreeMap::from([(
                labels::TRANSLATION_MARKER.to_string(),
                self.ownership.vcluster_name().to_string(),
            )]),
            // The marker keeps the copy from being mirrored back down
            labels_win: true,
            annotations: NameMapper::origin_annotations(origin),
            force_immutable: true,
        }
    }
}

fn merge_into(side: Side, source: &SecretRecord, destination: &SecretRecord, stamp: &CopyStamp) -> Decision {
    match compute_update(source, destination, stamp) {
        MergeOutcome::Unchanged => Decision::Skip(Skip::InSync),
        MergeOutcome::Update(record) => Decision::Update {
            side,
            record: *record,
        },
        MergeOutcome::Conflict(reason) => resolve_immutability_conflict(side, destination, reason),
    }
}
