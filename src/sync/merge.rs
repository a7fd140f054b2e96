// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Field-level merge of a source secret onto its counterpart.
//!
//! The source is authoritative: annotations, labels and payload are replaced
//! as whole maps, never merged per key. Labels and annotations owned by the
//! syncer for a given direction are described by a [`CopyStamp`].

use crate::sync::record::{ObjectRef, SecretRecord};
use std::collections::BTreeMap;
use std::fmt;

/// Metadata the syncer adds to every copy it writes in one direction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyStamp {
    /// Layered under the source labels unless `labels_win` is set
    pub labels: BTreeMap<String, String>,
    /// Stamp labels override source labels with the same key
    pub labels_win: bool,
    /// Added last, so they always override source annotations
    pub annotations: BTreeMap<String, String>,
    /// Copies are immutable regardless of the source
    pub force_immutable: bool,
}

impl CopyStamp {
    fn expected_labels(&self, source: &SecretRecord) -> BTreeMap<String, String> {
        let stamp = self.labels.iter().map(|(k, v)| (k.clone(), v.clone()));
        let mut labels = source.labels.clone();
        if self.labels_win {
            labels.extend(stamp);
        } else {
            for (key, value) in stamp {
                labels.entry(key).or_insert(value);
            }
        }
        labels
    }

    fn expected_annotations(&self, source: &SecretRecord) -> BTreeMap<String, String> {
        let mut annotations = source.annotations.clone();
        annotations.extend(self.annotations.iter().map(|(k, v)| (k.clone(), v.clone())));
        annotations
    }

    fn expected_immutable(&self, source: &SecretRecord) -> bool {
        self.force_immutable || source.immutable
    }
}

/// Why an immutable destination cannot be updated in place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    /// The destination is immutable but the copy should not be
    ClearImmutable,
    /// The destination is immutable and its payload differs from the source
    PayloadChanged,
    /// The secret type differs, which the store never allows to change
    TypeChanged,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictReason::ClearImmutable => f.write_str("immutable flag cannot be cleared"),
            ConflictReason::PayloadChanged => f.write_str("payload of an immutable secret changed"),
            ConflictReason::TypeChanged => f.write_str("secret type changed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Destination already matches; skip the write
    Unchanged,
    /// Destination with every differing field replaced
    Update(Box<SecretRecord>),
    /// The change cannot be applied in place
    Conflict(ConflictReason),
}

/// Compute the update that brings `destination` in line with `source`.
pub fn compute_update(source: &SecretRecord, destination: &SecretRecord, stamp: &CopyStamp) -> MergeOutcome {
    let immutable = stamp.expected_immutable(source);

    if source.secret_type() != destination.secret_type() {
        return MergeOutcome::Conflict(ConflictReason::TypeChanged);
    }
    if destination.immutable {
        if !immutable {
            return MergeOutcome::Conflict(ConflictReason::ClearImmutable);
        }
        if !source.same_payload(destination) {
            return MergeOutcome::Conflict(ConflictReason::PayloadChanged);
        }
    }

    let mut updated: Option<SecretRecord> = None;

    // Annotations added on the destination side are dropped
    let annotations = stamp.expected_annotations(source);
    if destination.annotations != annotations {
        new_if_none(&mut updated, destination).annotations = annotations;
    }

    let labels = stamp.expected_labels(source);
    if destination.labels != labels {
        new_if_none(&mut updated, destination).labels = labels;
    }

    if destination.data != source.data {
        new_if_none(&mut updated, destination).data = source.data.clone();
    }

    if destination.string_data != source.string_data {
        new_if_none(&mut updated, destination).string_data = source.string_data.clone();
    }

    if destination.immutable != immutable {
        new_if_none(&mut updated, destination).immutable = immutable;
    }

    match updated {
        Some(record) => MergeOutcome::Update(Box::new(record)),
        None => MergeOutcome::Unchanged,
    }
}

/// Build the counterpart of `source` at `target`, ready to be created.
pub fn build_copy(source: &SecretRecord, target: ObjectRef, stamp: &CopyStamp) -> SecretRecord {
    SecretRecord {
        id: target,
        labels: stamp.expected_labels(source),
        annotations: stamp.expected_annotations(source),
        data: source.data.clone(),
        string_data: source.string_data.clone(),
        type_: source.type_.clone(),
        immutable: stamp.expected_immutable(source),
        resource_version: None,
    }
}

fn new_if_none<'a>(updated: &'a mut Option<SecretRecord>, destination: &SecretRecord) -> &'a mut SecretRecord {
    updated.get_or_insert_with(|| destination.clone())
}
