// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Decides which secrets take part in the sync and which ones we own.

use crate::config::{Config, SyncMode};
use crate::constants::labels;
use crate::sync::record::SecretRecord;

#[derive(Debug, Clone)]
pub struct OwnershipClassifier {
    mode: SyncMode,
    plugin_name: String,
    vcluster_name: String,
    sync_annotation: String,
    namespace_annotation: String,
}

impl OwnershipClassifier {
    pub fn new(config: &Config) -> Self {
        Self {
            mode: config.mode,
            plugin_name: config.plugin_name.clone(),
            vcluster_name: config.vcluster_name.clone(),
            sync_annotation: config.sync_annotation(),
            namespace_annotation: config.namespace_annotation(),
        }
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    pub fn vcluster_name(&self) -> &str {
        &self.vcluster_name
    }

    /// Whether a host secret should be mirrored into the virtual cluster
    pub fn is_sync_eligible(&self, pobj: &SecretRecord) -> bool {
        match self.mode {
            SyncMode::Annotation => {
                pobj.annotation(&self.sync_annotation) == Some("true")
                    && !has_translation_marker(pobj)
            }
            SyncMode::Generic => !self.is_translated_copy(pobj),
        }
    }

    /// Whether a virtual secret was put there by this plugin
    pub fn is_reconciler_owned(&self, vobj: &SecretRecord) -> bool {
        vobj.label(labels::MANAGED_BY) == Some(self.plugin_name.as_str())
    }

    /// Whether a host secret is a copy of a virtual-native secret (generic mode only)
    pub fn is_translated_copy(&self, pobj: &SecretRecord) -> bool {
        self.mode == SyncMode::Generic
            && pobj.label(labels::TRANSLATION_MARKER) == Some(self.vcluster_name.as_str())
    }

    /// Destination namespace requested by a host secret, if any
    pub fn namespace_override<'a>(&self, pobj: &'a SecretRecord) -> Option<&'a str> {
        pobj.annotation(&self.namespace_annotation)
            .filter(|ns| !ns.is_empty())
    }
}

fn has_translation_marker(pobj: &SecretRecord) -> bool {
    pobj.label(labels::TRANSLATION_MARKER)
        .is_some_and(|v| !v.is_empty())
}
