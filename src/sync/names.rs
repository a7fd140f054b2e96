// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Identity mapping between host and virtual secrets.

use crate::config::Config;
use crate::constants::annotations;
use crate::sync::record::{ObjectRef, Side};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Maximum length of a Kubernetes object name that is also a DNS label
const MAX_NAME_LEN: usize = 63;
/// Length of the readable prefix kept when a translated name is hashed
const HASHED_PREFIX_LEN: usize = 52;
/// Number of hex characters of the digest appended to a hashed name
const HASH_LEN: usize = 10;

#[derive(Debug, Clone)]
pub struct NameMapper {
    destination_namespace: String,
    host_namespace: String,
    vcluster_name: String,
}

impl NameMapper {
    pub fn new(config: &Config) -> Self {
        Self {
            destination_namespace: config.destination_namespace.clone(),
            host_namespace: config.host_namespace.clone(),
            vcluster_name: config.vcluster_name.clone(),
        }
    }

    /// Identity of the counterpart of an object that lives on `origin`.
    ///
    /// Names are kept as-is. Host objects land in the override namespace when
    /// one is given, else in the destination namespace; virtual objects always
    /// map into the host namespace.
    pub fn counterpart(&self, origin: Side, id: &ObjectRef, override_ns: Option<&str>) -> ObjectRef {
        match origin {
            Side::Physical => {
                let namespace = override_ns
                    .filter(|ns| !ns.is_empty())
                    .unwrap_or(&self.destination_namespace);
                ObjectRef::new(namespace, &id.name)
            }
            Side::Virtual => ObjectRef::new(&self.host_namespace, &id.name),
        }
    }

    /// Host identity of a virtual-native secret mirrored into the host namespace
    pub fn translated(&self, id: &ObjectRef) -> ObjectRef {
        ObjectRef::new(
            &self.host_namespace,
            safe_concat_name(&[&id.name, "x", &id.namespace, "x", &self.vcluster_name]),
        )
    }

    /// Annotations recording the virtual origin on a translated host copy
    pub fn origin_annotations(id: &ObjectRef) -> BTreeMap<String, String> {
        BTreeMap::from([
            (annotations::OBJECT_NAME.to_string(), id.name.clone()),
            (annotations::OBJECT_NAMESPACE.to_string(), id.namespace.clone()),
        ])
    }

    /// Recover the virtual origin of a translated host copy from its annotations
    pub fn origin_from_annotations(annots: &BTreeMap<String, String>) -> Option<ObjectRef> {
        let name = annots.get(annotations::OBJECT_NAME).filter(|n| !n.is_empty())?;
        let namespace = annots
            .get(annotations::OBJECT_NAMESPACE)
            .filter(|n| !n.is_empty())?;
        Some(ObjectRef::new(namespace, name))
    }
}

/// Join name parts with `-`, hashing the result when it would exceed a DNS label.
fn safe_concat_name(parts: &[&str]) -> String {
    let full = parts.join("-");
    if full.len() <= MAX_NAME_LEN {
        return full;
    }

    let digest = format!("{:x}", Sha256::digest(full.as_bytes()));
    let prefix: String = full.chars().take(HASHED_PREFIX_LEN).collect();
    format!("{}-{}", prefix, &digest[..HASH_LEN]).replace(".-", "-")
}
