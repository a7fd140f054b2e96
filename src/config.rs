// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{annotations, kubeconfig, DEFAULT_PLUGIN_NAME, DEFAULT_VCLUSTER_NAME};
use anyhow::{bail, Context, Result};
use std::env;
use std::fmt;
use std::str::FromStr;

/// How physical secrets are selected for mirroring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Only host secrets annotated `<plugin>/sync: "true"` are mirrored into the virtual cluster
    Annotation,
    /// Every host secret is mirrored down, and virtual-native secrets are mirrored up
    Generic,
}

impl FromStr for SyncMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "annotation" => Ok(SyncMode::Annotation),
            "generic" => Ok(SyncMode::Generic),
            other => bail!("unknown sync mode '{}', expected 'annotation' or 'generic'", other),
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Annotation => f.write_str("annotation"),
            SyncMode::Generic => f.write_str("generic"),
        }
    }
}

/// Syncer configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Default namespace to mirror host secrets to in the virtual cluster
    pub destination_namespace: String,
    /// Namespace in the host cluster holding the physical secrets
    pub host_namespace: String,
    /// Plugin identity, written as the managed-by label value
    pub plugin_name: String,
    /// Name of the virtual cluster, used for name translation
    pub vcluster_name: String,
    pub mode: SyncMode,
    /// Ignore virtual-side requests outside this namespace
    pub watch_namespace: Option<String>,
    /// Host secret holding the virtual cluster kubeconfig
    pub kubeconfig_secret: String,
    pub testing_mode: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let destination_namespace = lookup("DESTINATION_NAMESPACE")
            .context("DESTINATION_NAMESPACE environment variable not set")?;
        let host_namespace =
            lookup("HOST_NAMESPACE").context("HOST_NAMESPACE environment variable not set")?;
        let plugin_name = lookup("PLUGIN_NAME").unwrap_or_else(|| DEFAULT_PLUGIN_NAME.to_string());
        let vcluster_name =
            lookup("VCLUSTER_NAME").unwrap_or_else(|| DEFAULT_VCLUSTER_NAME.to_string());
        let mode = match lookup("SYNC_MODE") {
            Some(raw) => raw.parse().context("invalid SYNC_MODE")?,
            None => SyncMode::Annotation,
        };
        let watch_namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty());
        let kubeconfig_secret = lookup("VCLUSTER_KUBECONFIG_SECRET")
            .unwrap_or_else(|| format!("{}{}", kubeconfig::SECRET_PREFIX, vcluster_name));
        // Uses the local kubeconfig for the virtual cluster instead of the kubeconfig secret
        let testing_mode = lookup("TESTING_MODE")
            .and_then(|v| v.parse().ok())
            .unwrap_or(false);

        Ok(Config {
            destination_namespace,
            host_namespace,
            plugin_name,
            vcluster_name,
            mode,
            watch_namespace,
            kubeconfig_secret,
            testing_mode,
        })
    }

    /// Annotation key that opts a host secret into syncing
    pub fn sync_annotation(&self) -> String {
        format!("{}/{}", self.plugin_name, annotations::SYNC_SUFFIX)
    }

    /// Annotation key that overrides the destination namespace
    pub fn namespace_annotation(&self) -> String {
        format!("{}/{}", self.plugin_name, annotations::NAMESPACE_SUFFIX)
    }
}
