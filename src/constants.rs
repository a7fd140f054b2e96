// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Default plugin identity, used as the marker label value and annotation prefix
pub const DEFAULT_PLUGIN_NAME: &str = "host-secret-syncer";

/// Default virtual cluster name, used as the translated-name suffix
pub const DEFAULT_VCLUSTER_NAME: &str = "vcluster";

/// Secret type assumed when a record does not carry one
pub const DEFAULT_SECRET_TYPE: &str = "Opaque";

/// Label keys
pub mod labels {
    /// Set on virtual copies; the value is the plugin identity that owns them
    pub const MANAGED_BY: &str = "plugin.vcluster.loft.sh/managed-by";
    /// Set on objects mirrored from the virtual cluster into the host
    pub const TRANSLATION_MARKER: &str = "vcluster.loft.sh/managed-by";
}

/// Annotation keys
pub mod annotations {
    /// Suffix of the opt-in annotation, `<plugin>/sync`
    pub const SYNC_SUFFIX: &str = "sync";
    /// Suffix of the destination namespace override, `<plugin>/namespace`
    pub const NAMESPACE_SUFFIX: &str = "namespace";
    /// Original virtual name recorded on a translated host copy
    pub const OBJECT_NAME: &str = "vcluster.loft.sh/object-name";
    /// Original virtual namespace recorded on a translated host copy
    pub const OBJECT_NAMESPACE: &str = "vcluster.loft.sh/object-namespace";
}

/// Kubeconfig secret layout for the virtual cluster
pub mod kubeconfig {
    /// Prefix of the default kubeconfig secret name, followed by the vcluster name
    pub const SECRET_PREFIX: &str = "vc-";
    /// Data key holding the kubeconfig
    pub const SECRET_KEY: &str = "config";
}

/// Requeue configuration for the sync manager
pub mod requeue {
    /// First retry delay in seconds after a failed reconcile
    pub const INITIAL_SECS: u64 = 1;
    /// Maximum retry delay in seconds (exponential backoff cap)
    pub const MAX_SECS: u64 = 300;
    /// Delay before revisiting an identity whose immutable copy was deleted
    pub const RECREATE_SECS: u64 = 1;
}

/// Capacity of the sync manager event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
