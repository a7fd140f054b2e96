// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Virtual cluster client creation and kubeconfig utilities

use crate::config::Config;
use crate::constants::kubeconfig;
use crate::error::{Result, SyncError};
use k8s_openapi::api::core::v1::Secret;
use kube::{config::KubeConfigOptions, Api, Client, Config as KConfig};
use tracing::{info, instrument};

/// Create a Kubernetes client for the virtual cluster
#[instrument(skip(host_client, config), fields(vcluster = %config.vcluster_name))]
pub async fn create_virtual_client(host_client: &Client, config: &Config) -> Result<Client> {
    if config.testing_mode {
        create_testing_client().await
    } else {
        let kubeconfig = get_virtual_kubeconfig(host_client, config).await?;
        create_client_from_kubeconfig(&kubeconfig).await
    }
}

/// Create a client for testing mode (uses the local kubeconfig)
async fn create_testing_client() -> Result<Client> {
    let c = KConfig::infer()
        .await
        .map_err(|e| SyncError::KubeconfigError(format!("Failed to infer config: {}", e)))?;

    Client::try_from(c)
        .map_err(|e| SyncError::KubeconfigError(format!("Failed to create client: {}", e)))
}

/// Get the virtual cluster kubeconfig from its secret in the host namespace
#[instrument(skip(client, config))]
async fn get_virtual_kubeconfig(client: &Client, config: &Config) -> Result<String> {
    let secret_name = &config.kubeconfig_secret;
    let namespace = &config.host_namespace;
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);

    info!(
        "Getting kubeconfig secret '{}/{}' for vcluster '{}'...",
        namespace, secret_name, config.vcluster_name
    );

    let secret = secrets.get(secret_name).await.map_err(|e| {
        SyncError::KubeconfigError(format!(
            "Failed to get kubeconfig secret {}/{}: {}",
            namespace, secret_name, e
        ))
    })?;

    let Some(data) = secret.data.as_ref() else {
        return Err(SyncError::KubeconfigError(format!(
            "Kubeconfig secret {}/{} has no data",
            namespace, secret_name
        )));
    };

    let Some(kubeconfig_data) = data.get(kubeconfig::SECRET_KEY) else {
        return Err(SyncError::KubeconfigError(format!(
            "Kubeconfig secret {}/{} does not contain '{}' key",
            namespace,
            secret_name,
            kubeconfig::SECRET_KEY
        )));
    };

    String::from_utf8(kubeconfig_data.0.clone()).map_err(|e| {
        SyncError::KubeconfigError(format!(
            "Failed to decode kubeconfig from {}/{}: {}",
            namespace, secret_name, e
        ))
    })
}

/// Create a Kubernetes client from a kubeconfig string
async fn create_client_from_kubeconfig(kubeconfig: &str) -> Result<Client> {
    use kube::config::Kubeconfig;

    let kubeconfig_parsed: Kubeconfig = serde_yaml::from_str(kubeconfig)
        .map_err(|e| SyncError::KubeconfigError(format!("Failed to parse kubeconfig: {}", e)))?;

    let client_config =
        kube::Config::from_custom_kubeconfig(kubeconfig_parsed, &KubeConfigOptions::default())
            .await
            .map_err(|e| SyncError::KubeconfigError(format!("Failed to create config: {}", e)))?;

    Client::try_from(client_config)
        .map_err(|e| SyncError::KubeconfigError(format!("Failed to create client: {}", e)))
}
