// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Secret store backed by a Kubernetes API server

use crate::error::StoreError;
use crate::sync::record::{ObjectRef, SecretRecord, Side};
use crate::sync::store::SecretStore;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::{
    api::{ApiResource, DeleteParams, DynamicObject, ListParams, ObjectMeta, PostParams},
    Api, Client,
};
use tracing::{debug, info, instrument};

pub struct KubeSecretStore {
    client: Client,
    side: Side,
    resource: ApiResource,
    ensure_namespaces: bool,
}

impl KubeSecretStore {
    pub fn new(client: Client, side: Side) -> Self {
        Self {
            client,
            side,
            resource: ApiResource::erase::<Secret>(&()),
            ensure_namespaces: false,
        }
    }

    /// Create missing target namespaces before creating a secret
    pub fn ensure_namespaces(mut self, enabled: bool) -> Self {
        self.ensure_namespaces = enabled;
        self
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Create the namespace `record` is about to be written to when it is missing
    async fn ensure_namespace(&self, record: &SecretRecord) -> Result<(), StoreError> {
        let namespace = &record.id.namespace;
        let namespaces: Api<Namespace> = Api::all(self.client.clone());

        match namespaces.get_opt(namespace).await {
            Ok(Some(_)) => Ok(()),
            Ok(None) => {
                info!("Creating namespace {} for {} secret {}", namespace, self.side, record.id);
                let ns = Namespace {
                    metadata: ObjectMeta {
                        name: Some(namespace.clone()),
                        ..Default::default()
                    },
                    ..Default::default()
                };
                match namespaces.create(&PostParams::default(), &ns).await {
                    Ok(_) => Ok(()),
                    // Created concurrently by someone else
                    Err(kube::Error::Api(err)) if err.code == 409 => Ok(()),
                    Err(e) => Err(StoreError::Namespace(format!(
                        "cannot create namespace {} for {} secret {}: {}",
                        namespace, self.side, record.id, e
                    ))),
                }
            }
            Err(e) => Err(StoreError::Namespace(format!(
                "cannot look up namespace {} for {} secret {}: {}",
                namespace, self.side, record.id, e
            ))),
        }
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    #[instrument(skip(self), fields(side = %self.side, secret = %id))]
    async fn get(&self, id: &ObjectRef) -> Result<Option<SecretRecord>, StoreError> {
        // Read untyped so that a wrong kind is reported instead of mis-decoded
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), &id.namespace, &self.resource);

        let Some(obj) = api.get_opt(&id.name).await? else {
            debug!("Secret {} not found", id);
            return Ok(None);
        };

        decode_secret(id, obj).map(|secret| Some(SecretRecord::from(secret)))
    }

    #[instrument(skip(self, record), fields(side = %self.side, secret = %record.id))]
    async fn create(&self, record: &SecretRecord) -> Result<(), StoreError> {
        if self.ensure_namespaces {
            self.ensure_namespace(record).await?;
        }

        self.secrets(&record.id.namespace)
            .create(&PostParams::default(), &record.clone().into_secret())
            .await?;
        Ok(())
    }

    #[instrument(skip(self, record), fields(side = %self.side, secret = %record.id))]
    async fn update(&self, record: &SecretRecord) -> Result<(), StoreError> {
        self.secrets(&record.id.namespace)
            .replace(&record.id.name, &PostParams::default(), &record.clone().into_secret())
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(side = %self.side, secret = %id))]
    async fn delete(&self, id: &ObjectRef) -> Result<(), StoreError> {
        match self
            .secrets(&id.namespace)
            .delete(&id.name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(err)) if err.code == 404 => {
                debug!("Secret {} already deleted", id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(side = %self.side))]
    async fn find_labelled(&self, name: &str, key: &str, value: &str) -> Result<Vec<SecretRecord>, StoreError> {
        let secrets: Api<Secret> = Api::all(self.client.clone());
        let params = ListParams::default()
            .labels(&format!("{}={}", key, value))
            .fields(&format!("metadata.name={}", name));

        let list = secrets.list(&params).await?;
        Ok(list.items.into_iter().map(SecretRecord::from).collect())
    }
}

/// Check that an untyped object is a Secret and decode it
fn decode_secret(id: &ObjectRef, obj: DynamicObject) -> Result<Secret, StoreError> {
    let kind = obj
        .types
        .as_ref()
        .map(|t| t.kind.clone())
        .unwrap_or_default();
    if kind != "Secret" {
        return Err(StoreError::Decode {
            target: id.clone(),
            found: if kind.is_empty() { "object without kind".to_string() } else { kind },
        });
    }

    serde_json::to_value(&obj)
        .and_then(serde_json::from_value)
        .map_err(|e| StoreError::Decode {
            target: id.clone(),
            found: format!("malformed Secret ({})", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{namespace_json, secret_json, MockService};
    use crate::constants::labels;
    use bytes::Bytes;

    const SECRET_PATH: &str = "/api/v1/namespaces/host/secrets/db-cred";

    fn id() -> ObjectRef {
        ObjectRef::new("host", "db-cred")
    }

    #[tokio::test]
    async fn test_get_existing_secret() {
        let client = MockService::new()
            .on_get(SECRET_PATH, 200, &secret_json("host", "db-cred", &[("user", "YQ==")]))
            .into_client();
        let store = KubeSecretStore::new(client, Side::Physical);

        let record = store.get(&id()).await.unwrap().unwrap();

        assert_eq!(record.id, id());
        assert_eq!(record.data.get("user"), Some(&Bytes::from_static(b"a")));
        assert_eq!(record.resource_version.as_deref(), Some("12"));
    }

    #[tokio::test]
    async fn test_get_missing_secret() {
        let store = KubeSecretStore::new(MockService::new().into_client(), Side::Physical);

        assert_eq!(store.get(&id()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_wrong_kind_is_a_decode_error() {
        let body = serde_json::json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": { "name": "db-cred", "namespace": "host" },
            "data": { "user": "a" }
        })
        .to_string();
        let client = MockService::new().on_get(SECRET_PATH, 200, &body).into_client();
        let store = KubeSecretStore::new(client, Side::Physical);

        match store.get(&id()).await {
            Err(StoreError::Decode { target, found }) => {
                assert_eq!(target, id());
                assert_eq!(found, "ConfigMap");
            }
            other => panic!("expected a decode error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_ensures_namespace() {
        let mock = MockService::new()
            .on_get("/api/v1/namespaces/ns-x", 200, &namespace_json("ns-x"))
            .on_post(
                "/api/v1/namespaces/ns-x/secrets",
                201,
                &secret_json("ns-x", "db-cred", &[]),
            );
        let store = KubeSecretStore::new(mock.clone().into_client(), Side::Virtual)
            .ensure_namespaces(true);

        store
            .create(&SecretRecord::new(ObjectRef::new("ns-x", "db-cred")))
            .await
            .unwrap();

        assert_eq!(
            mock.requests(),
            vec![
                ("GET".to_string(), "/api/v1/namespaces/ns-x".to_string()),
                ("POST".to_string(), "/api/v1/namespaces/ns-x/secrets".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_create_makes_missing_namespace() {
        let mock = MockService::new()
            .on_post("/api/v1/namespaces", 201, &namespace_json("ns-x"))
            .on_post(
                "/api/v1/namespaces/ns-x/secrets",
                201,
                &secret_json("ns-x", "db-cred", &[]),
            );
        let store = KubeSecretStore::new(mock.clone().into_client(), Side::Virtual)
            .ensure_namespaces(true);

        store
            .create(&SecretRecord::new(ObjectRef::new("ns-x", "db-cred")))
            .await
            .unwrap();

        assert_eq!(
            mock.requests(),
            vec![
                ("GET".to_string(), "/api/v1/namespaces/ns-x".to_string()),
                ("POST".to_string(), "/api/v1/namespaces".to_string()),
                ("POST".to_string(), "/api/v1/namespaces/ns-x/secrets".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_namespace_lookup_failure_names_the_secret() {
        let mock = MockService::new().on_get(
            "/api/v1/namespaces/ns-x",
            500,
            r#"{"kind":"Status","apiVersion":"v1","status":"Failure","message":"boom","reason":"InternalError","code":500}"#,
        );
        let store = KubeSecretStore::new(mock.clone().into_client(), Side::Virtual)
            .ensure_namespaces(true);

        let err = store
            .create(&SecretRecord::new(ObjectRef::new("ns-x", "db-cred")))
            .await
            .unwrap_err();

        match err {
            StoreError::Namespace(message) => assert!(message.contains("ns-x/db-cred")),
            other => panic!("expected a namespace error, got {:?}", other),
        }
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_find_labelled_lists_across_namespaces() {
        let item: serde_json::Value =
            serde_json::from_str(&secret_json("ns-a", "db-cred", &[("user", "YQ==")])).unwrap();
        let body = serde_json::json!({
            "apiVersion": "v1",
            "kind": "SecretList",
            "metadata": { "resourceVersion": "30" },
            "items": [item]
        })
        .to_string();
        let mock = MockService::new().on_get("/api/v1/secrets", 200, &body);
        let store = KubeSecretStore::new(mock.clone().into_client(), Side::Virtual);

        let found = store
            .find_labelled("db-cred", labels::MANAGED_BY, "host-secret-syncer")
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, ObjectRef::new("ns-a", "db-cred"));
        assert_eq!(mock.requests(), vec![("GET".to_string(), "/api/v1/secrets".to_string())]);
    }

    #[tokio::test]
    async fn test_update_replaces_secret() {
        let mock = MockService::new().on_put(
            SECRET_PATH,
            200,
            &secret_json("host", "db-cred", &[]),
        );
        let store = KubeSecretStore::new(mock.clone().into_client(), Side::Physical);

        store.update(&SecretRecord::new(id())).await.unwrap();

        assert_eq!(mock.requests(), vec![("PUT".to_string(), SECRET_PATH.to_string())]);
    }

    #[tokio::test]
    async fn test_update_failure_is_reported() {
        let store = KubeSecretStore::new(MockService::new().into_client(), Side::Physical);

        let err = store.update(&SecretRecord::new(id())).await.unwrap_err();

        assert!(matches!(err, StoreError::Api(_)));
    }

    #[tokio::test]
    async fn test_delete_secret() {
        let mock = MockService::new().on_delete(
            SECRET_PATH,
            200,
            &secret_json("host", "db-cred", &[]),
        );
        let store = KubeSecretStore::new(mock.clone().into_client(), Side::Physical);

        store.delete(&id()).await.unwrap();

        assert_eq!(mock.requests(), vec![("DELETE".to_string(), SECRET_PATH.to_string())]);
    }

    #[tokio::test]
    async fn test_delete_missing_secret_succeeds() {
        let store = KubeSecretStore::new(MockService::new().into_client(), Side::Virtual);

        store.delete(&id()).await.unwrap();
    }
}
