// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a mocked Kubernetes API and an in-memory secret store.

use crate::config::{Config, SyncMode};
use crate::error::StoreError;
use crate::sync::record::{ObjectRef, SecretRecord};
use crate::sync::store::SecretStore;
use async_trait::async_trait;
use http::{Request, Response};
use kube::client::Body;
use kube::Client;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// Configuration used throughout the tests
pub fn make_config(mode: SyncMode) -> Config {
    Config {
        destination_namespace: "default".to_string(),
        host_namespace: "host".to_string(),
        plugin_name: "host-secret-syncer".to_string(),
        vcluster_name: "vcluster".to_string(),
        mode,
        watch_namespace: None,
        kubeconfig_secret: "vc-vcluster".to_string(),
        testing_mode: false,
    }
}

pub fn make_record(namespace: &str, name: &str) -> SecretRecord {
    SecretRecord::new(ObjectRef::new(namespace, name))
}

/// Secret store kept in memory that behaves like a compliant API server:
/// creates fail on existing objects, updates check the resource version and
/// refuse payload changes on immutable secrets.
#[derive(Clone, Default)]
pub struct MemoryStore {
    objects: Arc<Mutex<BTreeMap<ObjectRef, SecretRecord>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Put a record in place without counting it as a write
    pub fn insert(&self, record: SecretRecord) {
        self.objects.lock().unwrap().insert(record.id.clone(), record);
    }

    pub fn remove(&self, id: &ObjectRef) {
        self.objects.lock().unwrap().remove(id);
    }

    pub fn record(&self, id: &ObjectRef) -> Option<SecretRecord> {
        self.objects.lock().unwrap().get(id).cloned()
    }

    /// Number of create, update and delete calls so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

fn next_version(current: Option<&str>) -> Option<String> {
    let n: u64 = current.and_then(|v| v.parse().ok()).unwrap_or(0);
    Some((n + 1).to_string())
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn get(&self, id: &ObjectRef) -> Result<Option<SecretRecord>, StoreError> {
        Ok(self.record(id))
    }

    async fn create(&self, record: &SecretRecord) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&record.id) {
            return Err(StoreError::Backend(format!("secret {} already exists", record.id)));
        }
        let mut stored = record.clone();
        stored.resource_version = next_version(None);
        objects.insert(stored.id.clone(), stored);
        Ok(())
    }

    async fn update(&self, record: &SecretRecord) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut objects = self.objects.lock().unwrap();
        let Some(existing) = objects.get(&record.id) else {
            return Err(StoreError::Backend(format!("secret {} not found", record.id)));
        };
        if record.resource_version.is_some() && record.resource_version != existing.resource_version {
            return Err(StoreError::Backend(format!("secret {} was modified", record.id)));
        }
        if existing.immutable && (!record.immutable || !existing.same_payload(record)) {
            return Err(StoreError::Backend(format!("secret {} is immutable", record.id)));
        }
        let mut stored = record.clone();
        stored.resource_version = next_version(existing.resource_version.as_deref());
        objects.insert(stored.id.clone(), stored);
        Ok(())
    }

    async fn delete(&self, id: &ObjectRef) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.objects.lock().unwrap().remove(id);
        Ok(())
    }

    async fn find_labelled(&self, name: &str, key: &str, value: &str) -> Result<Vec<SecretRecord>, StoreError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .values()
            .filter(|record| record.id.name == name && record.label(key) == Some(value))
            .cloned()
            .collect())
    }
}

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for POST requests matching the exact path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    /// Add a response for PUT requests matching the exact path
    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    /// Add a response for DELETE requests matching the exact path
    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, status, body)
    }

    /// Methods and paths of every request received so far
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        // Try exact match first
        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Try prefix match for paths like /api/v1/namespaces/foo
        for ((m, p), resp) in responses.iter() {
            if m == method && path.starts_with(p) {
                return Some(resp.clone());
            }
        }

        None
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        self.requests
            .lock()
            .unwrap()
            .push((method.clone(), path.clone()));
        let response = self.find_response(&method, &path);

        Box::pin(async move {
            let (status, body) = response.unwrap_or_else(|| (404, not_found_json("secrets", &path)));
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a mock Secret JSON response; values are base64 encoded already
pub fn secret_json(namespace: &str, name: &str, data: &[(&str, &str)]) -> String {
    let data: serde_json::Map<String, serde_json::Value> = data
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect();
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "resourceVersion": "12",
            "uid": "test-uid"
        },
        "data": data,
        "type": "Opaque"
    })
    .to_string()
}

/// Create a mock namespace JSON response
pub fn namespace_json(name: &str) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "uid": "test-uid"
        }
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}
