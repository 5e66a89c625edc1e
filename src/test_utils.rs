// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a stateful in-memory Kubernetes API server.
//!
//! `FakeApiServer` is a tower `Service` that `kube::Client` talks to. It keeps
//! objects per collection path, stamps resourceVersions, enforces optimistic
//! concurrency on updates and records every request so tests can assert on
//! call order.

use http::{Method, Request, Response};
use http_body_util::BodyExt;
use kube::client::Body;
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A request observed by the fake server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub method: String,
    pub path: String,
}

#[derive(Default)]
struct State {
    /// collection path -> object name -> object
    objects: BTreeMap<String, BTreeMap<String, Value>>,
    next_version: u64,
    next_cluster_ip: u32,
    calls: Vec<Call>,
    /// job object path -> number of reads after which it reports success
    job_success_after: HashMap<String, usize>,
    reads: HashMap<String, usize>,
    /// (method, path) -> (code, reason)
    failures: HashMap<(String, String), (u16, String)>,
}

impl State {
    fn bump_version(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }
}

/// Stateful mock of the Kubernetes API server
#[derive(Clone, Default)]
pub struct FakeApiServer {
    state: Arc<Mutex<State>>,
}

impl FakeApiServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an object, as if it had been created earlier
    pub fn with_object<K>(self, obj: &K) -> Self
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        let collection = K::url_path(&(), obj.meta().namespace.as_deref());
        let name = obj.meta().name.clone().expect("seeded object needs a name");
        let mut value = serde_json::to_value(obj).unwrap();
        {
            let mut state = self.state.lock().unwrap();
            value["metadata"]["resourceVersion"] = json!(state.bump_version());
            value["metadata"]["uid"] = json!(format!("uid-{}", name));
            state
                .objects
                .entry(collection)
                .or_default()
                .insert(name, value);
        }
        self
    }

    /// Make a Job report `status.succeeded = 1` starting with the given read
    pub fn succeed_job_after(self, namespace: &str, name: &str, reads: usize) -> Self {
        self.state
            .lock()
            .unwrap()
            .job_success_after
            .insert(job_path(namespace, name), reads);
        self
    }

    /// Answer every request with this method and exact path with an API error
    pub fn fail(self, method: &str, path: &str, code: u16, reason: &str) -> Self {
        self.state.lock().unwrap().failures.insert(
            (method.to_string(), path.to_string()),
            (code, reason.to_string()),
        );
        self
    }

    /// Build a kube Client backed by this server
    pub fn client(&self) -> Client {
        Client::new(self.clone(), "default")
    }

    /// Read an object back from the store
    pub fn get<K>(&self, namespace: &str, name: &str) -> Option<K>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let collection = K::url_path(&(), Some(namespace));
        let state = self.state.lock().unwrap();
        state
            .objects
            .get(&collection)
            .and_then(|objects| objects.get(name))
            .map(|v| serde_json::from_value(v.clone()).unwrap())
    }

    pub fn contains<K>(&self, namespace: &str, name: &str) -> bool
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        self.get::<K>(namespace, name).is_some()
    }

    /// Overwrite the store-owned status of an object
    pub fn set_status<K>(&self, namespace: &str, name: &str, status: Value)
    where
        K: Resource<DynamicType = ()>,
    {
        let collection = K::url_path(&(), Some(namespace));
        let mut state = self.state.lock().unwrap();
        let version = state.bump_version();
        if let Some(obj) = state
            .objects
            .get_mut(&collection)
            .and_then(|objects| objects.get_mut(name))
        {
            obj["status"] = status;
            obj["metadata"]["resourceVersion"] = json!(version);
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of requests with this method and exact path
    pub fn count(&self, method: &str, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    /// Number of requests with this method whose path starts with the prefix
    pub fn count_prefix(&self, method: &str, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.method == method && c.path.starts_with(prefix))
            .count()
    }

    /// Index of the first request with this method and exact path
    pub fn position(&self, method: &str, path: &str) -> Option<usize> {
        self.calls()
            .iter()
            .position(|c| c.method == method && c.path == path)
    }

    fn handle(&self, method: &Method, path: &str, query: Option<&str>, body: &[u8]) -> (u16, Value) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call {
            method: method.to_string(),
            path: path.to_string(),
        });

        if let Some((code, reason)) = state
            .failures
            .get(&(method.to_string(), path.to_string()))
            .cloned()
        {
            return status_json(code, &reason, &format!("injected failure for {}", path));
        }

        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let prefix_len = if segments.first() == Some(&"api") { 5 } else { 6 };
        if segments.len() < prefix_len || segments.len() > prefix_len + 1 {
            return status_json(404, "NotFound", &format!("unsupported path {}", path));
        }
        let collection = format!("/{}", segments[..prefix_len].join("/"));
        let namespace = segments[prefix_len - 2].to_string();
        let name = segments.get(prefix_len).map(|s| s.to_string());

        match (method.as_str(), name) {
            ("GET", Some(name)) => {
                let reads = {
                    let counter = state.reads.entry(path.to_string()).or_insert(0);
                    *counter += 1;
                    *counter
                };
                let succeed = state
                    .job_success_after
                    .get(path)
                    .is_some_and(|after| reads >= *after);
                match state
                    .objects
                    .get_mut(&collection)
                    .and_then(|objects| objects.get_mut(&name))
                {
                    Some(obj) => {
                        if succeed {
                            obj["status"]["succeeded"] = json!(1);
                        }
                        (200, obj.clone())
                    }
                    None => not_found(&name),
                }
            }
            ("GET", None) => {
                let selector = query.and_then(label_selector);
                let version = state.next_version.to_string();
                let items: Vec<Value> = state
                    .objects
                    .get(&collection)
                    .map(|objects| {
                        objects
                            .values()
                            .filter(|obj| selector.as_ref().map_or(true, |s| matches_labels(obj, s)))
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default();
                (
                    200,
                    json!({
                        "apiVersion": "v1",
                        "kind": "List",
                        "metadata": { "resourceVersion": version },
                        "items": items,
                    }),
                )
            }
            ("POST", None) => {
                let mut obj: Value = match serde_json::from_slice(body) {
                    Ok(v) => v,
                    Err(e) => return status_json(400, "BadRequest", &e.to_string()),
                };
                let Some(name) = obj["metadata"]["name"].as_str().map(str::to_string) else {
                    return status_json(422, "Invalid", "metadata.name is required");
                };
                if state
                    .objects
                    .get(&collection)
                    .is_some_and(|objects| objects.contains_key(&name))
                {
                    return status_json(
                        409,
                        "AlreadyExists",
                        &format!("\"{}\" already exists", name),
                    );
                }
                obj["metadata"]["resourceVersion"] = json!(state.bump_version());
                obj["metadata"]["uid"] = json!(format!("uid-{}", name));
                obj["metadata"]["namespace"] = json!(namespace);
                if collection.ends_with("/services") && obj["spec"]["clusterIP"].is_null() {
                    state.next_cluster_ip += 1;
                    let ip = format!("10.96.0.{}", state.next_cluster_ip);
                    obj["spec"]["clusterIP"] = json!(ip);
                    obj["spec"]["clusterIPs"] = json!([ip]);
                }
                state
                    .objects
                    .entry(collection)
                    .or_default()
                    .insert(name, obj.clone());
                (201, obj)
            }
            ("PUT", Some(name)) => {
                let mut obj: Value = match serde_json::from_slice(body) {
                    Ok(v) => v,
                    Err(e) => return status_json(400, "BadRequest", &e.to_string()),
                };
                let Some(live) = state
                    .objects
                    .get(&collection)
                    .and_then(|objects| objects.get(&name))
                    .cloned()
                else {
                    return not_found(&name);
                };
                if obj["metadata"]["resourceVersion"] != live["metadata"]["resourceVersion"] {
                    return status_json(
                        409,
                        "Conflict",
                        &format!(
                            "Operation cannot be fulfilled on \"{}\": the object has been modified",
                            name
                        ),
                    );
                }
                if collection.ends_with("/services")
                    && !live["spec"]["clusterIP"].is_null()
                    && obj["spec"]["clusterIP"] != live["spec"]["clusterIP"]
                {
                    return status_json(422, "Invalid", "spec.clusterIP: field is immutable");
                }
                if collection.ends_with("/jobs")
                    && obj["spec"]["template"]["spec"] != live["spec"]["template"]["spec"]
                {
                    return status_json(422, "Invalid", "spec.template: field is immutable");
                }
                obj["metadata"]["resourceVersion"] = json!(state.bump_version());
                obj["metadata"]["uid"] = live["metadata"]["uid"].clone();
                obj["metadata"]["namespace"] = json!(namespace);
                obj["status"] = live["status"].clone();
                if let Some(objects) = state.objects.get_mut(&collection) {
                    objects.insert(name, obj.clone());
                }
                (200, obj)
            }
            ("DELETE", Some(name)) => match state
                .objects
                .get_mut(&collection)
                .and_then(|objects| objects.remove(&name))
            {
                Some(obj) => (200, obj),
                None => not_found(&name),
            },
            _ => status_json(405, "MethodNotAllowed", &format!("{} {}", method, path)),
        }
    }
}

impl Service<Request<Body>> for FakeApiServer {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let server = self.clone();

        Box::pin(async move {
            let method = req.method().clone();
            let path = req.uri().path().to_string();
            let query = req.uri().query().map(str::to_string);
            let body = req
                .into_body()
                .collect()
                .await
                .map(|collected| collected.to_bytes())
                .unwrap_or_default();

            let (status, value) = server.handle(&method, &path, query.as_deref(), &body);

            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&value)?))
                .unwrap())
        })
    }
}

fn status_json(code: u16, reason: &str, message: &str) -> (u16, Value) {
    (
        code,
        json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": message,
            "reason": reason,
            "code": code
        }),
    )
}

fn not_found(name: &str) -> (u16, Value) {
    status_json(404, "NotFound", &format!("\"{}\" not found", name))
}

fn label_selector(query: &str) -> Option<Vec<(String, String)>> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "labelSelector")
        .map(|(_, selector)| {
            selector
                .split(',')
                .filter_map(|term| term.split_once('='))
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .collect()
        })
}

fn matches_labels(obj: &Value, selector: &[(String, String)]) -> bool {
    selector
        .iter()
        .all(|(k, v)| obj["metadata"]["labels"][k].as_str() == Some(v.as_str()))
}

pub fn secret_path(namespace: &str, name: &str) -> String {
    format!("/api/v1/namespaces/{}/secrets/{}", namespace, name)
}

pub fn service_path(namespace: &str, name: &str) -> String {
    format!("/api/v1/namespaces/{}/services/{}", namespace, name)
}

pub fn config_map_path(namespace: &str, name: &str) -> String {
    format!("/api/v1/namespaces/{}/configmaps/{}", namespace, name)
}

pub fn pod_path(namespace: &str, name: &str) -> String {
    format!("/api/v1/namespaces/{}/pods/{}", namespace, name)
}

pub fn jobs_path(namespace: &str) -> String {
    format!("/apis/batch/v1/namespaces/{}/jobs", namespace)
}

pub fn job_path(namespace: &str, name: &str) -> String {
    format!("{}/{}", jobs_path(namespace), name)
}

pub fn deployment_path(namespace: &str, name: &str) -> String {
    format!("/apis/apps/v1/namespaces/{}/deployments/{}", namespace, name)
}

/// A pod spawned by the named job
pub fn job_pod(namespace: &str, job: &str, name: &str) -> k8s_openapi::api::core::v1::Pod {
    k8s_openapi::api::core::v1::Pod {
        metadata: kube::api::ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([(
                crate::constants::labels::JOB_NAME.to_string(),
                job.to_string(),
            )])),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A secret with the given annotations
pub fn annotated_secret(
    namespace: &str,
    name: &str,
    annotations: &[(&str, &str)],
) -> k8s_openapi::api::core::v1::Secret {
    k8s_openapi::api::core::v1::Secret {
        metadata: kube::api::ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            annotations: (!annotations.is_empty()).then(|| {
                annotations
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            }),
            ..Default::default()
        },
        type_: Some("kubernetes.io/tls".to_string()),
        ..Default::default()
    }
}
