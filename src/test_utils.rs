// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! An in-memory Kubernetes API server for tests.
//!
//! Objects POSTed to a collection are stored under `<collection>/<name>`; a
//! second POST of the same name answers 409 AlreadyExists. Deployments report
//! ready replicas after a configurable number of GETs, CustomResourceDefinitions
//! appear in `/apis/<group>/<version>` after a configurable discovery lag, and
//! Services get a cluster IP assigned on creation.

use http::{Request, Response};
use http_body_util::BodyExt;
use kube::client::Body;
use kube::Client;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

const CRD_COLLECTION: &str = "/apis/apiextensions.k8s.io/v1/customresourcedefinitions/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub status: u16,
}

struct Injected {
    method: String,
    path: String,
    status: u16,
    body: String,
    remaining: usize,
}

struct State {
    objects: BTreeMap<String, Value>,
    requests: Vec<RecordedRequest>,
    injected: Vec<Injected>,
    /// GETs answered not-ready before a deployment reports ready; None = never
    deployment_ready_after: Option<u32>,
    deployment_gets: HashMap<String, u32>,
    discovery_lag: u32,
    discovery_seen: HashMap<String, u32>,
    assigned_ips: u8,
}

#[derive(Clone)]
pub struct FakeApiServer {
    state: Arc<Mutex<State>>,
}

impl FakeApiServer {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                objects: BTreeMap::new(),
                requests: Vec::new(),
                injected: Vec::new(),
                deployment_ready_after: Some(0),
                deployment_gets: HashMap::new(),
                discovery_lag: 0,
                discovery_seen: HashMap::new(),
                assigned_ips: 0,
            })),
        }
    }

    pub fn deployment_ready_after(self, gets: u32) -> Self {
        self.state.lock().unwrap().deployment_ready_after = Some(gets);
        self
    }

    pub fn deployment_never_ready(self) -> Self {
        self.state.lock().unwrap().deployment_ready_after = None;
        self
    }

    /// Number of discovery GETs that still omit a newly registered type
    pub fn discovery_lag(self, gets: u32) -> Self {
        self.state.lock().unwrap().discovery_lag = gets;
        self
    }

    /// Build a kube Client talking to this server
    pub fn client(&self) -> Client {
        Client::new(self.clone(), "default")
    }

    /// Store an object as if it had been created earlier
    pub fn insert(&self, path: &str, object: Value) {
        self.state
            .lock()
            .unwrap()
            .objects
            .insert(path.to_string(), object);
    }

    /// Answer the next `times` requests for `method path` with a canned response
    pub fn inject(&self, method: &str, path: &str, status: u16, body: &str, times: usize) {
        self.state.lock().unwrap().injected.push(Injected {
            method: method.to_string(),
            path: path.to_string(),
            status,
            body: body.to_string(),
            remaining: times,
        });
    }

    pub fn object(&self, path: &str) -> Option<Value> {
        self.state.lock().unwrap().objects.get(path).cloned()
    }

    pub fn object_paths(&self) -> Vec<String> {
        self.state.lock().unwrap().objects.keys().cloned().collect()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// (path, status) of every POST, in order
    pub fn posts(&self) -> Vec<(String, u16)> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "POST")
            .map(|r| (r.path, r.status))
            .collect()
    }

    pub fn gets(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == "GET" && r.path == path)
            .count()
    }

    fn handle(&self, method: &str, path: &str, body: &[u8]) -> (u16, String) {
        let mut state = self.state.lock().unwrap();

        let injected = state
            .injected
            .iter_mut()
            .find(|i| i.method == method && i.path == path && i.remaining > 0)
            .map(|injected| {
                injected.remaining -= 1;
                (injected.status, injected.body.clone())
            });

        let response = match injected {
            Some(response) => response,
            None => match method {
                "POST" => state.create(path, body),
                "GET" => state.get(path),
                _ => (405, status_json(405, "MethodNotAllowed", method)),
            },
        };

        state.requests.push(RecordedRequest {
            method: method.to_string(),
            path: path.to_string(),
            status: response.0,
        });
        response
    }
}

impl State {
    fn create(&mut self, collection: &str, body: &[u8]) -> (u16, String) {
        let Ok(mut object) = serde_json::from_slice::<Value>(body) else {
            return (400, status_json(400, "BadRequest", "malformed body"));
        };
        let Some(name) = object["metadata"]["name"].as_str().map(str::to_string) else {
            return (422, status_json(422, "Invalid", "metadata.name is required"));
        };

        let path = format!("{collection}/{name}");
        if self.objects.contains_key(&path) {
            return (
                409,
                status_json(409, "AlreadyExists", &format!("{name} already exists")),
            );
        }

        if collection.ends_with("/services") && object["spec"]["clusterIP"].is_null() {
            self.assigned_ips += 1;
            object["spec"]["clusterIP"] = json!(format!("10.96.0.{}", 9 + self.assigned_ips));
        }

        self.objects.insert(path, object.clone());
        (201, object.to_string())
    }

    fn get(&mut self, path: &str) -> (u16, String) {
        if path.contains("/deployments/") && self.objects.contains_key(path) {
            self.observe_rollout(path);
        }

        if let Some(object) = self.objects.get(path) {
            return (200, object.to_string());
        }

        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        if let ["apis", group, version] = segments.as_slice() {
            return self.discover(group, version);
        }

        (404, status_json(404, "NotFound", &format!("{path} not found")))
    }

    fn observe_rollout(&mut self, path: &str) {
        let gets = self.deployment_gets.entry(path.to_string()).or_insert(0);
        *gets += 1;
        let seen = *gets;

        let Some(after) = self.deployment_ready_after else {
            return;
        };
        if seen <= after {
            return;
        }

        if let Some(object) = self.objects.get_mut(path) {
            let replicas = object["spec"]["replicas"].as_i64().unwrap_or(1);
            object["status"] = json!({
                "observedGeneration": 1,
                "replicas": replicas,
                "updatedReplicas": replicas,
                "readyReplicas": replicas,
                "availableReplicas": replicas
            });
        }
    }

    fn discover(&mut self, group: &str, version: &str) -> (u16, String) {
        let crds: Vec<Value> = self
            .objects
            .iter()
            .filter(|(path, _)| path.starts_with(CRD_COLLECTION))
            .map(|(_, crd)| crd.clone())
            .filter(|crd| crd["spec"]["group"] == group)
            .filter(|crd| {
                crd["spec"]["versions"]
                    .as_array()
                    .is_some_and(|versions| {
                        versions
                            .iter()
                            .any(|v| v["name"] == version && v["served"] == true)
                    })
            })
            .collect();

        let mut resources = Vec::new();
        for crd in crds {
            let name = crd["metadata"]["name"].as_str().unwrap_or_default().to_string();
            let seen = self.discovery_seen.entry(name).or_insert(0);
            *seen += 1;
            if *seen <= self.discovery_lag {
                continue;
            }

            let names = &crd["spec"]["names"];
            resources.push(json!({
                "name": names["plural"],
                "singularName": names["singular"].as_str().unwrap_or_default(),
                "namespaced": crd["spec"]["scope"] == "Namespaced",
                "kind": names["kind"],
                "verbs": ["create", "delete", "get", "list", "patch", "update", "watch"]
            }));
        }

        if resources.is_empty() {
            return (
                404,
                status_json(404, "NotFound", "the server could not find the requested resource"),
            );
        }

        let list = json!({
            "kind": "APIResourceList",
            "apiVersion": "v1",
            "groupVersion": format!("{group}/{version}"),
            "resources": resources
        });
        (200, list.to_string())
    }
}

impl Default for FakeApiServer {
    fn default() -> Self {
        Self::new()
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
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let server = self.clone();

        Box::pin(async move {
            let body = req
                .into_body()
                .collect()
                .await
                .map(|collected| collected.to_bytes())
                .unwrap_or_default();

            let (status, body) = server.handle(&method, &path, &body);
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// A Kubernetes Status object as returned for failed requests
pub fn status_json(code: u16, reason: &str, message: &str) -> String {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}
