//! Shared test utilities
//!
//! [`MockPortal`] stands in for the portal service: it serves the plugin
//! descriptor list, the plugin bundles and the capability check endpoint
//! from a local port.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use portal_plugins::plugins::{BundleLoader, DescriptorFetcher, JsonBundleExecutor};
use portal_plugins::{HttpCapabilityService, PluginHost};
use serde::Deserialize;
use url::Url;

#[derive(Default)]
struct PortalState {
    descriptors: serde_json::Value,
    descriptor_status: Option<StatusCode>,
    bundles: HashMap<String, String>,
    grants: BTreeSet<(String, String)>,
}

/// Local stand-in for the portal service
#[derive(Clone)]
pub struct MockPortal {
    pub addr: SocketAddr,
    state: Arc<Mutex<PortalState>>,
    checks: Arc<AtomicUsize>,
}

#[derive(Deserialize)]
struct CheckQuery {
    verb: String,
    resource: String,
}

type Shared = (Arc<Mutex<PortalState>>, Arc<AtomicUsize>);

impl MockPortal {
    /// Start the mock server on an ephemeral port
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(PortalState {
            descriptors: serde_json::json!([]),
            ..PortalState::default()
        }));
        let checks = Arc::new(AtomicUsize::new(0));

        let app = Router::new()
            .route("/api/plugins", get(descriptors))
            .route("/bundles/{*path}", get(bundle))
            .route("/api/access/check", get(check))
            .with_state((Arc::clone(&state), Arc::clone(&checks)));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock portal");
        let addr = listener.local_addr().expect("mock portal has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock portal failed");
        });

        Self {
            addr,
            state,
            checks,
        }
    }

    /// Base URL of the server
    pub fn origin(&self) -> Url {
        Url::parse(&format!("http://{}/", self.addr)).unwrap()
    }

    /// Descriptor list endpoint
    pub fn plugins_endpoint(&self) -> Url {
        self.origin().join("/api/plugins").unwrap()
    }

    /// Capability check endpoint
    pub fn capability_endpoint(&self) -> Url {
        self.origin().join("/api/access/check").unwrap()
    }

    /// Replace the descriptor list
    pub fn set_descriptors(&self, descriptors: serde_json::Value) {
        self.state.lock().unwrap().descriptors = descriptors;
    }

    /// Make the descriptor endpoint answer with `status` and no body
    pub fn fail_descriptors(&self, status: StatusCode) {
        self.state.lock().unwrap().descriptor_status = Some(status);
    }

    /// Serve `body` at `/bundles/{path}`
    pub fn add_bundle(&self, path: &str, body: serde_json::Value) {
        self.state
            .lock()
            .unwrap()
            .bundles
            .insert(path.to_string(), body.to_string());
    }

    /// Serve a bundle whose document registers `name`
    pub fn add_plugin_bundle(&self, path: &str, name: &str, requirements: serde_json::Value) {
        self.add_bundle(
            path,
            serde_json::json!({
                "name": name,
                "app": {
                    "title": name.to_uppercase(),
                    "view": {"component": format!("{name}-root")},
                    "requirements": requirements,
                },
            }),
        );
    }

    /// Allow `verb` on `resource`
    pub fn grant(&self, verb: &str, resource: &str) {
        self.state
            .lock()
            .unwrap()
            .grants
            .insert((verb.to_string(), resource.to_string()));
    }

    /// Number of capability checks answered so far
    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    /// A started plugin host pointed at this server
    pub async fn host(&self) -> PluginHost {
        let fetcher = DescriptorFetcher::new(self.plugins_endpoint());
        let loader = BundleLoader::new(self.origin(), Arc::new(JsonBundleExecutor));
        let host = PluginHost::new(fetcher, loader);
        host.start().await;
        host
    }

    /// Capability service backed by this server
    pub fn capabilities(&self) -> Arc<HttpCapabilityService> {
        Arc::new(HttpCapabilityService::new(self.capability_endpoint()))
    }
}

async fn descriptors(State((state, _)): State<Shared>) -> Response {
    let state = state.lock().unwrap();
    match state.descriptor_status {
        Some(status) => status.into_response(),
        None => Json(state.descriptors.clone()).into_response(),
    }
}

async fn bundle(State((state, _)): State<Shared>, Path(path): Path<String>) -> Response {
    let state = state.lock().unwrap();
    match state.bundles.get(&path) {
        Some(body) => body.clone().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn check(State((state, checks)): State<Shared>, Query(query): Query<CheckQuery>) -> StatusCode {
    checks.fetch_add(1, Ordering::SeqCst);
    let state = state.lock().unwrap();
    if state.grants.contains(&(query.verb, query.resource)) {
        StatusCode::OK
    } else {
        StatusCode::FORBIDDEN
    }
}
