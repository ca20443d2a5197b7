//! Plugin registry REST endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::access::CapabilityRequirements;
use crate::plugins::{CycleReport, PluginHost, PluginRegistry, RegistryPhase};

/// Registry snapshot returned by the API
#[derive(Debug, Serialize)]
pub struct RegistryResponse {
    pub cycle: u64,
    pub phase: RegistryPhase,
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<usize>,
    pub plugins: Vec<PluginResponse>,
}

/// Registered plugin info returned by the API
#[derive(Debug, Serialize)]
pub struct PluginResponse {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub requirements: CapabilityRequirements,
}

impl From<&PluginRegistry> for RegistryResponse {
    fn from(registry: &PluginRegistry) -> Self {
        Self {
            cycle: registry.cycle(),
            phase: registry.phase(),
            loaded: registry.is_loaded(),
            expected: registry.expected(),
            plugins: registry
                .iter()
                .map(|p| PluginResponse {
                    name: p.name.clone(),
                    title: p.entry.title().map(String::from),
                    registered_at: p.registered_at,
                    requirements: p.entry.requirements(),
                })
                .collect(),
        }
    }
}

/// Build plugin registry routes
pub fn router(host: Arc<PluginHost>) -> Router {
    Router::new()
        .route("/", get(list_plugins))
        .route("/reload", post(reload_plugins))
        .with_state(host)
}

/// Current registry snapshot
async fn list_plugins(State(host): State<Arc<PluginHost>>) -> Json<RegistryResponse> {
    Json(RegistryResponse::from(host.registry().as_ref()))
}

/// Drop every registration and run a new load cycle
async fn reload_plugins(State(host): State<Arc<PluginHost>>) -> Json<CycleReport> {
    Json(host.reload().await)
}
