//! HTTP inspection API for the plugin runtime

pub mod health;
pub mod plugins;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::plugins::PluginHost;

/// Inspection API server
pub struct ApiServer {
    host: Arc<PluginHost>,
    port: u16,
}

impl ApiServer {
    /// Create a server exposing `host` on `port`
    #[must_use]
    pub const fn new(host: Arc<PluginHost>, port: u16) -> Self {
        Self { host, port }
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .nest("/api/plugins", plugins::router(Arc::clone(&self.host)))
            .merge(health::router())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

impl std::fmt::Debug for ApiServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiServer").field("port", &self.port).finish_non_exhaustive()
    }
}
