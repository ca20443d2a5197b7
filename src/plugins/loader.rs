//! Bundle loading
//!
//! For every descriptor the loader resolves each path against the runtime
//! origin, fetches the bundles concurrently and executes them strictly in
//! injection order (descriptor order, then path order), the way the host page
//! would run non-async scripts. Running a bundle is what makes it register;
//! the loader itself only counts what it attempted.
//!
//! Once scheduled, a load cannot be cancelled and is never retried.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use url::Url;

use super::channel::Registrar;
use super::descriptor::PluginDescriptor;
use super::entry::StaticEntry;
use crate::{Error, Result};

/// Default number of bundles fetched at the same time
pub const DEFAULT_CONCURRENCY: usize = 4;

/// A fetched bundle ready to run
#[derive(Debug, Clone)]
pub struct Bundle {
    /// Descriptor the bundle belongs to
    pub plugin: String,
    /// Resolved location
    pub url: Url,
    /// Raw bundle contents
    pub source: Vec<u8>,
}

/// Runs fetched bundles inside the host
///
/// A bundle that registers does so through the given [`Registrar`]; the
/// executor must not assume anything about the host beyond that.
#[async_trait]
pub trait BundleExecutor: Send + Sync {
    /// Run one bundle
    ///
    /// # Errors
    ///
    /// Returns an error if the bundle cannot be executed
    async fn execute(&self, bundle: &Bundle, registrar: &Registrar) -> Result<()>;
}

/// Executes declarative JSON bundles
///
/// A bundle document mirrors the registration handshake:
///
/// ```json
/// { "name": "accounts", "app": { "title": "Accounts", "view": { ... } } }
/// ```
///
/// A document without a `name` is a support chunk: it runs but registers
/// nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBundleExecutor;

#[derive(Debug, Deserialize)]
struct BundleDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    app: Option<StaticEntry>,
}

#[async_trait]
impl BundleExecutor for JsonBundleExecutor {
    async fn execute(&self, bundle: &Bundle, registrar: &Registrar) -> Result<()> {
        let document: BundleDocument = serde_json::from_slice(&bundle.source)
            .map_err(|e| Error::Load(format!("{}: {e}", bundle.url)))?;

        match (document.name, document.app) {
            (Some(name), Some(app)) => registrar.register(name, Arc::new(app)),
            (Some(name), None) => Err(Error::Load(format!(
                "{}: bundle for '{name}' declares no app",
                bundle.url
            ))),
            (None, _) => {
                tracing::debug!(url = %bundle.url, plugin = %bundle.plugin, "ran support chunk");
                Ok(())
            }
        }
    }
}

/// Outcome of one [`BundleLoader::load_all`] run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Descriptors processed
    pub attempted: usize,
    /// Descriptors skipped because they list no paths
    pub skipped: usize,
    /// Bundles scheduled across all descriptors
    pub bundles: usize,
    /// Bundles that ran successfully
    pub executed: usize,
    /// Bundles that could not be resolved, fetched or run
    pub failed: usize,
    /// Descriptors with at least one failed bundle, in load order
    pub failed_plugins: Vec<String>,
}

impl LoadReport {
    /// Every scheduled bundle either ran or failed
    ///
    /// Says nothing about whether any plugin registered.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.executed + self.failed == self.bundles
    }

    fn record_failure(&mut self, plugin: &str) {
        self.failed += 1;
        if !self.failed_plugins.iter().any(|p| p == plugin) {
            self.failed_plugins.push(plugin.to_string());
        }
    }
}

/// Loads plugin bundles from the runtime origin
#[derive(Clone)]
pub struct BundleLoader {
    client: reqwest::Client,
    origin: Url,
    executor: Arc<dyn BundleExecutor>,
    concurrency: usize,
}

impl BundleLoader {
    /// Create a loader resolving paths against `origin`
    #[must_use]
    pub fn new(origin: Url, executor: Arc<dyn BundleExecutor>) -> Self {
        Self {
            client: reqwest::Client::new(),
            origin,
            executor,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Reuse an existing HTTP client
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Set how many bundles may be fetched at once (at least one)
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Origin paths are resolved against
    #[must_use]
    pub const fn origin(&self) -> &Url {
        &self.origin
    }

    /// Resolve a descriptor path against the origin
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be joined onto the origin
    pub fn resolve(&self, path: &str) -> Result<Url> {
        Ok(self.origin.join(path)?)
    }

    /// Load every bundle of every descriptor
    ///
    /// Returns once each scheduled bundle has either run or failed,
    /// regardless of whether any of them registered.
    pub async fn load_all(
        &self,
        descriptors: &[PluginDescriptor],
        registrar: &Registrar,
    ) -> LoadReport {
        let mut report = LoadReport::default();
        let mut scheduled = Vec::new();

        for descriptor in descriptors {
            report.attempted += 1;

            if !descriptor.has_paths() {
                tracing::warn!(plugin = %descriptor.name, "descriptor lists no paths, skipping");
                report.skipped += 1;
                continue;
            }

            for path in &descriptor.paths {
                report.bundles += 1;
                match self.resolve(path) {
                    Ok(url) => scheduled.push((descriptor.name.clone(), url)),
                    Err(e) => {
                        tracing::warn!(plugin = %descriptor.name, path = %path, error = %e, "cannot resolve bundle path");
                        report.record_failure(&descriptor.name);
                    }
                }
            }
        }

        let client = &self.client;
        let mut fetched = futures::stream::iter(scheduled.into_iter().map(|(plugin, url)| async move {
            let source = fetch_bundle(client, &url).await;
            (plugin, url, source)
        }))
        .buffered(self.concurrency);

        while let Some((plugin, url, source)) = fetched.next().await {
            let outcome = match source {
                Ok(source) => {
                    let bundle = Bundle {
                        plugin: plugin.clone(),
                        url: url.clone(),
                        source,
                    };
                    self.executor.execute(&bundle, registrar).await
                }
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => {
                    tracing::debug!(plugin = %plugin, url = %url, "bundle executed");
                    report.executed += 1;
                }
                Err(e) => {
                    tracing::warn!(plugin = %plugin, url = %url, error = %e, "bundle failed to load");
                    report.record_failure(&plugin);
                }
            }
        }

        tracing::info!(
            attempted = report.attempted,
            bundles = report.bundles,
            executed = report.executed,
            failed = report.failed,
            skipped = report.skipped,
            "bundle loading finished"
        );
        report
    }
}

impl std::fmt::Debug for BundleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleLoader")
            .field("origin", &self.origin.as_str())
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

async fn fetch_bundle(client: &reqwest::Client, url: &Url) -> Result<Vec<u8>> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| Error::Load(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Load(format!("{url} answered {status}")));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| Error::Load(format!("{url}: {e}")))?;
    Ok(body.to_vec())
}
