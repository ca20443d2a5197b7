//! Plugin host: drives load cycles and feeds registrations into the registry

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use super::channel::{Registrar, RegistrationListener, registration_channel};
use super::descriptor::{DescriptorFetcher, PluginDescriptor};
use super::loader::{BundleLoader, JsonBundleExecutor, LoadReport};
use super::registry::{PluginRegistry, RegistryEvent, reduce};
use crate::Config;
use crate::store::Store;

/// Store holding the plugin registry slice
pub type RegistryStore = Store<PluginRegistry, RegistryEvent>;

/// Summary of one load cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// Cycle number
    pub cycle: u64,
    /// Descriptors the cycle was started for
    pub descriptors: Vec<PluginDescriptor>,
    /// Why the descriptor list could not be read, if it could not
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<String>,
    /// A newer cycle started before this one could reset the registry
    pub superseded: bool,
    /// What the loader did with them
    pub load: LoadReport,
}

/// Owns the registry and runs plugin load cycles
///
/// Registrations arrive over the registration channel and are applied by a
/// single listener task, so the registry store's dispatch stays the only
/// write path.
pub struct PluginHost {
    fetcher: DescriptorFetcher,
    loader: BundleLoader,
    store: Arc<RegistryStore>,
    registrar: Registrar,
    listener: Mutex<Option<RegistrationListener>>,
    listener_task: Mutex<Option<JoinHandle<()>>>,
    cycles: AtomicU64,
}

impl PluginHost {
    /// Create a host; call [`start`](Self::start) before loading
    #[must_use]
    pub fn new(fetcher: DescriptorFetcher, loader: BundleLoader) -> Self {
        let (registrar, listener) = registration_channel();
        Self {
            fetcher,
            loader,
            store: Arc::new(Store::new(PluginRegistry::default(), reduce)),
            registrar,
            listener: Mutex::new(Some(listener)),
            listener_task: Mutex::new(None),
            cycles: AtomicU64::new(0),
        }
    }

    /// Build a host from configuration, executing JSON bundles
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let client = reqwest::Client::new();
        let fetcher = DescriptorFetcher::with_client(client.clone(), config.plugins_endpoint.clone());
        let loader = BundleLoader::new(config.bundle_origin.clone(), Arc::new(JsonBundleExecutor))
            .with_client(client)
            .with_concurrency(config.load_concurrency);
        Self::new(fetcher, loader)
    }

    /// Start applying registrations to the registry
    ///
    /// Calling it more than once has no effect.
    pub async fn start(&self) {
        let Some(listener) = self.listener.lock().await.take() else {
            tracing::debug!("plugin host already started");
            return;
        };

        let store = Arc::clone(&self.store);
        let task = tokio::spawn(listen(listener, store));
        *self.listener_task.lock().await = Some(task);
        tracing::debug!("plugin registration listener started");
    }

    /// Stop applying registrations
    pub async fn shutdown(&self) {
        if let Some(task) = self.listener_task.lock().await.take() {
            task.abort();
            tracing::debug!("plugin registration listener stopped");
        }
    }

    /// Run one load cycle
    ///
    /// Fetches the descriptor list, resets the registry for the new cycle
    /// and loads every bundle. A fetch failure yields a cycle with no
    /// expected count, whose registry never reports loaded; an empty list
    /// yields a cycle that is loaded at once. When a newer cycle has already
    /// reset the registry by the time the fetch returns, this one is
    /// superseded and loads nothing.
    pub async fn load_cycle(&self) -> CycleReport {
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;

        let (descriptors, fetch_error) = self.fetcher.fetch_or_empty().await;
        let registry = if let Some(e) = &fetch_error {
            tracing::warn!(cycle, error = %e, "plugin descriptor fetch failed, no plugins will load");
            self.store.dispatch(RegistryEvent::CycleFailed { cycle })
        } else {
            self.store.dispatch(RegistryEvent::CycleStarted {
                cycle,
                expected: descriptors.len(),
            })
        };

        let superseded = registry.cycle() != cycle;
        let load = if superseded {
            tracing::info!(cycle, current = registry.cycle(), "plugin load cycle superseded");
            LoadReport::default()
        } else {
            tracing::info!(cycle, expected = descriptors.len(), "plugin load cycle started");
            if registry.is_loaded() {
                tracing::info!(cycle, "no plugins requested, registry loaded");
            }
            self.loader.load_all(&descriptors, &self.registrar).await
        };

        CycleReport {
            cycle,
            descriptors,
            fetch_error: fetch_error.map(|e| e.to_string()),
            superseded,
            load,
        }
    }

    /// Discard every registration and run a fresh cycle
    pub async fn reload(&self) -> CycleReport {
        tracing::info!("reloading plugins");
        self.load_cycle().await
    }

    /// Producer handle for code that registers plugins directly
    #[must_use]
    pub fn registrar(&self) -> Registrar {
        self.registrar.clone()
    }

    /// Current registry snapshot
    #[must_use]
    pub fn registry(&self) -> Arc<PluginRegistry> {
        self.store.state()
    }

    /// Subscribe to registry changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<PluginRegistry>> {
        self.store.subscribe()
    }

    /// Wait until every expected plugin of the current cycle has registered
    ///
    /// Waits indefinitely if a bundle never registers.
    pub async fn wait_until_loaded(&self) -> Arc<PluginRegistry> {
        self.store.wait_for(PluginRegistry::is_loaded).await
    }

    /// The underlying registry store
    #[must_use]
    pub const fn store(&self) -> &Arc<RegistryStore> {
        &self.store
    }
}

impl Drop for PluginHost {
    fn drop(&mut self) {
        if let Some(task) = self.listener_task.get_mut().take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for PluginHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHost")
            .field("fetcher", &self.fetcher)
            .field("loader", &self.loader)
            .field("cycles", &self.cycles.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

async fn listen(mut listener: RegistrationListener, store: Arc<RegistryStore>) {
    while let Some(registration) = listener.recv().await {
        let plugin = match registration.validate() {
            Ok(plugin) => plugin,
            Err(e) => {
                tracing::warn!(error = %e, "rejected plugin registration");
                continue;
            }
        };

        let name = plugin.name.clone();
        let previous = store.state();
        if previous.get(&name).is_some() {
            tracing::warn!(plugin = %name, "plugin registered twice, keeping the latest entry");
        }

        let registry = store.dispatch(RegistryEvent::Registered(plugin));
        tracing::info!(
            plugin = %name,
            cycle = registry.cycle(),
            registered = registry.len(),
            expected = ?registry.expected(),
            loaded = registry.is_loaded(),
            "plugin registered"
        );
        if registry.is_loaded() && !previous.is_loaded() {
            tracing::info!(cycle = registry.cycle(), "all plugins loaded");
        }
    }
    tracing::debug!("registration channel closed");
}
