//! Registration channel between running bundles and the host
//!
//! Bundles announce themselves through a [`Registrar`]. It carries no
//! reference to the host's state container: any number of independently
//! built producers send `(name, entry)` pairs and a single
//! [`RegistrationListener`] owned by the host receives them, in whatever
//! order they arrive.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::entry::PluginEntry;
use super::registry::RegisteredPlugin;
use crate::{Error, Result};

/// A plugin announcing itself to the host
#[derive(Debug, Clone)]
pub struct Registration {
    /// Name the plugin registers under
    pub name: String,
    /// Entry object handed over by the bundle
    pub entry: Arc<dyn PluginEntry>,
}

impl Registration {
    /// Check the registration before it is trusted
    ///
    /// # Errors
    ///
    /// Returns [`Error::Registration`] if the name is blank or the entry is
    /// not renderable
    pub fn validate(self) -> Result<RegisteredPlugin> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(Error::Registration("plugin name is empty".to_string()));
        }
        if !self.entry.is_renderable() {
            return Err(Error::Registration(format!(
                "plugin '{name}' registered an entry that cannot be rendered"
            )));
        }
        Ok(RegisteredPlugin::new(name, self.entry))
    }
}

/// Producer side of the registration channel
///
/// Cheap to clone; hand one to every bundle executor.
#[derive(Clone)]
pub struct Registrar {
    tx: mpsc::UnboundedSender<Registration>,
}

impl Registrar {
    /// Announce a plugin to the host
    ///
    /// Raises exactly one registration event and returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Registration`] if the host is no longer listening
    pub fn register(&self, name: impl Into<String>, entry: Arc<dyn PluginEntry>) -> Result<()> {
        let name = name.into();
        tracing::debug!(plugin = %name, "plugin announced itself");
        self.tx
            .send(Registration { name, entry })
            .map_err(|e| Error::Registration(format!("host stopped listening for '{}'", e.0.name)))
    }
}

impl fmt::Debug for Registrar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registrar")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Consumer side of the registration channel, owned by the host
#[derive(Debug)]
pub struct RegistrationListener {
    rx: mpsc::UnboundedReceiver<Registration>,
}

impl RegistrationListener {
    /// Wait for the next registration
    ///
    /// Returns `None` once every [`Registrar`] has been dropped.
    pub async fn recv(&mut self) -> Option<Registration> {
        self.rx.recv().await
    }

    /// Take a registration if one is already queued
    pub fn try_recv(&mut self) -> Option<Registration> {
        self.rx.try_recv().ok()
    }
}

/// Create a connected registrar/listener pair
#[must_use]
pub fn registration_channel() -> (Registrar, RegistrationListener) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Registrar { tx }, RegistrationListener { rx })
}
