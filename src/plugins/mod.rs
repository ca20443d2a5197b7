//! Runtime plugin loading and registration
//!
//! Plugins are independently built bundles listed by a remote service. The
//! host fetches the list, loads every bundle, and each bundle announces
//! itself over the registration channel. The registry counts distinct
//! registrations against the number of descriptors requested and reports
//! the cycle loaded once they match.

pub mod channel;
pub mod descriptor;
pub mod entry;
pub mod host;
pub mod loader;
pub mod registry;

pub use channel::{Registrar, Registration, RegistrationListener, registration_channel};
pub use descriptor::{DescriptorFetcher, PluginDescriptor};
pub use entry::{PluginEntry, StaticEntry};
pub use host::{CycleReport, PluginHost, RegistryStore};
pub use loader::{Bundle, BundleExecutor, BundleLoader, JsonBundleExecutor, LoadReport};
pub use registry::{PluginRegistry, RegisteredPlugin, RegistryEvent, RegistryPhase, reduce};
