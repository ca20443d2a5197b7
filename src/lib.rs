//! Portal Plugins - runtime plugin loading for the portal shell
//!
//! This library provides the plugin runtime behind the portal:
//! - Fetching the plugin descriptor list from the portal service
//! - Loading independently built plugin bundles
//! - A registry that reports when every requested plugin has registered
//! - Capability-gated rendering of plugin content
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   descriptors   ┌──────────────┐   bundles   ┌──────────┐
//! │ Plugin list  ├────────────────►│ PluginHost   ├────────────►│ Bundles  │
//! └──────────────┘                 │  (loader)    │             └────┬─────┘
//!                                  └──────┬───────┘                  │
//!                                         │ CycleStarted             │ register
//!                                  ┌──────▼───────┐   Registered     │
//!                                  │ Registry     │◄─────────────────┘
//!                                  │  store       │
//!                                  └──────┬───────┘
//!                                         │ entries
//!                                  ┌──────▼───────┐   check   ┌──────────────┐
//!                                  │ AccessGate   ├──────────►│ Capabilities │
//!                                  └──────────────┘           └──────────────┘
//! ```

pub mod access;
pub mod api;
pub mod config;
pub mod error;
pub mod navigation;
pub mod plugins;
pub mod store;

pub use access::{
    AccessGate, CapabilityRequirement, CapabilityRequirements, CapabilityService, GateState,
    HttpCapabilityService, StaticCapabilities,
};
pub use config::Config;
pub use error::{Error, Result};
pub use navigation::{PluginLink, plugin_links, visible_links};
pub use plugins::{
    PluginDescriptor, PluginEntry, PluginHost, PluginRegistry, Registrar, RegisteredPlugin,
    RegistryEvent, RegistryPhase, StaticEntry,
};
pub use store::Store;
