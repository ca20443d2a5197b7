//! Plugin entry contract
//!
//! Bundles are built without any knowledge of the host, so the host cannot
//! trust the shape of what they hand over. Every entry goes through the
//! [`PluginEntry`] trait and is checked for renderability before it reaches
//! the registry.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::access::CapabilityRequirements;

/// Minimal contract a registered plugin entry must satisfy
pub trait PluginEntry: Send + Sync + fmt::Debug {
    /// Whether the entry exposes something the host can mount
    fn is_renderable(&self) -> bool;

    /// Opaque view payload handed to the surrounding view layer
    fn render(&self) -> serde_json::Value;

    /// Human-readable title, if the plugin declares one
    fn title(&self) -> Option<&str> {
        None
    }

    /// Capabilities required before the plugin may be shown
    fn requirements(&self) -> CapabilityRequirements {
        CapabilityRequirements::default()
    }
}

/// Entry declared as data by a bundle document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticEntry {
    /// Display title
    #[serde(default)]
    pub title: Option<String>,
    /// View payload; an entry without one is not renderable
    #[serde(default)]
    pub view: Option<serde_json::Value>,
    /// Capabilities required to show the plugin
    #[serde(default)]
    pub requirements: CapabilityRequirements,
}

impl PluginEntry for StaticEntry {
    fn is_renderable(&self) -> bool {
        self.view.as_ref().is_some_and(|view| !view.is_null())
    }

    fn render(&self) -> serde_json::Value {
        self.view.clone().unwrap_or_default()
    }

    fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    fn requirements(&self) -> CapabilityRequirements {
        self.requirements.clone()
    }
}
