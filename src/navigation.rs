//! Navigation links for registered plugins
//!
//! Every registered plugin gets one link, wrapped in an [`AccessGate`]
//! carrying the capabilities its entry declares. A link is only shown once
//! its gate resolves to allowed.

use std::sync::Arc;

use serde::Serialize;

use crate::access::{AccessGate, CapabilityService};
use crate::plugins::PluginRegistry;

/// Link to a plugin mount point
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginLink {
    /// Registered plugin name
    pub name: String,
    /// Display title, falling back to the name
    pub title: String,
    /// Location of the plugin mount point
    pub href: String,
}

impl PluginLink {
    /// Whether the router's current location is inside this plugin
    #[must_use]
    pub fn is_active(&self, location: &str) -> bool {
        location == self.href
            || location
                .strip_prefix(self.href.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// One gated link per registered plugin, in name order
///
/// The gates come back unmounted.
#[must_use]
pub fn plugin_links(registry: &PluginRegistry, base: &str) -> Vec<AccessGate<PluginLink>> {
    let base = base.trim_end_matches('/');
    registry
        .iter()
        .map(|plugin| {
            let link = PluginLink {
                name: plugin.name.clone(),
                title: plugin
                    .entry
                    .title()
                    .map_or_else(|| plugin.name.clone(), str::to_string),
                href: format!("{base}/{}", plugin.name),
            };
            AccessGate::new(link, plugin.entry.requirements())
        })
        .collect()
}

/// Links the capability service allows, in name order
///
/// Mounts every gate, waits for all of them to resolve and keeps the ones
/// that were granted.
pub async fn visible_links(
    registry: &PluginRegistry,
    base: &str,
    service: Arc<dyn CapabilityService>,
) -> Vec<PluginLink> {
    let mut gates = plugin_links(registry, base);
    for gate in &mut gates {
        gate.mount(Arc::clone(&service));
    }

    futures::future::join_all(gates.iter().map(|gate| gate.resolved())).await;

    gates
        .iter()
        .filter_map(|gate| gate.render().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{CapabilityRequirements, StaticCapabilities};
    use crate::plugins::{RegisteredPlugin, RegistryEvent, StaticEntry, reduce};

    fn entry(title: Option<&str>, requirements: CapabilityRequirements) -> Arc<StaticEntry> {
        Arc::new(StaticEntry {
            title: title.map(str::to_string),
            view: Some(serde_json::json!({"component": "board"})),
            requirements,
        })
    }

    fn registry() -> PluginRegistry {
        let mut state = reduce(
            &PluginRegistry::default(),
            RegistryEvent::CycleStarted {
                cycle: 1,
                expected: 3,
            },
        );
        for (name, entry) in [
            (
                "accounts",
                entry(
                    Some("Accounts"),
                    CapabilityRequirements::new().require("GET", "/accounts"),
                ),
            ),
            (
                "projects",
                entry(
                    None,
                    CapabilityRequirements::new()
                        .require("GET", "/projects")
                        .require("POST", "/projects"),
                ),
            ),
            ("about", entry(None, CapabilityRequirements::new())),
        ] {
            state = reduce(
                &state,
                RegistryEvent::Registered(RegisteredPlugin::new(name, entry)),
            );
        }
        state
    }

    #[test]
    fn one_unmounted_gate_per_plugin() {
        let gates = plugin_links(&registry(), "/admin/plugins/");

        assert_eq!(gates.len(), 3);
        assert!(gates.iter().all(|gate| !gate.is_mounted()));
        assert!(gates.iter().all(|gate| gate.render().is_none()));
        assert_eq!(gates[1].requirements().len(), 1);
        assert_eq!(gates[2].requirements().len(), 2);
    }

    #[tokio::test]
    async fn only_allowed_links_are_visible() {
        let service = Arc::new(
            StaticCapabilities::default()
                .grant("GET", "/accounts")
                .grant("GET", "/projects"),
        );

        let links = visible_links(&registry(), "/admin/plugins", service).await;

        let names: Vec<&str> = links.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["about", "accounts"]);
        assert_eq!(links[1].title, "Accounts");
        assert_eq!(links[1].href, "/admin/plugins/accounts");
        assert_eq!(links[0].title, "about");
    }

    #[test]
    fn active_link_matching() {
        let link = PluginLink {
            name: "accounts".to_string(),
            title: "Accounts".to_string(),
            href: "/admin/plugins/accounts".to_string(),
        };

        assert!(link.is_active("/admin/plugins/accounts"));
        assert!(link.is_active("/admin/plugins/accounts/42/edit"));
        assert!(!link.is_active("/admin/plugins/accounts-archive"));
        assert!(!link.is_active("/admin/plugins"));
    }
}
