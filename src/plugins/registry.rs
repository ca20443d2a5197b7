//! Plugin registry state slice
//!
//! The registry is never mutated in place. Every change goes through
//! [`reduce`], which takes the current snapshot and one [`RegistryEvent`] and
//! returns the next snapshot. The host feeds it through a
//! [`Store`](crate::store::Store), which makes dispatch the only write path.
//!
//! Completion is inferred: the registry knows how many descriptors were
//! requested for the current cycle and flips `loaded` once that many distinct
//! names have registered. A bundle that never registers leaves the cycle
//! partially loaded for good.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::entry::PluginEntry;

/// A plugin that has registered with the host
#[derive(Debug, Clone)]
pub struct RegisteredPlugin {
    /// Registered name
    pub name: String,
    /// Entry object handed over by the bundle
    pub entry: Arc<dyn PluginEntry>,
    /// When the registration reached the host
    pub registered_at: DateTime<Utc>,
}

impl RegisteredPlugin {
    /// Record a registration made now
    #[must_use]
    pub fn new(name: impl Into<String>, entry: Arc<dyn PluginEntry>) -> Self {
        Self {
            name: name.into(),
            entry,
            registered_at: Utc::now(),
        }
    }
}

/// Same name and the very same entry object
impl PartialEq for RegisteredPlugin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.entry, &other.entry)
    }
}

/// Lifecycle phase of the current load cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryPhase {
    /// No cycle has started yet
    #[default]
    Empty,
    /// A cycle started and nothing has registered yet
    Loading,
    /// Some plugins registered, fewer than expected
    PartiallyLoaded,
    /// Every expected plugin registered
    Loaded,
}

/// Events the registry reacts to
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// A fresh load cycle started for `expected` descriptors
    CycleStarted {
        /// Cycle number, increasing per host
        cycle: u64,
        /// Number of descriptors requested in this cycle
        expected: usize,
    },
    /// A fresh load cycle started but the descriptor list could not be read
    CycleFailed {
        /// Cycle number, increasing per host
        cycle: u64,
    },
    /// A validated registration arrived
    Registered(RegisteredPlugin),
}

/// Registered plugins plus the "all plugins loaded" flag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginRegistry {
    items: BTreeMap<String, RegisteredPlugin>,
    loaded: bool,
    phase: RegistryPhase,
    expected: Option<usize>,
    cycle: u64,
    version: u64,
}

impl PluginRegistry {
    /// Look up a plugin by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredPlugin> {
        self.items.get(name)
    }

    /// Registered plugins in name order
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredPlugin> {
        self.items.values()
    }

    /// Registered names in order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.items.keys().map(String::as_str).collect()
    }

    /// Number of distinct registered names
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether every expected plugin has registered in this cycle
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> RegistryPhase {
        self.phase
    }

    /// Descriptor count of the current cycle, if one started
    #[must_use]
    pub const fn expected(&self) -> Option<usize> {
        self.expected
    }

    /// How many registrations are still missing for this cycle
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.expected
            .map_or(0, |expected| expected.saturating_sub(self.items.len()))
    }

    /// Current cycle number, 0 before the first cycle
    #[must_use]
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Number of transitions applied so far
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }
}

/// Apply one event to a registry snapshot
///
/// Starting a cycle discards every registration; a cycle start whose number
/// is not newer than the current one is ignored. A cycle with no descriptors
/// is loaded right away, while a failed cycle has no expected count and never
/// loads. A registration under an existing name replaces the earlier entry
/// (last write wins) and does not count twice. `loaded` flips at most once
/// per cycle, when the distinct-name count reaches the expected count.
#[must_use]
pub fn reduce(state: &PluginRegistry, event: RegistryEvent) -> PluginRegistry {
    let version = state.version + 1;

    match event {
        RegistryEvent::CycleStarted { cycle, .. } | RegistryEvent::CycleFailed { cycle }
            if cycle <= state.cycle =>
        {
            state.clone()
        }
        RegistryEvent::CycleStarted { cycle, expected } => {
            let loaded = expected == 0;
            PluginRegistry {
                items: BTreeMap::new(),
                loaded,
                phase: if loaded {
                    RegistryPhase::Loaded
                } else {
                    RegistryPhase::Loading
                },
                expected: Some(expected),
                cycle,
                version,
            }
        }
        RegistryEvent::CycleFailed { cycle } => PluginRegistry {
            items: BTreeMap::new(),
            loaded: false,
            phase: RegistryPhase::Loading,
            expected: None,
            cycle,
            version,
        },
        RegistryEvent::Registered(plugin) => {
            let mut items = state.items.clone();
            items.insert(plugin.name.clone(), plugin);

            let complete = state.loaded || state.expected == Some(items.len());
            let phase = if complete {
                RegistryPhase::Loaded
            } else {
                RegistryPhase::PartiallyLoaded
            };

            PluginRegistry {
                items,
                loaded: complete,
                phase,
                expected: state.expected,
                cycle: state.cycle,
                version,
            }
        }
    }
}
