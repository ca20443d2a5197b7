//! Capability requirements declared by renderable units

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single `(verb, resource)` pair that must be allowed
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CapabilityRequirement {
    /// HTTP verb, upper-cased (e.g. "GET")
    pub verb: String,
    /// Endpoint the verb is applied to (e.g. "/accounts")
    pub resource: String,
}

impl CapabilityRequirement {
    /// Create a requirement, normalizing the verb to upper case
    #[must_use]
    pub fn new(verb: impl AsRef<str>, resource: impl Into<String>) -> Self {
        Self {
            verb: verb.as_ref().trim().to_ascii_uppercase(),
            resource: resource.into(),
        }
    }
}

impl fmt::Display for CapabilityRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb, self.resource)
    }
}

/// Requirements grouped by verb: `{"GET": ["/x", "/y"], "POST": ["/x"]}`
///
/// Duplicate pairs collapse, so every distinct pair is checked exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Vec<String>>", into = "BTreeMap<String, Vec<String>>")]
pub struct CapabilityRequirements {
    by_verb: BTreeMap<String, BTreeSet<String>>,
}

impl CapabilityRequirements {
    /// Empty requirement set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert)
    #[must_use]
    pub fn require(mut self, verb: impl AsRef<str>, resource: impl Into<String>) -> Self {
        self.insert(CapabilityRequirement::new(verb, resource));
        self
    }

    /// Add a requirement, returning false if it was already present
    pub fn insert(&mut self, requirement: CapabilityRequirement) -> bool {
        self.by_verb
            .entry(requirement.verb)
            .or_default()
            .insert(requirement.resource)
    }

    /// Whether the exact pair is part of this set
    #[must_use]
    pub fn contains(&self, requirement: &CapabilityRequirement) -> bool {
        self.by_verb
            .get(&requirement.verb)
            .is_some_and(|resources| resources.contains(&requirement.resource))
    }

    /// Distinct pairs in verb, then resource order
    #[must_use]
    pub fn pairs(&self) -> Vec<CapabilityRequirement> {
        self.by_verb
            .iter()
            .flat_map(|(verb, resources)| {
                resources.iter().map(move |resource| CapabilityRequirement {
                    verb: verb.clone(),
                    resource: resource.clone(),
                })
            })
            .collect()
    }

    /// Number of distinct pairs
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_verb.values().map(BTreeSet::len).sum()
    }

    /// Whether no pair is required
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<CapabilityRequirement> for CapabilityRequirements {
    fn from_iter<I: IntoIterator<Item = CapabilityRequirement>>(iter: I) -> Self {
        let mut requirements = Self::new();
        for requirement in iter {
            requirements.insert(requirement);
        }
        requirements
    }
}

impl From<BTreeMap<String, Vec<String>>> for CapabilityRequirements {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        map.into_iter()
            .flat_map(|(verb, resources)| {
                resources
                    .into_iter()
                    .map(move |resource| CapabilityRequirement::new(&verb, resource))
            })
            .collect()
    }
}

impl From<CapabilityRequirements> for BTreeMap<String, Vec<String>> {
    fn from(requirements: CapabilityRequirements) -> Self {
        requirements
            .by_verb
            .into_iter()
            .filter(|(_, resources)| !resources.is_empty())
            .map(|(verb, resources)| (verb, resources.into_iter().collect()))
            .collect()
    }
}
