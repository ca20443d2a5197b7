//! In-memory capability grants

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::requirement::{CapabilityRequirement, CapabilityRequirements};
use super::service::CapabilityService;
use crate::Result;

/// Fixed set of granted capabilities
///
/// Anything not listed is denied. Deserializes from the same grouped shape
/// as requirements:
///
/// ```json
/// { "GET": ["/accounts", "/projects"], "POST": ["/projects"] }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticCapabilities {
    granted: CapabilityRequirements,
}

impl StaticCapabilities {
    /// Grant exactly the given pairs
    #[must_use]
    pub const fn new(granted: CapabilityRequirements) -> Self {
        Self { granted }
    }

    /// Builder form for granting one more pair
    #[must_use]
    pub fn grant(mut self, verb: impl AsRef<str>, resource: impl Into<String>) -> Self {
        self.granted.insert(CapabilityRequirement::new(verb, resource));
        self
    }

    /// Whether a pair is granted
    #[must_use]
    pub fn is_granted(&self, requirement: &CapabilityRequirement) -> bool {
        self.granted.contains(requirement)
    }
}

#[async_trait]
impl CapabilityService for StaticCapabilities {
    async fn check(&self, requirement: &CapabilityRequirement) -> Result<bool> {
        Ok(self.is_granted(requirement))
    }
}
