//! Capability services answering allow/deny for `(verb, resource)` pairs

use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use super::requirement::CapabilityRequirement;
use crate::{Error, Result};

/// Source of allow/deny decisions
///
/// `Ok(true)` means allowed, `Ok(false)` denied. An `Err` means the check
/// could not complete; callers treat it as a denial.
#[async_trait]
pub trait CapabilityService: Send + Sync {
    /// Check a single requirement
    async fn check(&self, requirement: &CapabilityRequirement) -> Result<bool>;

    /// Check a batch of requirements, one result per input in input order
    ///
    /// The default issues every check concurrently; services that support
    /// batching natively can override it.
    async fn check_all(&self, requirements: &[CapabilityRequirement]) -> Vec<Result<bool>> {
        futures::future::join_all(requirements.iter().map(|r| self.check(r))).await
    }
}

/// Capability service backed by a remote HTTP endpoint
///
/// Issues `GET <endpoint>?verb=<VERB>&resource=<RESOURCE>`; `200` means
/// allowed and any other status means denied.
#[derive(Debug, Clone)]
pub struct HttpCapabilityService {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpCapabilityService {
    /// Create a service for the given endpoint
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    /// Create a service reusing an existing HTTP client
    #[must_use]
    pub const fn with_client(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    /// Endpoint checks are sent to
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl CapabilityService for HttpCapabilityService {
    async fn check(&self, requirement: &CapabilityRequirement) -> Result<bool> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("verb", requirement.verb.as_str()),
                ("resource", requirement.resource.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Capability(format!("{requirement}: {e}")))?;

        let allowed = response.status() == StatusCode::OK;
        tracing::debug!(
            verb = %requirement.verb,
            resource = %requirement.resource,
            status = %response.status(),
            allowed,
            "capability checked"
        );
        Ok(allowed)
    }
}
