//! Plugin descriptors and the remote descriptor list

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// One plugin offered by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Plugin name, expected to match the name the bundle registers under
    pub name: String,
    /// Bundle locations, relative to the runtime origin
    #[serde(default)]
    pub paths: Vec<String>,
}

impl PluginDescriptor {
    /// Create a descriptor
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether there is anything to load for this descriptor
    #[must_use]
    pub fn has_paths(&self) -> bool {
        !self.paths.is_empty()
    }
}

/// Fetch the list of available plugins from the remote service
#[derive(Debug, Clone)]
pub struct DescriptorFetcher {
    client: reqwest::Client,
    endpoint: Url,
}

impl DescriptorFetcher {
    /// Create a fetcher for the given endpoint
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    /// Create a fetcher reusing an existing HTTP client
    #[must_use]
    pub const fn with_client(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    /// Endpoint the list is read from
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Read the descriptor list with a single request
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] on transport failure, any status other than
    /// `200`, or a body that is not a descriptor list. Never retries.
    pub async fn fetch(&self) -> Result<Vec<PluginDescriptor>> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::Fetch(format!("{} answered {status}", self.endpoint)));
        }

        let descriptors: Vec<PluginDescriptor> = response
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("invalid descriptor list: {e}")))?;

        tracing::debug!(
            endpoint = %self.endpoint,
            count = descriptors.len(),
            "fetched plugin descriptors"
        );
        Ok(descriptors)
    }

    /// Read the descriptor list, falling back to an empty list on failure
    ///
    /// The failure is handed back alongside the empty list so the caller
    /// can surface it.
    pub async fn fetch_or_empty(&self) -> (Vec<PluginDescriptor>, Option<Error>) {
        match self.fetch().await {
            Ok(descriptors) => (descriptors, None),
            Err(e) => (Vec::new(), Some(e)),
        }
    }
}
