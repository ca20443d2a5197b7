//! Configuration management for the plugin runtime
//!
//! Values resolve env > TOML file > default.

pub mod file;

use url::Url;

use crate::plugins::loader::DEFAULT_CONCURRENCY;
use crate::{Error, Result};

use file::PortalConfigFile;

/// Default descriptor list endpoint
const DEFAULT_PLUGINS_ENDPOINT: &str = "http://localhost:8080/api/plugins";

/// Default capability check endpoint
const DEFAULT_CAPABILITY_ENDPOINT: &str = "http://localhost:8080/api/access/check";

/// Default inspection API port
const DEFAULT_API_PORT: u16 = 18890;

/// Plugin runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Where the descriptor list is read from
    pub plugins_endpoint: Url,

    /// Where capability checks are sent
    pub capability_endpoint: Url,

    /// Origin bundle paths are resolved against
    ///
    /// Defaults to the origin of `plugins_endpoint`.
    pub bundle_origin: Url,

    /// Bundles fetched at the same time
    pub load_concurrency: usize,

    /// Inspection API server configuration
    pub api_server: ApiServerConfig,
}

/// Inspection API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port to listen on
    pub port: u16,
}

impl Config {
    /// Load configuration from the environment and the standard config file
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a configured URL is invalid
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a configured URL is invalid
    pub fn from_sources(
        fc: PortalConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let plugins_endpoint = parse_url(
            "PORTAL_PLUGINS_ENDPOINT",
            env("PORTAL_PLUGINS_ENDPOINT")
                .or(fc.plugins.endpoint)
                .as_deref()
                .unwrap_or(DEFAULT_PLUGINS_ENDPOINT),
        )?;

        let capability_endpoint = parse_url(
            "PORTAL_CAPABILITY_ENDPOINT",
            env("PORTAL_CAPABILITY_ENDPOINT")
                .or(fc.access.endpoint)
                .as_deref()
                .unwrap_or(DEFAULT_CAPABILITY_ENDPOINT),
        )?;

        let bundle_origin = match env("PORTAL_BUNDLE_ORIGIN").or(fc.plugins.origin) {
            Some(origin) => parse_url("PORTAL_BUNDLE_ORIGIN", &origin)?,
            None => plugins_endpoint.join("/")?,
        };

        let load_concurrency = env("PORTAL_LOAD_CONCURRENCY")
            .and_then(|s| s.parse().ok())
            .or(fc.plugins.concurrency)
            .unwrap_or(DEFAULT_CONCURRENCY)
            .max(1);

        let api_server = ApiServerConfig {
            port: env("PORTAL_API_PORT")
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(DEFAULT_API_PORT),
        };

        Ok(Self {
            plugins_endpoint,
            capability_endpoint,
            bundle_origin,
            load_concurrency,
            api_server,
        })
    }
}

fn parse_url(key: &str, value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| Error::Config(format!("{key}: invalid url '{value}': {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use file::{AccessFileConfig, PluginsFileConfig, ServerFileConfig};

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_sources(PortalConfigFile::default(), env_from(&[])).unwrap();

        assert_eq!(config.plugins_endpoint.as_str(), DEFAULT_PLUGINS_ENDPOINT);
        assert_eq!(config.capability_endpoint.as_str(), DEFAULT_CAPABILITY_ENDPOINT);
        assert_eq!(config.bundle_origin.as_str(), "http://localhost:8080/");
        assert_eq!(config.load_concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.api_server.port, DEFAULT_API_PORT);
    }

    #[test]
    fn env_overrides_file() {
        let fc = PortalConfigFile {
            plugins: PluginsFileConfig {
                endpoint: Some("https://file.example/plugins".to_string()),
                origin: Some("https://cdn.example/bundles/".to_string()),
                concurrency: Some(2),
            },
            access: AccessFileConfig {
                endpoint: Some("https://file.example/access".to_string()),
            },
            server: ServerFileConfig { port: Some(9000) },
        };
        let env = env_from(&[
            ("PORTAL_PLUGINS_ENDPOINT", "https://env.example/plugins"),
            ("PORTAL_API_PORT", "9100"),
        ]);

        let config = Config::from_sources(fc, env).unwrap();

        assert_eq!(config.plugins_endpoint.as_str(), "https://env.example/plugins");
        assert_eq!(config.capability_endpoint.as_str(), "https://file.example/access");
        assert_eq!(config.bundle_origin.as_str(), "https://cdn.example/bundles/");
        assert_eq!(config.load_concurrency, 2);
        assert_eq!(config.api_server.port, 9100);
    }

    #[test]
    fn origin_follows_plugins_endpoint() {
        let env = env_from(&[("PORTAL_PLUGINS_ENDPOINT", "https://portal.example:8443/rs-access/plugins")]);
        let config = Config::from_sources(PortalConfigFile::default(), env).unwrap();

        assert_eq!(config.bundle_origin.as_str(), "https://portal.example:8443/");
    }

    #[test]
    fn invalid_url_is_a_config_error() {
        let env = env_from(&[("PORTAL_CAPABILITY_ENDPOINT", "not a url")]);
        let err = Config::from_sources(PortalConfigFile::default(), env).unwrap_err();

        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("PORTAL_CAPABILITY_ENDPOINT"));
    }

    #[test]
    fn unparsable_numbers_fall_back() {
        let env = env_from(&[("PORTAL_API_PORT", "lots"), ("PORTAL_LOAD_CONCURRENCY", "0")]);
        let config = Config::from_sources(PortalConfigFile::default(), env).unwrap();

        assert_eq!(config.api_server.port, DEFAULT_API_PORT);
        assert_eq!(config.load_concurrency, 1);
    }
}
