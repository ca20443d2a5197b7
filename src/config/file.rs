//! TOML configuration file loading
//!
//! Supports `~/.config/portal/plugins.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct PortalConfigFile {
    /// Plugin loading configuration
    #[serde(default)]
    pub plugins: PluginsFileConfig,

    /// Capability service configuration
    #[serde(default)]
    pub access: AccessFileConfig,

    /// Inspection API configuration
    #[serde(default)]
    pub server: ServerFileConfig,
}

/// Plugin loading configuration
#[derive(Debug, Default, Deserialize)]
pub struct PluginsFileConfig {
    /// URL of the plugin descriptor list
    pub endpoint: Option<String>,

    /// Origin bundle paths are resolved against
    pub origin: Option<String>,

    /// Bundles fetched at the same time
    pub concurrency: Option<usize>,
}

/// Capability service configuration
#[derive(Debug, Default, Deserialize)]
pub struct AccessFileConfig {
    /// URL of the capability check endpoint
    pub endpoint: Option<String>,
}

/// Inspection API configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,
}

/// Load the TOML config file from the standard path
///
/// Returns `PortalConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> PortalConfigFile {
    config_file_path().map_or_else(PortalConfigFile::default, |path| load_config_file_from(&path))
}

/// Load a TOML config file from an explicit path
///
/// Returns `PortalConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file_from(path: &Path) -> PortalConfigFile {
    if !path.exists() {
        return PortalConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                PortalConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            PortalConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/portal/plugins.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("portal").join("plugins.toml"))
}
