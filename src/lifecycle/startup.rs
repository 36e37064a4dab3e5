//! Startup orchestration.
//!
//! # Responsibilities
//! - Write a default configuration file on first run, so the process
//!   has something to load without an operator-authored file
//! - Load and validate that configuration
//!
//! # Design Decisions
//! - Fail fast: a malformed configuration file is a fatal startup
//!   error, not a fallback-to-defaults

use std::path::Path;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::ProxyConfig;

/// Load the configuration at `path`, writing a default file first if
/// none exists yet.
pub fn load_or_init(path: &Path) -> Result<ProxyConfig, ConfigError> {
    if !path.exists() {
        tracing::warn!(path = ?path, "config file not found, writing default configuration");
        let default_config = ProxyConfig::default();
        let toml_string = toml::to_string_pretty(&default_config).expect("default config always serializes");
        std::fs::write(path, toml_string)?;
    }

    load_config(path)
}
