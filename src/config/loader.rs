//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", "))]
    Validation(Vec<ValidationError>),
}

/// Expand `${NAME}` environment variable references in the raw config
/// text before parsing. A reference to an unset variable is left
/// untouched (not an error) so defaults embedded in the file still
/// work when the operator hasn't set the variable.
fn expand_env_vars(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        let Some(end_rel) = rest[start..].find('}') else {
            output.push_str(rest);
            return output;
        };
        let end = start + end_rel;

        output.push_str(&rest[..start]);
        let name = &rest[start + 2..end];
        match std::env::var(name) {
            Ok(value) => output.push_str(&value),
            Err(_) => {
                output.push_str("${");
                output.push_str(name);
                output.push('}');
            }
        }
        rest = &rest[end + 1..];
    }
    output.push_str(rest);
    output
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let expanded = expand_env_vars(&content);
    let config: ProxyConfig = toml::from_str(&expanded)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
