//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::ValidationError;

pub const ENV_BIND_ADDRESS: &str = "HTTP_BIND_ADDRESS";
pub const ENV_BIND_PORT: &str = "HTTP_BIND_PORT";
pub const ENV_ENABLE_PROXY: &str = "UPSTREAM_ENABLE_PROXY";
pub const ENV_UPSTREAM_HOST: &str = "UPSTREAM_HOST";
pub const ENV_UPSTREAM_PORT: &str = "UPSTREAM_PORT";
pub const ENV_WEB_FOLDER: &str = "WEB_FOLDER";

/// Subdirectory of `WEB_FOLDER` holding the compiled bundle.
pub const WEB_PUBLIC_DIR: &str = "public";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: `{value}`")]
    Env { key: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML file without validating it.
pub fn read_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply environment overrides read through `lookup`.
///
/// Unset variables leave the current value alone. The proxy flag is enabled
/// only by the literal string `true`. `WEB_FOLDER` names the web directory;
/// files are served from its `public` subdirectory.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(address) = lookup(ENV_BIND_ADDRESS) {
        config.server.address = address;
    }
    if let Some(port) = lookup(ENV_BIND_PORT) {
        config.server.port = parse_port(ENV_BIND_PORT, port)?;
    }
    if let Some(flag) = lookup(ENV_ENABLE_PROXY) {
        config.upstream.enable_proxy = flag == "true";
    }
    if let Some(host) = lookup(ENV_UPSTREAM_HOST) {
        config.upstream.host = host;
    }
    if let Some(port) = lookup(ENV_UPSTREAM_PORT) {
        config.upstream.port = parse_port(ENV_UPSTREAM_PORT, port)?;
    }
    if let Some(folder) = lookup(ENV_WEB_FOLDER) {
        config.web.folder = PathBuf::from(folder).join(WEB_PUBLIC_DIR);
    }
    Ok(())
}

fn parse_port(key: &'static str, value: String) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { key, value })
}
