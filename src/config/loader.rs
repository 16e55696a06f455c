//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

// Deployment platforms hand out credentials and the port as environment
// variables; those always win over the file.
fn apply_env_overrides(config: &mut GatewayConfig) {
    if let Ok(port) = std::env::var("PORT") {
        config.listener.bind_address = format!("0.0.0.0:{port}");
    }
    if let Ok(bind) = std::env::var("WASPEED_BIND") {
        config.listener.bind_address = bind;
    }
    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.storage.postgres.url = url;
    }
    if let Ok(url) = std::env::var("SUPABASE_URL") {
        config.storage.supabase.url = url;
    }
    if let Ok(key) = std::env::var("SUPABASE_SERVICE_KEY") {
        config.storage.supabase.service_key = key;
    }
    if let Ok(id) = std::env::var("SPREADSHEET_ID") {
        config.sheets.spreadsheet_id = id;
    }
    if let Ok(token) = std::env::var("SHEETS_ACCESS_TOKEN") {
        config.sheets.access_token = token;
    }
}
