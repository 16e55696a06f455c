//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check backend-specific required values are present
//! - Validate addresses and URLs parse, limits are non-zero
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function over the loaded config
//! - Runs before the config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, StorageBackend};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a valid socket address")]
    InvalidBindAddress(String),

    #[error("observability.metrics_address `{0}` is not a valid socket address")]
    InvalidMetricsAddress(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("ingest.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("storage.postgres.url is required when the postgres backend is selected")]
    MissingPostgresUrl,

    #[error("storage.supabase.url is required when the supabase backend is selected")]
    MissingSupabaseUrl,

    #[error("storage.supabase.url `{0}` is not a valid URL")]
    InvalidSupabaseUrl(String),

    #[error("storage.supabase.service_key is required when the supabase backend is selected")]
    MissingSupabaseKey,

    #[error("sheets.spreadsheet_id is required when the sheets mirror is enabled")]
    MissingSpreadsheetId,

    #[error("sheets.access_token is required when the sheets mirror is enabled")]
    MissingSheetsToken,

    #[error("sheets.endpoint `{0}` is not a valid URL")]
    InvalidSheetsEndpoint(String),
}

/// Check everything and report every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if config.ingest.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    match config.storage.backend {
        StorageBackend::Memory => {}
        StorageBackend::Postgres => {
            if config.storage.postgres.url.is_empty() {
                errors.push(ValidationError::MissingPostgresUrl);
            }
        }
        StorageBackend::Supabase => {
            let supabase = &config.storage.supabase;
            if supabase.url.is_empty() {
                errors.push(ValidationError::MissingSupabaseUrl);
            } else if Url::parse(&supabase.url).is_err() {
                errors.push(ValidationError::InvalidSupabaseUrl(supabase.url.clone()));
            }
            if supabase.service_key.is_empty() {
                errors.push(ValidationError::MissingSupabaseKey);
            }
        }
    }

    if config.sheets.enabled {
        if config.sheets.spreadsheet_id.is_empty() {
            errors.push(ValidationError::MissingSpreadsheetId);
        }
        if config.sheets.access_token.is_empty() {
            errors.push(ValidationError::MissingSheetsToken);
        }
        if Url::parse(&config.sheets.endpoint).is_err() {
            errors.push(ValidationError::InvalidSheetsEndpoint(
                config.sheets.endpoint.clone(),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn postgres_backend_requires_a_url() {
        let mut config = GatewayConfig::default();
        config.storage.backend = StorageBackend::Postgres;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingPostgresUrl]);
    }

    #[test]
    fn supabase_backend_requires_url_and_key() {
        let mut config = GatewayConfig::default();
        config.storage.backend = StorageBackend::Supabase;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::MissingSupabaseUrl));
        assert!(errors.contains(&ValidationError::MissingSupabaseKey));
    }

    #[test]
    fn all_errors_are_reported_together() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.timeouts.request_secs = 0;
        config.sheets.enabled = true;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 4, "got: {errors:?}");
        assert!(errors.contains(&ValidationError::ZeroRequestTimeout));
        assert!(errors.contains(&ValidationError::MissingSpreadsheetId));
        assert!(errors.contains(&ValidationError::MissingSheetsToken));
    }

    #[test]
    fn enabled_sheets_mirror_with_credentials_passes() {
        let mut config = GatewayConfig::default();
        config.sheets.enabled = true;
        config.sheets.spreadsheet_id = "1abc".into();
        config.sheets.access_token = "ya29.token".into();

        assert!(validate_config(&config).is_ok());
    }
}
