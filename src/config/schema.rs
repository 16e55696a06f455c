//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the webhook gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Webhook ingest settings.
    pub ingest: IngestConfig,

    /// Primary storage backend selection and credentials.
    pub storage: StorageConfig,

    /// Optional spreadsheet mirror.
    pub sheets: SheetsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Webhook ingest settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Maximum accepted body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Which backend is the system of record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local map. Development and tests only.
    Memory,
    /// Relational store with event rows and contact aggregates.
    Postgres,
    /// Document inserts through the Supabase REST endpoint (write-only).
    Supabase,
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::Memory
    }
}

/// Primary storage selection.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend the webhook events are written to.
    pub backend: StorageBackend,

    /// Postgres settings, used when `backend = "postgres"`.
    pub postgres: PostgresConfig,

    /// Supabase settings, used when `backend = "supabase"`.
    pub supabase: SupabaseConfig,
}

/// Postgres connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PostgresConfig {
    /// Connection string. Usually injected via `DATABASE_URL`.
    pub url: String,

    /// Connection pool size.
    pub max_connections: u32,

    /// Pool acquire timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 5,
            connect_timeout_secs: 5,
        }
    }
}

/// Supabase REST settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SupabaseConfig {
    /// Project base URL (e.g., "https://xyz.supabase.co").
    pub url: String,

    /// Service role key. Usually injected via `SUPABASE_SERVICE_KEY`.
    pub service_key: String,

    /// Destination table.
    pub table: String,

    /// Outbound request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            service_key: String::new(),
            table: "webhook_events".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Spreadsheet mirror settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SheetsConfig {
    /// Mirror accepted events into a spreadsheet.
    pub enabled: bool,

    /// Target spreadsheet. Usually injected via `SPREADSHEET_ID`.
    pub spreadsheet_id: String,

    /// Range rows are appended to.
    pub range: String,

    /// Sheets API endpoint. Overridable for tests.
    pub endpoint: String,

    /// OAuth bearer token. Usually injected via `SHEETS_ACCESS_TOKEN`.
    pub access_token: String,

    /// Write the header row at startup when the sheet is blank.
    pub write_header: bool,

    /// Outbound request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            spreadsheet_id: String::new(),
            range: "Webhooks!A:K".to_string(),
            endpoint: "https://sheets.googleapis.com".to_string(),
            access_token: String::new(),
            write_header: true,
            request_timeout_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
