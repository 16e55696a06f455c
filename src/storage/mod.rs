//! Storage adapter subsystem.
//!
//! # Data Flow
//! ```text
//! accepted webhook
//!     → forwarder.rs (primary write, then best-effort mirrors)
//!         → postgres.rs | supabase.rs | memory.rs   (primary)
//!         → sheets.rs                               (mirror)
//!
//! API reads:
//!     api handlers → EventStore (postgres.rs | memory.rs)
//! ```
//!
//! # Design Decisions
//! - Adapters are trait objects picked once at startup; no hot swapping
//! - Every backend can persist; only queryable backends implement
//!   [`EventStore`], and the API answers 501 without one
//! - Persist failures are logged and counted, never retried here

pub mod forwarder;
pub mod memory;
pub mod postgres;
pub mod sheets;
pub mod supabase;

pub use forwarder::Forwarder;
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use sheets::SheetsAdapter;
pub use supabase::SupabaseAdapter;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{GatewayConfig, StorageBackend};
use crate::webhook::record::{Contact, NormalizedEvent, StoredEvent};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Postgres query or connection failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Outbound request never produced a response.
    #[error("request to {backend} failed: {source}")]
    Http {
        backend: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Destination answered with a non-success status.
    #[error("{backend} rejected the write: HTTP {status}: {body}")]
    Rejected {
        backend: &'static str,
        status: u16,
        body: String,
    },

    /// Record could not be serialized for the destination.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A destination that can persist one normalized event.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Short name used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// Write one event together with its raw payload.
    async fn persist(&self, event: &NormalizedEvent, raw: &Value) -> StorageResult<()>;
}

/// Filters shared by the list, bulk delete and stats queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    /// Exact event type match.
    pub event_id: Option<String>,
    /// Inclusive lower bound on `received_at`.
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `received_at`.
    pub until: Option<DateTime<Utc>>,
}

/// One page of a list query, 1-based.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Saturates instead of overflowing, so an absurd page number means an
    /// empty page rather than a panic.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// List result carrying the unpaged total for pagination math.
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<StoredEvent>,
    pub total: u64,
}

/// Per-event-type slice of the statistics response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventTypeCount {
    #[serde(rename = "eventID")]
    pub event_id: String,
    pub total: i64,
}

/// Per-day slice of the statistics response. Days are São Paulo local days
/// rendered `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DayCount {
    pub dia: String,
    pub total: i64,
}

/// Aggregates for the statistics endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStats {
    pub total: i64,
    pub por_evento: Vec<EventTypeCount>,
    pub por_dia: Vec<DayCount>,
}

/// Query surface offered by backends that can read back what they stored.
#[async_trait]
pub trait EventStore: StorageAdapter {
    /// Stored events matching the filter, newest first.
    async fn list(&self, filter: &EventFilter, page: PageRequest) -> StorageResult<Page>;

    /// One stored event by ingest id.
    async fn fetch(&self, id: Uuid) -> StorageResult<Option<StoredEvent>>;

    /// Remove one event. Returns whether it existed.
    async fn delete(&self, id: Uuid) -> StorageResult<bool>;

    /// Remove everything matching the filter. Returns the removed count.
    async fn delete_matching(&self, filter: &EventFilter) -> StorageResult<u64>;

    /// Aggregates over the filtered events.
    async fn stats(&self, filter: &EventFilter) -> StorageResult<EventStats>;

    /// Contact aggregate by formatted number.
    async fn contact(&self, number: &str) -> StorageResult<Option<Contact>>;
}

/// Adapters selected by configuration.
pub struct StorageHandles {
    /// System of record; exactly one write attempt per accepted event.
    pub primary: Arc<dyn StorageAdapter>,
    /// Query surface, present when the primary can read back.
    pub store: Option<Arc<dyn EventStore>>,
    /// Best-effort copies, written after the primary succeeds.
    pub mirrors: Vec<Arc<dyn StorageAdapter>>,
}

/// Build the adapter set for the configured backend, connecting and
/// preparing schemas where needed. Failures here are fatal at startup.
pub async fn build(config: &GatewayConfig) -> StorageResult<StorageHandles> {
    let (primary, store): (Arc<dyn StorageAdapter>, Option<Arc<dyn EventStore>>) =
        match config.storage.backend {
            StorageBackend::Memory => {
                let store = Arc::new(MemoryStore::new());
                (store.clone(), Some(store))
            }
            StorageBackend::Postgres => {
                let store = Arc::new(PostgresStore::connect(&config.storage.postgres).await?);
                (store.clone(), Some(store))
            }
            StorageBackend::Supabase => {
                let adapter = Arc::new(SupabaseAdapter::new(&config.storage.supabase)?);
                (adapter, None)
            }
        };

    let mut mirrors: Vec<Arc<dyn StorageAdapter>> = Vec::new();
    if config.sheets.enabled {
        let sheets = SheetsAdapter::new(&config.sheets)?;
        if config.sheets.write_header {
            // Missing header is cosmetic; the mirror still works without it.
            if let Err(error) = sheets.ensure_header().await {
                tracing::warn!(error = %error, "Could not verify spreadsheet header row");
            }
        }
        mirrors.push(Arc::new(sheets));
    }

    Ok(StorageHandles {
        primary,
        store,
        mirrors,
    })
}
