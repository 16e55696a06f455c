//! Postgres-backed event store.
//!
//! # Responsibilities
//! - Create the `webhook_events` and `contacts` tables at startup
//! - Insert one event row per accepted webhook, raw payload included
//! - Maintain the contact aggregate with a single atomic upsert
//! - Serve the list/fetch/delete/stats queries
//!
//! # Design Decisions
//! - Runtime queries only, so the crate builds without a live database
//! - Event insert and contact upsert share a transaction
//! - Contact merges happen inside `ON CONFLICT`, never in application
//!   locks, so concurrent events for one number cannot lose updates

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use crate::config::PostgresConfig;
use crate::storage::{
    DayCount, EventFilter, EventStats, EventStore, EventTypeCount, Page, PageRequest,
    StorageAdapter, StorageResult,
};
use crate::webhook::record::{Contact, NormalizedEvent, StoredEvent};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS webhook_events (
    id                 UUID PRIMARY KEY,
    event_id           TEXT NOT NULL,
    name               TEXT NOT NULL DEFAULT '',
    number             TEXT NOT NULL DEFAULT '',
    numero_formatado   TEXT NOT NULL DEFAULT '',
    mensagem_texto     TEXT NOT NULL DEFAULT '',
    mensagem_tipo      TEXT NOT NULL DEFAULT '',
    mensagem_timestamp TIMESTAMPTZ,
    data_hora          TEXT NOT NULL,
    unread_messages    BIGINT NOT NULL DEFAULT 0,
    etiquetas          TEXT NOT NULL DEFAULT '',
    usuario            TEXT NOT NULL DEFAULT '',
    evento_detalhes    TEXT NOT NULL DEFAULT '{}',
    raw                JSONB NOT NULL,
    received_at        TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_webhook_events_received_at
    ON webhook_events (received_at DESC);
CREATE INDEX IF NOT EXISTS idx_webhook_events_event_id
    ON webhook_events (event_id);

CREATE TABLE IF NOT EXISTS contacts (
    number            TEXT PRIMARY KEY,
    name              TEXT,
    etiquetas         TEXT,
    unread_messages   BIGINT NOT NULL DEFAULT 0,
    message_count     BIGINT NOT NULL DEFAULT 0,
    last_message_text TEXT,
    last_message_at   TIMESTAMPTZ,
    first_seen        TIMESTAMPTZ NOT NULL,
    last_seen         TIMESTAMPTZ NOT NULL
);
"#;

const INSERT_EVENT: &str = r#"
INSERT INTO webhook_events (
    id, event_id, name, number, numero_formatado,
    mensagem_texto, mensagem_tipo, mensagem_timestamp, data_hora,
    unread_messages, etiquetas, usuario, evento_detalhes, raw, received_at
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
"#;

// Empty strings are nullified on the way in, so COALESCE keeps the stored
// value whenever the incoming event carried nothing for a field. Only the
// message counter is unconditional: it grows by one per event.
const UPSERT_CONTACT: &str = r#"
INSERT INTO contacts (
    number, name, etiquetas, unread_messages, message_count,
    last_message_text, last_message_at, first_seen, last_seen
) VALUES ($1, NULLIF($2, ''), NULLIF($3, ''), $4, 1, NULLIF($5, ''), $6, $7, $7)
ON CONFLICT (number) DO UPDATE SET
    name              = COALESCE(EXCLUDED.name, contacts.name),
    etiquetas         = COALESCE(EXCLUDED.etiquetas, contacts.etiquetas),
    unread_messages   = EXCLUDED.unread_messages,
    message_count     = contacts.message_count + 1,
    last_message_text = COALESCE(EXCLUDED.last_message_text, contacts.last_message_text),
    last_message_at   = COALESCE(EXCLUDED.last_message_at, contacts.last_message_at),
    last_seen         = EXCLUDED.last_seen
"#;

const FILTERED: &str = r#"
WHERE ($1::text IS NULL OR event_id = $1)
  AND ($2::timestamptz IS NULL OR received_at >= $2)
  AND ($3::timestamptz IS NULL OR received_at < $3)
"#;

/// Event store over a sqlx connection pool.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and prepare the schema.
    pub async fn connect(config: &PostgresConfig) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        tracing::info!(max_connections = config.max_connections, "Postgres store ready");
        Ok(store)
    }

    async fn ensure_schema(&self) -> StorageResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for PostgresStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn persist(&self, event: &NormalizedEvent, raw: &Value) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(INSERT_EVENT)
            .bind(event.id)
            .bind(&event.event_id)
            .bind(&event.name)
            .bind(&event.number)
            .bind(&event.numero_formatado)
            .bind(&event.mensagem_texto)
            .bind(&event.mensagem_tipo)
            .bind(event.mensagem_timestamp)
            .bind(&event.data_hora)
            .bind(event.unread_messages)
            .bind(&event.etiquetas)
            .bind(&event.usuario)
            .bind(&event.evento_detalhes)
            .bind(raw)
            .bind(event.received_at)
            .execute(&mut *tx)
            .await?;

        // Events without a chat identifier do not form a contact.
        if !event.numero_formatado.is_empty() {
            sqlx::query(UPSERT_CONTACT)
                .bind(&event.numero_formatado)
                .bind(&event.name)
                .bind(&event.etiquetas)
                .bind(event.unread_messages)
                .bind(&event.mensagem_texto)
                .bind(event.mensagem_timestamp)
                .bind(event.received_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for PostgresStore {
    async fn list(&self, filter: &EventFilter, page: PageRequest) -> StorageResult<Page> {
        let sql = format!(
            "SELECT * FROM webhook_events {FILTERED} \
             ORDER BY received_at DESC, id LIMIT $4 OFFSET $5"
        );
        // Saturated offsets from absurd page numbers must not wrap into
        // negative bind values.
        let items = sqlx::query_as::<_, StoredEvent>(&sql)
            .bind(&filter.event_id)
            .bind(filter.since)
            .bind(filter.until)
            .bind(i64::try_from(page.limit).unwrap_or(i64::MAX))
            .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM webhook_events {FILTERED}"))
                .bind(&filter.event_id)
                .bind(filter.since)
                .bind(filter.until)
                .fetch_one(&self.pool)
                .await?;

        Ok(Page {
            items,
            total: total.max(0) as u64,
        })
    }

    async fn fetch(&self, id: Uuid) -> StorageResult<Option<StoredEvent>> {
        let event = sqlx::query_as::<_, StoredEvent>("SELECT * FROM webhook_events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    async fn delete(&self, id: Uuid) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM webhook_events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_matching(&self, filter: &EventFilter) -> StorageResult<u64> {
        let result = sqlx::query(&format!("DELETE FROM webhook_events {FILTERED}"))
            .bind(&filter.event_id)
            .bind(filter.since)
            .bind(filter.until)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn stats(&self, filter: &EventFilter) -> StorageResult<EventStats> {
        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM webhook_events {FILTERED}"))
                .bind(&filter.event_id)
                .bind(filter.since)
                .bind(filter.until)
                .fetch_one(&self.pool)
                .await?;

        let por_evento = sqlx::query_as::<_, EventTypeCount>(&format!(
            "SELECT event_id, COUNT(*) AS total FROM webhook_events {FILTERED} \
             GROUP BY event_id ORDER BY total DESC, event_id"
        ))
        .bind(&filter.event_id)
        .bind(filter.since)
        .bind(filter.until)
        .fetch_all(&self.pool)
        .await?;

        // Bucketing shifts to São Paulo local days; the offset is a fixed
        // -03:00 since Brazil dropped daylight saving in 2019.
        let por_dia = sqlx::query_as::<_, DayCount>(&format!(
            "SELECT to_char(received_at AT TIME ZONE 'UTC' - INTERVAL '3 hours', 'YYYY-MM-DD') \
                 AS dia, COUNT(*) AS total \
             FROM webhook_events {FILTERED} GROUP BY dia ORDER BY dia DESC"
        ))
        .bind(&filter.event_id)
        .bind(filter.since)
        .bind(filter.until)
        .fetch_all(&self.pool)
        .await?;

        Ok(EventStats {
            total,
            por_evento,
            por_dia,
        })
    }

    async fn contact(&self, number: &str) -> StorageResult<Option<Contact>> {
        let contact = sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE number = $1")
            .bind(number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(contact)
    }
}
