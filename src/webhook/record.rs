//! Record types produced by normalization and returned by the stores.
//!
//! Serialized field names follow the WaSpeed platform vocabulary
//! (`numeroFormatado`, `mensagemTexto`, `dataHora`, ...) so that stored
//! documents and API responses stay byte-compatible with what operators
//! already consume downstream.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Offset used for operator-facing timestamps.
///
/// Brazil abolished daylight saving in 2019, so São Paulo sits at a fixed
/// -03:00 year round.
pub fn sao_paulo_offset() -> FixedOffset {
    FixedOffset::west_opt(3 * 3600).expect("valid -03:00 offset")
}

/// Render an instant the way the platform displays it: `dd/mm/yyyy HH:MM:SS`
/// in São Paulo local time.
pub fn format_local(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&sao_paulo_offset())
        .format("%d/%m/%Y %H:%M:%S")
        .to_string()
}

/// Flat projection of one webhook payload.
///
/// Every field is always present; normalization maps missing or mistyped
/// payload fields to the documented defaults, never to key absence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    /// Identifier assigned at ingest, echoed back to the sender.
    pub id: Uuid,

    /// Event type as sent by the platform.
    #[serde(rename = "eventID")]
    pub event_id: String,

    /// Contact display name.
    pub name: String,

    /// Chat identifier exactly as received (may carry `@c.us` / `@g.us`).
    pub number: String,

    /// Chat identifier with the platform suffixes stripped.
    pub numero_formatado: String,

    /// Text of the last message, when the event carried one.
    pub mensagem_texto: String,

    /// Message kind (`chat`, `image`, ...).
    pub mensagem_tipo: String,

    /// Message timestamp converted from unix seconds.
    pub mensagem_timestamp: Option<DateTime<Utc>>,

    /// Ingest time rendered in São Paulo local time.
    pub data_hora: String,

    /// Unread counter snapshot for the chat.
    pub unread_messages: i64,

    /// Label names joined with `", "`.
    pub etiquetas: String,

    /// Attendant assigned to the chat.
    #[serde(rename = "user")]
    pub usuario: String,

    /// Compact JSON of `eventDetails` (`"{}"` when absent).
    pub evento_detalhes: String,

    /// Ingest time (UTC).
    pub received_at: DateTime<Utc>,
}

/// A normalized event as read back from a store, with its raw payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredEvent {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub event: NormalizedEvent,

    /// Verbatim payload kept as an audit trail.
    pub raw: Value,
}

/// Aggregate row keyed by the formatted chat number.
///
/// Created on first sighting and merged additively afterwards: the message
/// counter only grows, nullable fields are replaced only by non-empty
/// incoming values, and `first_seen` never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub number: String,
    pub name: Option<String>,
    pub etiquetas: Option<String>,
    pub unread_messages: i64,
    pub message_count: i64,
    pub last_message_text: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}
