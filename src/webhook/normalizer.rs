//! Payload normalization.
//!
//! # Responsibilities
//! - Project the untyped webhook JSON into a flat [`NormalizedEvent`]
//! - Apply safe defaults for missing or mistyped fields
//! - Strip platform suffixes from chat identifiers
//!
//! # Design Decisions
//! - No schema at the boundary: extraction coerces, never rejects
//! - Coercion helpers accept numbers-as-strings and stringify scalars,
//!   matching what the platform actually sends across revisions
//! - The raw payload is left untouched; audit storage is the caller's job

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::webhook::record::{format_local, NormalizedEvent};

/// Suffixes the platform appends to chat identifiers.
const NUMBER_SUFFIXES: [&str; 2] = ["@g.us", "@c.us"];

fn to_str(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(_) => String::new(),
    }
}

fn to_i64(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    }
}

/// Unix seconds (number or numeric string) into a UTC instant.
fn to_unix_instant(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let secs = to_i64(value);
    if secs <= 0 {
        return None;
    }
    Utc.timestamp_opt(secs, 0).single()
}

/// Strip the platform chat suffixes from an identifier. Contact lookups
/// use this too, so `5511999@c.us` and `5511999` address the same record.
pub fn format_number(number: &str) -> String {
    let mut out = number.to_string();
    for suffix in NUMBER_SUFFIXES {
        out = out.replace(suffix, "");
    }
    out
}

fn join_label_names(labels: Option<&Value>) -> String {
    labels
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|label| label.get("name").and_then(Value::as_str))
                .filter(|name| !name.is_empty())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

fn details_json(details: Option<&Value>) -> String {
    match details {
        Some(value) if !value.is_null() => {
            serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
        }
        _ => "{}".to_string(),
    }
}

/// Event type of a payload, coerced to a string. Empty means the payload
/// carried no usable `eventID` and should be acknowledged without storage.
pub fn event_id_of(raw: &Value) -> String {
    to_str(raw.get("eventID"))
}

/// Build the flat record for one payload. Never fails: absent or mistyped
/// fields fall back to empty strings, zero or `None`.
pub fn normalize(raw: &Value, id: Uuid, received_at: DateTime<Utc>) -> NormalizedEvent {
    let last_message = raw.get("lastMessage");
    let number = to_str(raw.get("number"));

    NormalizedEvent {
        id,
        event_id: event_id_of(raw),
        name: to_str(raw.get("name")),
        numero_formatado: format_number(&number),
        number,
        mensagem_texto: to_str(last_message.and_then(|m| m.get("text"))),
        mensagem_tipo: to_str(last_message.and_then(|m| m.get("type"))),
        mensagem_timestamp: to_unix_instant(last_message.and_then(|m| m.get("timestamp"))),
        data_hora: format_local(received_at),
        unread_messages: to_i64(raw.get("unreadMessages")),
        etiquetas: join_label_names(raw.get("labels")),
        usuario: to_str(raw.get("user")),
        evento_detalhes: details_json(raw.get("eventDetails")),
        received_at,
    }
}
