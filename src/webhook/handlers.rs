//! Webhook ingest handlers.
//!
//! # Responsibilities
//! - Parse the raw body without trusting its shape
//! - Normalize into a flat record and acknowledge immediately
//! - Hand the record to the forwarder; persistence happens after the
//!   response is sent
//!
//! # Design Decisions
//! - The ack never waits for storage. A sender that sees a 200 has no
//!   durability guarantee; that trade is deliberate to keep retry storms
//!   away from the write path.
//! - Events without an `eventID` are acknowledged and dropped rather than
//!   rejected, so misconfigured senders do not loop on retries.

use axum::body::Bytes;
use axum::extract::{MatchedPath, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::http::request::request_id;
use crate::http::response::WebhookAck;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::webhook::normalizer;

/// Ingest handler for the flat webhook paths.
pub async fn receive(
    State(state): State<AppState>,
    matched: MatchedPath,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    ingest(state, matched, headers, None, body).await
}

/// Ingest handler for `/webhook/{instance}/{channel}`.
///
/// The path segments identify the sending instance; they are logged for
/// correlation but the payload itself is what gets stored.
pub async fn receive_scoped(
    State(state): State<AppState>,
    matched: MatchedPath,
    Path((instance, channel)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    tracing::debug!(
        instance = %instance,
        channel = %channel,
        "Scoped webhook delivery"
    );
    ingest(state, matched, headers, Some(instance), body).await
}

async fn ingest(
    state: AppState,
    matched: MatchedPath,
    headers: HeaderMap,
    instance: Option<String>,
    body: Bytes,
) -> Response {
    let request_id = request_id(&headers);
    metrics::record_webhook_received(matched.as_str());

    let raw: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(
                request_id = %request_id,
                error = %error,
                "Discarding unparseable webhook body"
            );
            metrics::record_event_ignored("invalid-json");
            return (
                StatusCode::BAD_REQUEST,
                Json(WebhookAck::invalid("Body is not valid JSON")),
            )
                .into_response();
        }
    };

    let event = normalizer::normalize(&raw, Uuid::new_v4(), Utc::now());

    if event.event_id.is_empty() {
        tracing::info!(
            request_id = %request_id,
            "Event without eventID skipped"
        );
        metrics::record_event_ignored("missing-event-id");
        return Json(WebhookAck::ignored("Event without eventID skipped")).into_response();
    }

    tracing::info!(
        request_id = %request_id,
        id = %event.id,
        event_id = %event.event_id,
        number = %event.numero_formatado,
        instance = instance.as_deref().unwrap_or("-"),
        "Webhook accepted"
    );

    let ack = WebhookAck::processed(event.id, event.event_id.clone());
    state.forwarder.forward_detached(event, raw);

    Json(ack).into_response()
}
