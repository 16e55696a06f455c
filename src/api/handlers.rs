//! Query API handlers.
//!
//! # Responsibilities
//! - List, fetch and delete stored events
//! - Aggregate statistics by event type and local day
//! - Look up contact aggregates by number
//!
//! # Design Decisions
//! - Date parameters are São Paulo local days; `dataFim` is inclusive, so
//!   the filter upper bound is the start of the following day
//! - Backends that cannot read back what they wrote answer 501 instead of
//!   pretending to be empty

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::http::response::{
    ApiFailure, DataResponse, DeleteResponse, PagedResponse, Pagination,
};
use crate::http::server::AppState;
use crate::storage::{EventFilter, EventStats, EventStore, PageRequest};
use crate::webhook::normalizer::format_number;
use crate::webhook::record::{sao_paulo_offset, Contact, StoredEvent};

const DEFAULT_LIMIT: u64 = 50;
const MAX_LIMIT: u64 = 500;

/// Query-string parameters shared by the listing, stats and bulk delete
/// endpoints. Names follow the wire vocabulary.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    #[serde(rename = "eventID")]
    pub event_id: Option<String>,
    #[serde(rename = "dataInicio")]
    pub data_inicio: Option<String>,
    #[serde(rename = "dataFim")]
    pub data_fim: Option<String>,
}

/// GET /api/webhooks
pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PagedResponse<StoredEvent>>, ApiFailure> {
    let store = require_store(&state)?;
    let filter = build_filter(&params)?;
    let page = page_request(&params);

    let result = store.list(&filter, page).await?;
    let pagination = Pagination::new(page.page, page.limit, result.total);

    Ok(Json(PagedResponse::new(result.items, pagination)))
}

/// GET /api/webhooks/{id}
pub async fn fetch_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DataResponse<StoredEvent>>, ApiFailure> {
    let store = require_store(&state)?;
    let event = store.fetch(id).await?.ok_or(ApiFailure::NotFound)?;

    Ok(Json(DataResponse::new(event)))
}

/// DELETE /api/webhooks/{id}
pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiFailure> {
    let store = require_store(&state)?;
    if !store.delete(id).await? {
        return Err(ApiFailure::NotFound);
    }

    tracing::info!(id = %id, "Event deleted");
    Ok(Json(DeleteResponse::new(1)))
}

/// DELETE /api/webhooks
pub async fn delete_events(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<DeleteResponse>, ApiFailure> {
    let store = require_store(&state)?;
    let filter = build_filter(&params)?;
    let removed = store.delete_matching(&filter).await?;

    tracing::info!(removed = removed, "Bulk delete completed");
    Ok(Json(DeleteResponse::new(removed)))
}

/// GET /api/estatisticas
pub async fn stats(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<DataResponse<EventStats>>, ApiFailure> {
    let store = require_store(&state)?;
    let filter = build_filter(&params)?;
    let stats = store.stats(&filter).await?;

    Ok(Json(DataResponse::new(stats)))
}

/// GET /api/contatos/{number}
pub async fn contact(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<Json<DataResponse<Contact>>, ApiFailure> {
    let store = require_store(&state)?;
    let contact = store
        .contact(&format_number(&number))
        .await?
        .ok_or(ApiFailure::NotFound)?;

    Ok(Json(DataResponse::new(contact)))
}

fn require_store(state: &AppState) -> Result<Arc<dyn EventStore>, ApiFailure> {
    state.store.clone().ok_or(ApiFailure::Unsupported(
        "The configured storage backend does not support queries",
    ))
}

fn page_request(params: &ListParams) -> PageRequest {
    PageRequest {
        page: params.page.unwrap_or(1).max(1),
        limit: params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
    }
}

fn build_filter(params: &ListParams) -> Result<EventFilter, ApiFailure> {
    let mut filter = EventFilter::default();

    if let Some(event_id) = &params.event_id {
        if !event_id.is_empty() {
            filter.event_id = Some(event_id.clone());
        }
    }
    if let Some(raw) = &params.data_inicio {
        filter.since = Some(day_start_utc(parse_day(raw)?)?);
    }
    if let Some(raw) = &params.data_fim {
        let next = parse_day(raw)?
            .checked_add_days(Days::new(1))
            .ok_or(ApiFailure::BadRequest("dataFim out of range"))?;
        filter.until = Some(day_start_utc(next)?);
    }

    Ok(filter)
}

fn parse_day(raw: &str) -> Result<NaiveDate, ApiFailure> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiFailure::BadRequest("Dates must be formatted YYYY-MM-DD"))
}

/// First instant of a São Paulo local day, as a UTC bound.
fn day_start_utc(day: NaiveDate) -> Result<DateTime<Utc>, ApiFailure> {
    let midnight = day
        .and_hms_opt(0, 0, 0)
        .ok_or(ApiFailure::BadRequest("Date out of range"))?;

    sao_paulo_offset()
        .from_local_datetime(&midnight)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or(ApiFailure::BadRequest("Date out of range"))
}
