//! Response envelopes shared by the webhook and API surfaces.
//!
//! # Responsibilities
//! - Acknowledgement body returned to webhook senders
//! - Pagination envelope for event listings
//! - Error-to-status mapping for the query API
//!
//! # Design Decisions
//! - Webhook acks stay `200` even when the event is discarded; a non-2xx
//!   would make the sender retry and amplify traffic. Only a body that is
//!   not JSON at all earns a 400.
//! - API errors are honest: storage problems surface as 500, queries
//!   against a write-only backend as 501.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::storage::StorageError;

/// Acknowledgement returned to webhook senders.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(rename = "eventID", skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

impl WebhookAck {
    /// The event was normalized and queued for persistence.
    pub fn processed(id: Uuid, event_id: String) -> Self {
        Self {
            success: true,
            message: "Webhook received",
            id: Some(id),
            event_id: Some(event_id),
        }
    }

    /// The body parsed but carried nothing worth storing.
    pub fn ignored(message: &'static str) -> Self {
        Self {
            success: true,
            message,
            id: None,
            event_id: None,
        }
    }

    /// The body was not JSON.
    pub fn invalid(message: &'static str) -> Self {
        Self {
            success: false,
            message,
            id: None,
            event_id: None,
        }
    }
}

/// Page metadata attached to event listings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

/// Envelope for paginated listings.
#[derive(Debug, Serialize)]
pub struct PagedResponse<T: Serialize> {
    pub success: bool,
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T: Serialize> PagedResponse<T> {
    pub fn new(data: Vec<T>, pagination: Pagination) -> Self {
        Self {
            success: true,
            data,
            pagination,
        }
    }
}

/// Envelope for single-object responses.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Result of a delete operation.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub removed: u64,
}

impl DeleteResponse {
    pub fn new(removed: u64) -> Self {
        Self {
            success: true,
            removed,
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiError {
    success: bool,
    error: String,
}

/// Failure modes of the query API.
#[derive(Debug)]
pub enum ApiFailure {
    BadRequest(&'static str),
    NotFound,
    Unsupported(&'static str),
    Internal(StorageError),
}

impl From<StorageError> for ApiFailure {
    fn from(err: StorageError) -> Self {
        ApiFailure::Internal(err)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiFailure::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.to_string()),
            ApiFailure::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            ApiFailure::Unsupported(msg) => (StatusCode::NOT_IMPLEMENTED, msg.to_string()),
            ApiFailure::Internal(err) => {
                tracing::error!(error = %err, "Storage error while serving API request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage error".to_string(),
                )
            }
        };

        (
            status,
            Json(ApiError {
                success: false,
                error,
            }),
        )
            .into_response()
    }
}
