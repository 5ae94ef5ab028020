use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::models::ticket::{Office, TicketStatus};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid transition: cannot {action} a {from} ticket")]
    InvalidTransition {
        from: TicketStatus,
        action: &'static str,
    },

    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("queue capacity exceeded for {office} (max {max})")]
    CapacityExceeded { office: Office, max: u32 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for QueueError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            QueueError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            QueueError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            QueueError::InvalidTransition { .. } => (StatusCode::CONFLICT, self.to_string()),
            QueueError::ConcurrencyConflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            QueueError::CapacityExceeded { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            QueueError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
