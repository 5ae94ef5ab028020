use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::dispatcher::{self, IssueRequest};
use crate::error::QueueError;
use crate::models::ticket::{Office, Ticket};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tickets", post(issue_ticket))
        .route("/tickets/:id", get(get_ticket))
        .route("/tickets/:id/complete", post(complete_ticket))
        .route("/tickets/:id/skip", post(skip_ticket))
        .route("/tickets/:id/cancel", post(cancel_ticket))
        .route("/tickets/:id/transfer", post(transfer_ticket))
}

#[derive(Deserialize)]
pub struct IssueTicketRequest {
    pub office: Office,
    pub service_id: Uuid,
    #[serde(default)]
    pub is_priority: bool,
    pub remarks: Option<String>,
}

#[derive(Deserialize)]
pub struct CompleteTicketRequest {
    pub processed_by: Option<String>,
    pub remarks: Option<String>,
    pub rating: Option<u8>,
}

#[derive(Deserialize)]
pub struct SkipTicketRequest {
    pub processed_by: Option<String>,
}

#[derive(Deserialize)]
pub struct TransferTicketRequest {
    pub to_window_id: Uuid,
}

async fn issue_ticket(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<IssueTicketRequest>,
) -> Result<Json<Ticket>, QueueError> {
    let ticket = dispatcher::issue(
        &state,
        IssueRequest {
            office: payload.office,
            service_id: payload.service_id,
            is_priority: payload.is_priority,
            remarks: payload.remarks,
        },
    )
    .await?;
    Ok(Json(ticket))
}

async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ticket>, QueueError> {
    let ticket = state
        .tickets
        .get(&id)
        .ok_or_else(|| QueueError::NotFound(format!("ticket {id} not found")))?;
    Ok(Json(ticket.value().clone()))
}

async fn complete_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteTicketRequest>,
) -> Result<Json<Ticket>, QueueError> {
    if let Some(rating) = payload.rating {
        if !(1..=5).contains(&rating) {
            return Err(QueueError::BadRequest(
                "rating must be between 1 and 5".to_string(),
            ));
        }
    }
    let ticket = dispatcher::complete(
        &state,
        id,
        payload.processed_by,
        payload.remarks,
        payload.rating,
    )
    .await?;
    Ok(Json(ticket))
}

async fn skip_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SkipTicketRequest>,
) -> Result<Json<Ticket>, QueueError> {
    let ticket = dispatcher::skip(&state, id, payload.processed_by).await?;
    Ok(Json(ticket))
}

async fn cancel_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ticket>, QueueError> {
    let ticket = dispatcher::cancel(&state, id).await?;
    Ok(Json(ticket))
}

async fn transfer_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransferTicketRequest>,
) -> Result<Json<Ticket>, QueueError> {
    let ticket = dispatcher::transfer(&state, id, payload.to_window_id).await?;
    Ok(Json(ticket))
}
