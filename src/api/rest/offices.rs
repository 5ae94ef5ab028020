use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};

use crate::engine::dispatcher;
use crate::engine::projection::WindowBoard;
use crate::error::QueueError;
use crate::models::ticket::{Office, Ticket, TicketStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/offices/:office/board", get(office_board))
        .route("/offices/:office/tickets", get(office_tickets))
        .route("/offices/:office/requeue-all", post(requeue_all))
}

fn parse_office(raw: &str) -> Result<Office, QueueError> {
    raw.parse::<Office>().map_err(QueueError::BadRequest)
}

/// Monitor view: every window of the office with its current number and
/// incoming queue.
async fn office_board(
    State(state): State<Arc<AppState>>,
    Path(office): Path<String>,
) -> Result<Json<Vec<WindowBoard>>, QueueError> {
    let office = parse_office(&office)?;
    let mut boards: Vec<WindowBoard> = state
        .boards
        .iter()
        .filter(|entry| entry.value().office == office)
        .map(|entry| entry.value().clone())
        .collect();
    boards.sort_by(|a, b| a.window_name.cmp(&b.window_name));
    Ok(Json(boards))
}

#[derive(Deserialize)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
}

async fn office_tickets(
    State(state): State<Arc<AppState>>,
    Path(office): Path<String>,
    Query(filter): Query<TicketFilter>,
) -> Result<Json<Vec<Ticket>>, QueueError> {
    let office = parse_office(&office)?;
    let mut tickets: Vec<Ticket> = state
        .tickets
        .iter()
        .filter(|entry| {
            let t = entry.value();
            t.office == office && filter.status.is_none_or(|s| t.status == s)
        })
        .map(|entry| entry.value().clone())
        .collect();
    tickets.sort_by_key(|t| t.queued_at);
    Ok(Json(tickets))
}

#[derive(Serialize)]
pub struct RequeueAllResponse {
    pub requeued: usize,
}

async fn requeue_all(
    State(state): State<Arc<AppState>>,
    Path(office): Path<String>,
) -> Result<Json<RequeueAllResponse>, QueueError> {
    let office = parse_office(&office)?;
    let requeued = dispatcher::requeue_all(&state, office).await?;
    Ok(Json(RequeueAllResponse { requeued }))
}
