use std::collections::HashSet;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{patch, post};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::dispatcher;
use crate::engine::projection;
use crate::error::QueueError;
use crate::models::ticket::{Office, Ticket};
use crate::models::window::Window;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/windows", post(create_window).get(list_windows))
        .route("/windows/:id/open", patch(set_open))
        .route("/windows/:id/serving", patch(set_serving))
        .route("/windows/:id/call-next", post(call_next))
        .route("/windows/:id/recall-skipped", post(recall_skipped))
}

#[derive(Deserialize)]
pub struct CreateWindowRequest {
    pub office: Office,
    pub name: String,
    pub service_ids: HashSet<Uuid>,
}

#[derive(Deserialize)]
pub struct SetOpenRequest {
    pub is_open: bool,
}

#[derive(Deserialize)]
pub struct SetServingRequest {
    pub is_serving: bool,
}

#[derive(Deserialize)]
pub struct DispatchRequest {
    pub processed_by: Option<String>,
}

/// `ticket` is null when no eligible visitor is waiting; that is a normal
/// outcome, not an error.
#[derive(Serialize)]
pub struct DispatchResponse {
    pub ticket: Option<Ticket>,
}

async fn create_window(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateWindowRequest>,
) -> Result<Json<Window>, QueueError> {
    if payload.name.trim().is_empty() {
        return Err(QueueError::BadRequest("name cannot be empty".to_string()));
    }
    for service_id in &payload.service_ids {
        let service = state
            .services
            .get(service_id)
            .ok_or_else(|| QueueError::NotFound(format!("service {service_id} not found")))?;
        if service.office != payload.office {
            return Err(QueueError::BadRequest(format!(
                "service {} belongs to {}",
                service.name, service.office
            )));
        }
    }

    let window = Window {
        id: Uuid::new_v4(),
        office: payload.office,
        name: payload.name,
        service_ids: payload.service_ids,
        is_open: true,
        is_serving: true,
    };
    state.windows.insert(window.id, window.clone());
    projection::refresh_office(&state, window.office);
    Ok(Json(window))
}

async fn list_windows(State(state): State<Arc<AppState>>) -> Json<Vec<Window>> {
    let windows = state
        .windows
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(windows)
}

async fn set_open(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetOpenRequest>,
) -> Result<Json<Window>, QueueError> {
    let window = {
        let mut window = state
            .windows
            .get_mut(&id)
            .ok_or_else(|| QueueError::NotFound(format!("window {id} not found")))?;
        window.is_open = payload.is_open;
        window.clone()
    };
    projection::refresh_office(&state, window.office);
    Ok(Json(window))
}

async fn set_serving(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetServingRequest>,
) -> Result<Json<Window>, QueueError> {
    let window = {
        let mut window = state
            .windows
            .get_mut(&id)
            .ok_or_else(|| QueueError::NotFound(format!("window {id} not found")))?;
        window.is_serving = payload.is_serving;
        window.clone()
    };
    projection::refresh_office(&state, window.office);
    Ok(Json(window))
}

async fn call_next(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DispatchRequest>,
) -> Result<Json<DispatchResponse>, QueueError> {
    let ticket = dispatcher::call_next(&state, id, payload.processed_by).await?;
    Ok(Json(DispatchResponse { ticket }))
}

async fn recall_skipped(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DispatchRequest>,
) -> Result<Json<DispatchResponse>, QueueError> {
    let ticket = dispatcher::recall_skipped(&state, id, payload.processed_by).await?;
    Ok(Json(DispatchResponse { ticket }))
}
