use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{patch, post};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::QueueError;
use crate::models::service::Service;
use crate::models::ticket::Office;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/services", post(create_service).get(list_services))
        .route("/services/:id/active", patch(set_active))
}

#[derive(Deserialize)]
pub struct CreateServiceRequest {
    pub office: Office,
    pub name: String,
}

#[derive(Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

async fn create_service(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateServiceRequest>,
) -> Result<Json<Service>, QueueError> {
    if payload.name.trim().is_empty() {
        return Err(QueueError::BadRequest("name cannot be empty".to_string()));
    }

    let service = Service {
        id: Uuid::new_v4(),
        office: payload.office,
        name: payload.name,
        is_active: true,
    };
    state.services.insert(service.id, service.clone());
    Ok(Json(service))
}

async fn list_services(State(state): State<Arc<AppState>>) -> Json<Vec<Service>> {
    let services = state
        .services
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(services)
}

async fn set_active(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetActiveRequest>,
) -> Result<Json<Service>, QueueError> {
    let mut service = state
        .services
        .get_mut(&id)
        .ok_or_else(|| QueueError::NotFound(format!("service {id} not found")))?;
    service.is_active = payload.is_active;
    Ok(Json(service.clone()))
}
