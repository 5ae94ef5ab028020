use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ticket::Office;

/// Static catalog entry. The engine only reads services; the catalog is
/// maintained through the admin surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub office: Office,
    pub name: String,
    pub is_active: bool,
}
