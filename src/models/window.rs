use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ticket::Office;

/// A service counter within an office. The window's current ticket is not
/// stored here; it is derived from ticket state by the projection so the two
/// can never disagree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Window {
    pub id: Uuid,
    pub office: Office,
    pub name: String,
    /// Services this window may serve; call-next only selects tickets whose
    /// service is in this set.
    pub service_ids: HashSet<Uuid>,
    /// Whether the window accepts new calls.
    pub is_open: bool,
    /// Staff presence toggle (on-break when false).
    pub is_serving: bool,
}

impl Window {
    pub fn can_serve(&self, service_id: Uuid) -> bool {
        self.service_ids.contains(&service_id)
    }
}
