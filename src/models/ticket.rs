use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Queue partition. Every ticket, window and service belongs to exactly one
/// office; dispatch for different offices never contends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Office {
    Registrar,
    Admissions,
    Mis,
}

impl Office {
    pub const ALL: [Office; 3] = [Office::Registrar, Office::Admissions, Office::Mis];

    pub fn as_str(&self) -> &'static str {
        match self {
            Office::Registrar => "registrar",
            Office::Admissions => "admissions",
            Office::Mis => "mis",
        }
    }

    /// Index into per-office fixed-size state (lock table, gauges).
    pub fn index(&self) -> usize {
        match self {
            Office::Registrar => 0,
            Office::Admissions => 1,
            Office::Mis => 2,
        }
    }
}

impl std::str::FromStr for Office {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registrar" => Ok(Office::Registrar),
            "admissions" => Ok(Office::Admissions),
            "mis" => Ok(Office::Mis),
            other => Err(format!("unknown office: {other}")),
        }
    }
}

impl std::fmt::Display for Office {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Waiting,
    Serving,
    Completed,
    Skipped,
    Cancelled,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Waiting => "waiting",
            TicketStatus::Serving => "serving",
            TicketStatus::Completed => "completed",
            TicketStatus::Skipped => "skipped",
            TicketStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One visitor's queue entry. Created by kiosk issuance, mutated only through
/// dispatcher transitions, never deleted: terminal states preserve history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    /// Sequential number, unique within (office, day). Never reused that day,
    /// even if the ticket is cancelled.
    pub number: u32,
    pub office: Office,
    pub service_id: Uuid,
    /// Set when a window takes ownership; retained through completed/skipped
    /// for history, cleared when requeue-all returns the ticket to waiting.
    pub window_id: Option<Uuid>,
    pub is_priority: bool,
    pub status: TicketStatus,
    /// True only while exactly one window is serving this ticket.
    pub is_currently_serving: bool,
    /// Sequencer day key this number was issued under.
    pub day: NaiveDate,
    pub queued_at: DateTime<Utc>,
    pub called_at: Option<DateTime<Utc>>,
    pub served_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub skipped_at: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
    pub rating: Option<u8>,
    /// Opaque actor identity supplied by the auth collaborator.
    pub processed_by: Option<String>,
}
