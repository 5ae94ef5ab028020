use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ticket::Office;

/// Typed change events fanned out to office rooms after each committed write.
///
/// The `type` discriminator is the wire contract with dashboards and monitor
/// displays; every variant carries enough identifiers for subscribers to
/// apply a narrow incremental update without refetching full state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QueueEvent {
    QueueAdded {
        office: Office,
        ticket_id: Uuid,
        number: u32,
        is_priority: bool,
    },
    NextCalled {
        office: Office,
        window_id: Uuid,
        ticket_id: Uuid,
        number: u32,
    },
    PreviousRecalled {
        office: Office,
        window_id: Uuid,
        ticket_id: Uuid,
        number: u32,
    },
    QueueSkipped {
        office: Office,
        window_id: Uuid,
        ticket_id: Uuid,
        number: u32,
    },
    QueueTransferred {
        office: Office,
        from_window_id: Uuid,
        to_window_id: Uuid,
        ticket_id: Uuid,
        number: u32,
    },
    QueueCompleted {
        office: Office,
        window_id: Uuid,
        ticket_id: Uuid,
        number: u32,
    },
    QueueCancelled {
        office: Office,
        ticket_id: Uuid,
        number: u32,
    },
    QueueRequeuedAll {
        office: Office,
        requeued: usize,
    },
}

impl QueueEvent {
    pub fn office(&self) -> Office {
        match self {
            QueueEvent::QueueAdded { office, .. }
            | QueueEvent::NextCalled { office, .. }
            | QueueEvent::PreviousRecalled { office, .. }
            | QueueEvent::QueueSkipped { office, .. }
            | QueueEvent::QueueTransferred { office, .. }
            | QueueEvent::QueueCompleted { office, .. }
            | QueueEvent::QueueCancelled { office, .. }
            | QueueEvent::QueueRequeuedAll { office, .. } => *office,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            QueueEvent::QueueAdded { .. } => "queue-added",
            QueueEvent::NextCalled { .. } => "next-called",
            QueueEvent::PreviousRecalled { .. } => "previous-recalled",
            QueueEvent::QueueSkipped { .. } => "queue-skipped",
            QueueEvent::QueueTransferred { .. } => "queue-transferred",
            QueueEvent::QueueCompleted { .. } => "queue-completed",
            QueueEvent::QueueCancelled { .. } => "queue-cancelled",
            QueueEvent::QueueRequeuedAll { .. } => "queue-requeued-all",
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::QueueEvent;
    use crate::models::ticket::Office;

    #[test]
    fn events_serialize_with_kebab_case_type_tag() {
        let event = QueueEvent::NextCalled {
            office: Office::Registrar,
            window_id: Uuid::new_v4(),
            ticket_id: Uuid::new_v4(),
            number: 7,
        };

        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "next-called");
        assert_eq!(json["office"], "registrar");
        assert_eq!(json["number"], 7);
    }

    #[test]
    fn type_tag_matches_kind() {
        let event = QueueEvent::QueueRequeuedAll {
            office: Office::Mis,
            requeued: 3,
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.kind());
    }
}
