use serde::Serialize;
use uuid::Uuid;

use crate::models::ticket::{Office, Ticket, TicketStatus};
use crate::models::window::Window;
use crate::state::AppState;

/// Derived per-window view consumed by monitor displays and dashboards.
/// Read-only to the outside; only dispatcher transitions trigger recomputes.
#[derive(Debug, Clone, Serialize)]
pub struct WindowBoard {
    pub window_id: Uuid,
    pub window_name: String,
    pub office: Office,
    pub is_open: bool,
    pub is_serving: bool,
    /// Number of the ticket currently being served at this window, if any.
    pub currently_serving: Option<u32>,
    /// Waiting ticket numbers eligible for this window, priority partition
    /// first, FIFO within each partition.
    pub incoming_queue: Vec<u32>,
}

/// Orders candidate tickets the way the dispatcher selects them: priority is
/// a partition, queued-at is the tiebreaker inside each partition.
pub fn queue_order(a: &Ticket, b: &Ticket) -> std::cmp::Ordering {
    b.is_priority
        .cmp(&a.is_priority)
        .then(a.queued_at.cmp(&b.queued_at))
}

fn board_for(window: &Window, tickets: &[Ticket]) -> WindowBoard {
    let currently_serving = tickets
        .iter()
        .find(|t| {
            t.is_currently_serving
                && t.status == TicketStatus::Serving
                && t.window_id == Some(window.id)
        })
        .map(|t| t.number);

    let mut incoming: Vec<&Ticket> = tickets
        .iter()
        .filter(|t| t.status == TicketStatus::Waiting && window.can_serve(t.service_id))
        .collect();
    incoming.sort_by(|a, b| queue_order(a, b));

    WindowBoard {
        window_id: window.id,
        window_name: window.name.clone(),
        office: window.office,
        is_open: window.is_open,
        is_serving: window.is_serving,
        currently_serving,
        incoming_queue: incoming.iter().map(|t| t.number).collect(),
    }
}

/// Recomputes every board for the office from current ticket state and swaps
/// the snapshots in. Runs synchronously under the office lock after each
/// committed transition, so a fetch immediately after a publish is current.
pub fn refresh_office(state: &AppState, office: Office) {
    let tickets: Vec<Ticket> = state
        .tickets
        .iter()
        .filter(|entry| entry.value().office == office)
        .map(|entry| entry.value().clone())
        .collect();

    let mut waiting = 0;
    for t in &tickets {
        if t.status == TicketStatus::Waiting {
            waiting += 1;
        }
    }
    state
        .metrics
        .tickets_waiting
        .with_label_values(&[office.as_str()])
        .set(waiting);

    for entry in state.windows.iter() {
        let window = entry.value();
        if window.office != office {
            continue;
        }
        state
            .boards
            .insert(window.id, board_for(window, &tickets));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::board_for;
    use crate::models::ticket::{Office, Ticket, TicketStatus};
    use crate::models::window::Window;

    fn ticket(number: u32, service_id: Uuid, is_priority: bool, offset_secs: i64) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            number,
            office: Office::Registrar,
            service_id,
            window_id: None,
            is_priority,
            status: TicketStatus::Waiting,
            is_currently_serving: false,
            day: Utc::now().date_naive(),
            queued_at: Utc::now() + Duration::seconds(offset_secs),
            called_at: None,
            served_at: None,
            completed_at: None,
            skipped_at: None,
            remarks: None,
            rating: None,
            processed_by: None,
        }
    }

    fn window(service_ids: &[Uuid]) -> Window {
        Window {
            id: Uuid::new_v4(),
            office: Office::Registrar,
            name: "W1".to_string(),
            service_ids: service_ids.iter().copied().collect::<HashSet<_>>(),
            is_open: true,
            is_serving: true,
        }
    }

    #[test]
    fn incoming_queue_is_priority_partitioned_then_fifo() {
        let svc = Uuid::new_v4();
        let w = window(&[svc]);
        let tickets = vec![
            ticket(1, svc, false, 0),
            ticket(2, svc, true, 1),
            ticket(3, svc, false, 2),
            ticket(4, svc, true, 3),
        ];

        let board = board_for(&w, &tickets);
        assert_eq!(board.incoming_queue, vec![2, 4, 1, 3]);
    }

    #[test]
    fn tickets_for_other_services_are_excluded() {
        let svc = Uuid::new_v4();
        let other = Uuid::new_v4();
        let w = window(&[svc]);
        let tickets = vec![ticket(1, svc, false, 0), ticket(2, other, false, 1)];

        let board = board_for(&w, &tickets);
        assert_eq!(board.incoming_queue, vec![1]);
    }

    #[test]
    fn currently_serving_reflects_ticket_state() {
        let svc = Uuid::new_v4();
        let w = window(&[svc]);
        let mut serving = ticket(9, svc, false, 0);
        serving.status = TicketStatus::Serving;
        serving.is_currently_serving = true;
        serving.window_id = Some(w.id);

        let board = board_for(&w, &[serving]);
        assert_eq!(board.currently_serving, Some(9));
        assert!(board.incoming_queue.is_empty());
    }

    #[test]
    fn serving_at_another_window_does_not_show_here() {
        let svc = Uuid::new_v4();
        let w = window(&[svc]);
        let mut serving = ticket(9, svc, false, 0);
        serving.status = TicketStatus::Serving;
        serving.is_currently_serving = true;
        serving.window_id = Some(Uuid::new_v4());

        let board = board_for(&w, &[serving]);
        assert_eq!(board.currently_serving, None);
    }
}
