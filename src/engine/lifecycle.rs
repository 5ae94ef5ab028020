use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::QueueError;
use crate::models::ticket::{Ticket, TicketStatus};

/// A requested state-machine transition for a single ticket.
///
/// `apply` mutates the one ticket it is given; cross-ticket effects (clearing
/// whichever ticket a window was serving before) belong to the dispatcher,
/// which holds the office lock and the ticket store.
#[derive(Debug, Clone)]
pub enum Transition {
    /// waiting → serving at `window_id` (call-next).
    Call { window_id: Uuid },
    /// skipped → serving at `window_id` (recall from the skipped pool).
    Recall { window_id: Uuid },
    /// serving → completed.
    Complete,
    /// serving → skipped; the ticket joins the office's skipped pool.
    Skip,
    /// serving → serving at a different window.
    Transfer { to_window_id: Uuid },
    /// skipped → waiting (requeue-all); window ownership is released.
    Requeue,
    /// waiting|serving → cancelled (visitor left / no-show).
    Cancel,
}

impl Transition {
    pub fn action(&self) -> &'static str {
        match self {
            Transition::Call { .. } => "call",
            Transition::Recall { .. } => "recall",
            Transition::Complete => "complete",
            Transition::Skip => "skip",
            Transition::Transfer { .. } => "transfer",
            Transition::Requeue => "requeue",
            Transition::Cancel => "cancel",
        }
    }
}

/// Applies one transition, enforcing the lifecycle table. Any attempt from a
/// state the transition is not legal in is rejected with `InvalidTransition`,
/// which is what turns a stale double-click into a harmless 409 instead of a
/// corrupted ticket.
pub fn apply(
    ticket: &mut Ticket,
    transition: &Transition,
    now: DateTime<Utc>,
) -> Result<(), QueueError> {
    match (ticket.status, transition) {
        (TicketStatus::Waiting, Transition::Call { window_id }) => {
            ticket.status = TicketStatus::Serving;
            ticket.window_id = Some(*window_id);
            ticket.is_currently_serving = true;
            set_once(&mut ticket.called_at, now);
            set_once(&mut ticket.served_at, now);
            Ok(())
        }
        (TicketStatus::Skipped, Transition::Recall { window_id }) => {
            ticket.status = TicketStatus::Serving;
            ticket.window_id = Some(*window_id);
            ticket.is_currently_serving = true;
            set_once(&mut ticket.called_at, now);
            set_once(&mut ticket.served_at, now);
            Ok(())
        }
        (TicketStatus::Serving, Transition::Complete) => {
            ticket.status = TicketStatus::Completed;
            ticket.is_currently_serving = false;
            set_once(&mut ticket.completed_at, now);
            // window_id retained for history
            Ok(())
        }
        (TicketStatus::Serving, Transition::Skip) => {
            ticket.status = TicketStatus::Skipped;
            ticket.is_currently_serving = false;
            set_once(&mut ticket.skipped_at, now);
            Ok(())
        }
        (TicketStatus::Serving, Transition::Transfer { to_window_id }) => {
            ticket.window_id = Some(*to_window_id);
            ticket.is_currently_serving = true;
            Ok(())
        }
        (TicketStatus::Skipped, Transition::Requeue) => {
            ticket.status = TicketStatus::Waiting;
            ticket.window_id = None;
            ticket.is_currently_serving = false;
            Ok(())
        }
        (TicketStatus::Waiting | TicketStatus::Serving, Transition::Cancel) => {
            ticket.status = TicketStatus::Cancelled;
            ticket.window_id = None;
            ticket.is_currently_serving = false;
            Ok(())
        }
        (from, transition) => Err(QueueError::InvalidTransition {
            from,
            action: transition.action(),
        }),
    }
}

fn set_once(slot: &mut Option<DateTime<Utc>>, now: DateTime<Utc>) {
    if slot.is_none() {
        *slot = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{Transition, apply};
    use crate::error::QueueError;
    use crate::models::ticket::{Office, Ticket, TicketStatus};

    fn ticket(status: TicketStatus) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            number: 1,
            office: Office::Registrar,
            service_id: Uuid::new_v4(),
            window_id: None,
            is_priority: false,
            status,
            is_currently_serving: status == TicketStatus::Serving,
            day: Utc::now().date_naive(),
            queued_at: Utc::now(),
            called_at: None,
            served_at: None,
            completed_at: None,
            skipped_at: None,
            remarks: None,
            rating: None,
            processed_by: None,
        }
    }

    #[test]
    fn call_moves_waiting_to_serving_and_stamps_once() {
        let mut t = ticket(TicketStatus::Waiting);
        let w = Uuid::new_v4();
        apply(&mut t, &Transition::Call { window_id: w }, Utc::now()).unwrap();

        assert_eq!(t.status, TicketStatus::Serving);
        assert_eq!(t.window_id, Some(w));
        assert!(t.is_currently_serving);
        let first_called = t.called_at.unwrap();

        apply(&mut t, &Transition::Skip, Utc::now()).unwrap();
        apply(&mut t, &Transition::Recall { window_id: w }, Utc::now()).unwrap();
        assert_eq!(t.called_at.unwrap(), first_called);
    }

    #[test]
    fn complete_requires_serving() {
        let mut t = ticket(TicketStatus::Waiting);
        let err = apply(&mut t, &Transition::Complete, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            QueueError::InvalidTransition {
                from: TicketStatus::Waiting,
                action: "complete",
            }
        ));
    }

    #[test]
    fn double_complete_is_rejected() {
        let mut t = ticket(TicketStatus::Serving);
        apply(&mut t, &Transition::Complete, Utc::now()).unwrap();
        assert!(apply(&mut t, &Transition::Complete, Utc::now()).is_err());
        assert_eq!(t.status, TicketStatus::Completed);
    }

    #[test]
    fn completed_retains_window_for_history() {
        let mut t = ticket(TicketStatus::Waiting);
        let w = Uuid::new_v4();
        apply(&mut t, &Transition::Call { window_id: w }, Utc::now()).unwrap();
        apply(&mut t, &Transition::Complete, Utc::now()).unwrap();
        assert_eq!(t.window_id, Some(w));
        assert!(!t.is_currently_serving);
    }

    #[test]
    fn skip_then_recall_round_trip() {
        let mut t = ticket(TicketStatus::Serving);
        apply(&mut t, &Transition::Skip, Utc::now()).unwrap();
        assert_eq!(t.status, TicketStatus::Skipped);
        assert!(t.skipped_at.is_some());

        let w = Uuid::new_v4();
        apply(&mut t, &Transition::Recall { window_id: w }, Utc::now()).unwrap();
        assert_eq!(t.status, TicketStatus::Serving);
        assert_eq!(t.window_id, Some(w));
    }

    #[test]
    fn recall_from_waiting_is_rejected() {
        let mut t = ticket(TicketStatus::Waiting);
        let err = apply(
            &mut t,
            &Transition::Recall {
                window_id: Uuid::new_v4(),
            },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, QueueError::InvalidTransition { .. }));
    }

    #[test]
    fn transfer_moves_ownership() {
        let mut t = ticket(TicketStatus::Waiting);
        let w1 = Uuid::new_v4();
        let w2 = Uuid::new_v4();
        apply(&mut t, &Transition::Call { window_id: w1 }, Utc::now()).unwrap();
        apply(&mut t, &Transition::Transfer { to_window_id: w2 }, Utc::now()).unwrap();
        assert_eq!(t.window_id, Some(w2));
        assert_eq!(t.status, TicketStatus::Serving);
        assert!(t.is_currently_serving);
    }

    #[test]
    fn requeue_releases_the_window() {
        let mut t = ticket(TicketStatus::Serving);
        t.window_id = Some(Uuid::new_v4());
        apply(&mut t, &Transition::Skip, Utc::now()).unwrap();
        apply(&mut t, &Transition::Requeue, Utc::now()).unwrap();
        assert_eq!(t.status, TicketStatus::Waiting);
        assert_eq!(t.window_id, None);
    }

    #[test]
    fn cancel_is_terminal() {
        let mut t = ticket(TicketStatus::Waiting);
        apply(&mut t, &Transition::Cancel, Utc::now()).unwrap();
        assert_eq!(t.status, TicketStatus::Cancelled);

        let w = Uuid::new_v4();
        assert!(apply(&mut t, &Transition::Call { window_id: w }, Utc::now()).is_err());
        assert!(apply(&mut t, &Transition::Cancel, Utc::now()).is_err());
    }

    #[test]
    fn cancelling_a_serving_ticket_releases_the_window() {
        let mut t = ticket(TicketStatus::Serving);
        t.window_id = Some(Uuid::new_v4());
        apply(&mut t, &Transition::Cancel, Utc::now()).unwrap();

        assert_eq!(t.status, TicketStatus::Cancelled);
        assert_eq!(t.window_id, None);
        assert!(!t.is_currently_serving);
    }
}
