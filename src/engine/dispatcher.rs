use std::time::Instant;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::engine::lifecycle::{self, Transition};
use crate::engine::projection::{self, queue_order};
use crate::error::QueueError;
use crate::models::ticket::{Office, Ticket, TicketStatus};
use crate::models::window::Window;
use crate::realtime::events::QueueEvent;
use crate::state::AppState;

/// All ticket mutations live here. Every operation takes the office lock, so
/// writes within one office are serialized while offices never block each
/// other; projections are recomputed under the lock and the typed event is
/// published only after the write has committed.

pub struct IssueRequest {
    pub office: Office,
    pub service_id: Uuid,
    pub is_priority: bool,
    pub remarks: Option<String>,
}

pub async fn issue(state: &AppState, req: IssueRequest) -> Result<Ticket, QueueError> {
    let start = Instant::now();

    let service = state
        .services
        .get(&req.service_id)
        .ok_or_else(|| QueueError::NotFound(format!("service {} not found", req.service_id)))?
        .clone();
    if !service.is_active {
        return Err(QueueError::BadRequest(format!(
            "service {} is not active",
            service.name
        )));
    }
    if service.office != req.office {
        return Err(QueueError::BadRequest(format!(
            "service {} belongs to {}, not {}",
            service.name, service.office, req.office
        )));
    }

    let ticket = {
        let _guard = state.office_lock(req.office).lock().await;

        let today = state.clock.today();
        state.sequencer.prune_before(today);
        let number = state.sequencer.next(req.office, today)?;
        let ticket = Ticket {
            id: Uuid::new_v4(),
            number,
            office: req.office,
            service_id: req.service_id,
            window_id: None,
            is_priority: req.is_priority,
            status: TicketStatus::Waiting,
            is_currently_serving: false,
            day: state.sequencer.day_key(today),
            queued_at: Utc::now(),
            called_at: None,
            served_at: None,
            completed_at: None,
            skipped_at: None,
            remarks: req.remarks,
            rating: None,
            processed_by: None,
        };
        state.tickets.insert(ticket.id, ticket.clone());
        projection::refresh_office(state, req.office);
        ticket
    };

    state
        .metrics
        .tickets_issued_total
        .with_label_values(&[req.office.as_str()])
        .inc();
    observe(state, "issue", "success", start);

    state.rooms.publish_office(&QueueEvent::QueueAdded {
        office: ticket.office,
        ticket_id: ticket.id,
        number: ticket.number,
        is_priority: ticket.is_priority,
    });

    info!(
        ticket_id = %ticket.id,
        office = %ticket.office,
        number = ticket.number,
        priority = ticket.is_priority,
        "ticket issued"
    );

    Ok(ticket)
}

/// Calls the next eligible ticket to the window: waiting tickets of the
/// window's office whose service the window covers, priority partition
/// first, FIFO inside each partition. An empty pool is a valid outcome, not
/// an error. Losing the claim race to a concurrent caller re-runs selection
/// once before surfacing the conflict.
pub async fn call_next(
    state: &AppState,
    window_id: Uuid,
    processed_by: Option<String>,
) -> Result<Option<Ticket>, QueueError> {
    let ticket = take_from_pool(state, window_id, TicketStatus::Waiting, processed_by).await?;

    if let Some(ticket) = &ticket {
        state.rooms.publish_office(&QueueEvent::NextCalled {
            office: ticket.office,
            window_id,
            ticket_id: ticket.id,
            number: ticket.number,
        });
        info!(
            ticket_id = %ticket.id,
            %window_id,
            number = ticket.number,
            "next ticket called"
        );
    }

    Ok(ticket)
}

/// Same selection policy as `call_next`, restricted to the office's skipped
/// pool.
pub async fn recall_skipped(
    state: &AppState,
    window_id: Uuid,
    processed_by: Option<String>,
) -> Result<Option<Ticket>, QueueError> {
    let ticket = take_from_pool(state, window_id, TicketStatus::Skipped, processed_by).await?;

    if let Some(ticket) = &ticket {
        state.rooms.publish_office(&QueueEvent::PreviousRecalled {
            office: ticket.office,
            window_id,
            ticket_id: ticket.id,
            number: ticket.number,
        });
        info!(
            ticket_id = %ticket.id,
            %window_id,
            number = ticket.number,
            "skipped ticket recalled"
        );
    }

    Ok(ticket)
}

async fn take_from_pool(
    state: &AppState,
    window_id: Uuid,
    pool: TicketStatus,
    processed_by: Option<String>,
) -> Result<Option<Ticket>, QueueError> {
    let start = Instant::now();
    let operation = match pool {
        TicketStatus::Skipped => "recall",
        _ => "call_next",
    };

    let office = get_window(state, window_id)?.office;
    let _guard = state.office_lock(office).lock().await;

    // Re-read under the lock: an admin may have closed the window between
    // the lookup and lock acquisition.
    let window = get_window(state, window_id)?;
    if !window.is_open {
        return Err(QueueError::BadRequest(format!(
            "window {} is closed",
            window.name
        )));
    }

    // One retry: if the claim fails because the pool changed under us, the
    // selection is re-run against the now-current pool.
    for attempt in 0..2 {
        let Some(candidate) = select_candidate(state, &window, pool) else {
            observe(state, operation, "empty", start);
            return Ok(None);
        };

        let transition = match pool {
            TicketStatus::Skipped => Transition::Recall { window_id },
            _ => Transition::Call { window_id },
        };

        match claim(state, candidate, pool, &transition, processed_by.clone()) {
            Ok(ticket) => {
                release_other_serving(state, window_id, ticket.id);
                projection::refresh_office(state, window.office);
                observe(state, operation, "success", start);
                return Ok(Some(ticket));
            }
            Err(QueueError::ConcurrencyConflict(_)) if attempt == 0 => continue,
            Err(err) => {
                observe(state, operation, "error", start);
                return Err(err);
            }
        }
    }

    observe(state, operation, "error", start);
    Err(QueueError::ConcurrencyConflict(format!(
        "window {window_id} lost the claim race twice"
    )))
}

pub async fn complete(
    state: &AppState,
    ticket_id: Uuid,
    processed_by: Option<String>,
    remarks: Option<String>,
    rating: Option<u8>,
) -> Result<Ticket, QueueError> {
    let start = Instant::now();
    let office = ticket_office(state, ticket_id)?;
    let _guard = state.office_lock(office).lock().await;

    let ticket = {
        let mut entry = state
            .tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| QueueError::NotFound(format!("ticket {ticket_id} not found")))?;
        lifecycle::apply(&mut entry, &Transition::Complete, Utc::now())?;
        if processed_by.is_some() {
            entry.processed_by = processed_by;
        }
        if remarks.is_some() {
            entry.remarks = remarks;
        }
        if rating.is_some() {
            entry.rating = rating;
        }
        entry.clone()
    };
    projection::refresh_office(state, office);
    drop(_guard);

    observe(state, "complete", "success", start);
    if let Some(window_id) = ticket.window_id {
        state.rooms.publish_office(&QueueEvent::QueueCompleted {
            office,
            window_id,
            ticket_id: ticket.id,
            number: ticket.number,
        });
    }
    info!(ticket_id = %ticket.id, number = ticket.number, "ticket completed");
    Ok(ticket)
}

pub async fn skip(
    state: &AppState,
    ticket_id: Uuid,
    processed_by: Option<String>,
) -> Result<Ticket, QueueError> {
    let start = Instant::now();
    let office = ticket_office(state, ticket_id)?;
    let _guard = state.office_lock(office).lock().await;

    let ticket = {
        let mut entry = state
            .tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| QueueError::NotFound(format!("ticket {ticket_id} not found")))?;
        lifecycle::apply(&mut entry, &Transition::Skip, Utc::now())?;
        if processed_by.is_some() {
            entry.processed_by = processed_by;
        }
        entry.clone()
    };
    projection::refresh_office(state, office);
    drop(_guard);

    observe(state, "skip", "success", start);
    if let Some(window_id) = ticket.window_id {
        state.rooms.publish_office(&QueueEvent::QueueSkipped {
            office,
            window_id,
            ticket_id: ticket.id,
            number: ticket.number,
        });
    }
    info!(ticket_id = %ticket.id, number = ticket.number, "ticket skipped");
    Ok(ticket)
}

/// Moves a serving ticket to another window of the same office. The target
/// must cover the ticket's service.
pub async fn transfer(
    state: &AppState,
    ticket_id: Uuid,
    to_window_id: Uuid,
) -> Result<Ticket, QueueError> {
    let start = Instant::now();
    let office = ticket_office(state, ticket_id)?;
    let target = get_window(state, to_window_id)?;

    if target.office != office {
        return Err(QueueError::BadRequest(format!(
            "window {} belongs to {}, ticket belongs to {}",
            target.name, target.office, office
        )));
    }

    let _guard = state.office_lock(office).lock().await;

    let (ticket, from_window_id) = {
        let mut entry = state
            .tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| QueueError::NotFound(format!("ticket {ticket_id} not found")))?;
        if !target.can_serve(entry.service_id) {
            return Err(QueueError::BadRequest(format!(
                "window {} does not serve this ticket's service",
                target.name
            )));
        }
        let from = entry.window_id;
        lifecycle::apply(&mut entry, &Transition::Transfer { to_window_id }, Utc::now())?;
        (entry.clone(), from)
    };
    release_other_serving(state, to_window_id, ticket.id);
    projection::refresh_office(state, office);
    drop(_guard);

    observe(state, "transfer", "success", start);
    state.rooms.publish_office(&QueueEvent::QueueTransferred {
        office,
        from_window_id: from_window_id.unwrap_or(to_window_id),
        to_window_id,
        ticket_id: ticket.id,
        number: ticket.number,
    });
    info!(
        ticket_id = %ticket.id,
        ?from_window_id,
        %to_window_id,
        "ticket transferred"
    );
    Ok(ticket)
}

/// Returns every skipped ticket of the office to the waiting pool, original
/// queued-at order intact. End-of-day recovery; other offices are untouched.
pub async fn requeue_all(state: &AppState, office: Office) -> Result<usize, QueueError> {
    let start = Instant::now();
    let _guard = state.office_lock(office).lock().await;

    let mut skipped: Vec<(Uuid, chrono::DateTime<Utc>)> = state
        .tickets
        .iter()
        .filter(|e| e.value().office == office && e.value().status == TicketStatus::Skipped)
        .map(|e| (*e.key(), e.value().queued_at))
        .collect();
    // Requeue in queued-at order so relative ordering survives the round
    // trip through the skipped pool.
    skipped.sort_by_key(|(_, queued_at)| *queued_at);

    let now = Utc::now();
    let mut requeued = 0;
    for (id, _) in skipped {
        if let Some(mut entry) = state.tickets.get_mut(&id) {
            lifecycle::apply(&mut entry, &Transition::Requeue, now)?;
            requeued += 1;
        }
    }
    projection::refresh_office(state, office);
    drop(_guard);

    observe(state, "requeue_all", "success", start);
    state.rooms.publish_office(&QueueEvent::QueueRequeuedAll { office, requeued });
    info!(%office, requeued, "skipped tickets requeued");
    Ok(requeued)
}

pub async fn cancel(state: &AppState, ticket_id: Uuid) -> Result<Ticket, QueueError> {
    let start = Instant::now();
    let office = ticket_office(state, ticket_id)?;
    let _guard = state.office_lock(office).lock().await;

    let ticket = {
        let mut entry = state
            .tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| QueueError::NotFound(format!("ticket {ticket_id} not found")))?;
        lifecycle::apply(&mut entry, &Transition::Cancel, Utc::now())?;
        entry.clone()
    };
    projection::refresh_office(state, office);
    drop(_guard);

    observe(state, "cancel", "success", start);
    state.rooms.publish_office(&QueueEvent::QueueCancelled {
        office,
        ticket_id: ticket.id,
        number: ticket.number,
    });
    info!(ticket_id = %ticket.id, number = ticket.number, "ticket cancelled");
    Ok(ticket)
}

fn get_window(state: &AppState, window_id: Uuid) -> Result<Window, QueueError> {
    state
        .windows
        .get(&window_id)
        .map(|w| w.clone())
        .ok_or_else(|| QueueError::NotFound(format!("window {window_id} not found")))
}

fn ticket_office(state: &AppState, ticket_id: Uuid) -> Result<Office, QueueError> {
    state
        .tickets
        .get(&ticket_id)
        .map(|t| t.office)
        .ok_or_else(|| QueueError::NotFound(format!("ticket {ticket_id} not found")))
}

/// Picks the window's next ticket out of the given pool. Two-level ordering:
/// priority is a partition, queued-at breaks ties within it.
fn select_candidate(state: &AppState, window: &Window, pool: TicketStatus) -> Option<Uuid> {
    state
        .tickets
        .iter()
        .filter(|e| {
            let t = e.value();
            t.office == window.office && t.status == pool && window.can_serve(t.service_id)
        })
        .min_by(|a, b| queue_order(a.value(), b.value()))
        .map(|e| *e.key())
}

/// Claims the ticket for the transition, guarding on the status the selection
/// saw. A mismatch means another writer got there first.
fn claim(
    state: &AppState,
    ticket_id: Uuid,
    expected: TicketStatus,
    transition: &Transition,
    processed_by: Option<String>,
) -> Result<Ticket, QueueError> {
    let mut entry = state
        .tickets
        .get_mut(&ticket_id)
        .ok_or_else(|| QueueError::NotFound(format!("ticket {ticket_id} not found")))?;

    if entry.status != expected {
        return Err(QueueError::ConcurrencyConflict(format!(
            "ticket {ticket_id} is {} (expected {expected})",
            entry.status
        )));
    }

    lifecycle::apply(&mut entry, transition, Utc::now())?;
    if processed_by.is_some() {
        entry.processed_by = processed_by;
    }
    Ok(entry.clone())
}

/// Enforces at-most-one serving ticket per window: any other ticket still
/// flagged as serving at this window loses the flag.
fn release_other_serving(state: &AppState, window_id: Uuid, keep_ticket_id: Uuid) {
    for mut entry in state.tickets.iter_mut() {
        let t = entry.value_mut();
        if t.id != keep_ticket_id && t.is_currently_serving && t.window_id == Some(window_id) {
            t.is_currently_serving = false;
        }
    }
}

fn observe(state: &AppState, operation: &str, outcome: &str, start: Instant) {
    state
        .metrics
        .dispatch_latency_seconds
        .with_label_values(&[operation])
        .observe(start.elapsed().as_secs_f64());
    state
        .metrics
        .dispatch_total
        .with_label_values(&[operation, outcome])
        .inc();
}
