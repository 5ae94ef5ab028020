use std::collections::HashMap;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::ticket::Office;
use crate::realtime::events::QueueEvent;

/// Connection identifier assigned at websocket upgrade.
pub type ConnId = Uuid;

pub fn admin_room(office: Office) -> String {
    format!("admin-{office}")
}

pub fn kiosk_room(office: Office) -> String {
    format!("kiosk-{office}")
}

/// Tracks which connections are subscribed to which rooms and delivers typed
/// events to every current member.
///
/// Delivery is fire-and-forget at-most-once: a member whose channel is full
/// or closed misses the event and reconciles by refetching on reconnect.
/// Membership is not remembered across disconnects; clients re-join their
/// rooms themselves.
pub struct RoomRouter {
    rooms: DashMap<String, HashMap<ConnId, mpsc::Sender<QueueEvent>>>,
    dropped: prometheus::IntCounter,
}

impl RoomRouter {
    pub fn new(dropped: prometheus::IntCounter) -> Self {
        Self {
            rooms: DashMap::new(),
            dropped,
        }
    }

    pub fn join(&self, conn: ConnId, room: &str, tx: mpsc::Sender<QueueEvent>) {
        self.rooms
            .entry(room.to_string())
            .or_default()
            .insert(conn, tx);
        debug!(%conn, room, "joined room");
    }

    pub fn leave(&self, conn: ConnId, room: &str) {
        if let Some(mut members) = self.rooms.get_mut(room) {
            members.remove(&conn);
        }
        debug!(%conn, room, "left room");
    }

    /// Removes the connection from every room it joined. Called on socket
    /// close.
    pub fn leave_all(&self, conn: ConnId) {
        for mut entry in self.rooms.iter_mut() {
            entry.value_mut().remove(&conn);
        }
    }

    pub fn member_count(&self, room: &str) -> usize {
        self.rooms.get(room).map(|m| m.len()).unwrap_or(0)
    }

    /// Delivers an event to every current member of the room. A failed send
    /// is logged and counted; it never propagates to the publishing write.
    pub fn publish(&self, room: &str, event: &QueueEvent) {
        let Some(members) = self.rooms.get(room) else {
            return;
        };

        for (conn, tx) in members.iter() {
            if let Err(err) = tx.try_send(event.clone()) {
                self.dropped.inc();
                warn!(%conn, room, event = event.kind(), error = %err, "room delivery failed");
            }
        }
    }

    /// Publishes one event to both the admin and kiosk rooms of its office.
    pub fn publish_office(&self, event: &QueueEvent) {
        let office = event.office();
        self.publish(&admin_room(office), event);
        self.publish(&kiosk_room(office), event);
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use uuid::Uuid;

    use super::{RoomRouter, admin_room};
    use crate::models::ticket::Office;
    use crate::realtime::events::QueueEvent;

    fn router() -> RoomRouter {
        let dropped =
            prometheus::IntCounter::new("dropped_test", "dropped deliveries").unwrap();
        RoomRouter::new(dropped)
    }

    fn added_event(office: Office, number: u32) -> QueueEvent {
        QueueEvent::QueueAdded {
            office,
            ticket_id: Uuid::new_v4(),
            number,
            is_priority: false,
        }
    }

    #[tokio::test]
    async fn publish_reaches_each_member_exactly_once() {
        let router = router();
        let room = admin_room(Office::Registrar);

        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        router.join(Uuid::new_v4(), &room, tx_a);
        router.join(Uuid::new_v4(), &room, tx_b);

        let event = added_event(Office::Registrar, 1);
        router.publish(&room, &event);

        assert_eq!(rx_a.recv().await.unwrap(), event);
        assert_eq!(rx_b.recv().await.unwrap(), event);
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn left_member_receives_nothing() {
        let router = router();
        let room = admin_room(Office::Registrar);
        let conn = Uuid::new_v4();

        let (tx, mut rx) = mpsc::channel(8);
        router.join(conn, &room, tx);
        router.leave(conn, &room);

        router.publish(&room, &added_event(Office::Registrar, 1));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn leave_all_clears_every_room() {
        let router = router();
        let conn = Uuid::new_v4();
        let (tx, mut rx) = mpsc::channel(8);

        router.join(conn, &admin_room(Office::Registrar), tx.clone());
        router.join(conn, &admin_room(Office::Mis), tx);
        router.leave_all(conn);

        router.publish(&admin_room(Office::Registrar), &added_event(Office::Registrar, 1));
        router.publish(&admin_room(Office::Mis), &added_event(Office::Mis, 1));
        assert!(rx.try_recv().is_err());
        assert_eq!(router.member_count(&admin_room(Office::Registrar)), 0);
    }

    #[tokio::test]
    async fn publish_to_empty_room_is_a_no_op() {
        let router = router();
        router.publish("admin-registrar", &added_event(Office::Registrar, 1));
    }

    #[tokio::test]
    async fn full_channel_drops_the_event_without_failing() {
        let router = router();
        let room = admin_room(Office::Admissions);
        let (tx, mut rx) = mpsc::channel(1);
        router.join(Uuid::new_v4(), &room, tx);

        router.publish(&room, &added_event(Office::Admissions, 1));
        router.publish(&room, &added_event(Office::Admissions, 2));

        // Only the first fits; the second is dropped at-most-once style.
        let first = rx.recv().await.unwrap();
        assert!(matches!(first, QueueEvent::QueueAdded { number: 1, .. }));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn office_publish_reaches_admin_and_kiosk_rooms() {
        let router = router();
        let (tx_admin, mut rx_admin) = mpsc::channel(8);
        let (tx_kiosk, mut rx_kiosk) = mpsc::channel(8);
        router.join(Uuid::new_v4(), "admin-registrar", tx_admin);
        router.join(Uuid::new_v4(), "kiosk-registrar", tx_kiosk);

        router.publish_office(&added_event(Office::Registrar, 5));
        assert!(rx_admin.recv().await.is_some());
        assert!(rx_kiosk.recv().await.is_some());
    }
}
