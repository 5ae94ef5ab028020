use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::clock::DayClock;
use crate::engine::projection::WindowBoard;
use crate::engine::sequencer::Sequencer;
use crate::models::service::Service;
use crate::models::ticket::{Office, Ticket};
use crate::models::window::Window;
use crate::observability::metrics::Metrics;
use crate::realtime::rooms::RoomRouter;

pub struct AppState {
    pub tickets: DashMap<Uuid, Ticket>,
    pub windows: DashMap<Uuid, Window>,
    pub services: DashMap<Uuid, Service>,
    pub sequencer: Sequencer,
    /// Latest committed per-window projections; reads never take a lock.
    pub boards: DashMap<Uuid, WindowBoard>,
    pub rooms: RoomRouter,
    pub clock: Arc<dyn DayClock>,
    pub metrics: Metrics,
    pub event_buffer_size: usize,
    /// One mutation lock per office partition; dispatch for different
    /// offices never contends.
    office_locks: [Mutex<()>; Office::ALL.len()],
}

impl AppState {
    pub fn new(
        max_queue_number: u32,
        reset_queue_daily: bool,
        event_buffer_size: usize,
        clock: Arc<dyn DayClock>,
    ) -> Self {
        let metrics = Metrics::new();
        let rooms = RoomRouter::new(metrics.room_deliveries_dropped_total.clone());

        Self {
            tickets: DashMap::new(),
            windows: DashMap::new(),
            services: DashMap::new(),
            sequencer: Sequencer::new(max_queue_number, reset_queue_daily),
            boards: DashMap::new(),
            rooms,
            clock,
            metrics,
            event_buffer_size,
            office_locks: std::array::from_fn(|_| Mutex::new(())),
        }
    }

    pub fn office_lock(&self, office: Office) -> &Mutex<()> {
        &self.office_locks[office.index()]
    }
}
