use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub tickets_issued_total: IntCounterVec,
    pub dispatch_total: IntCounterVec,
    pub dispatch_latency_seconds: HistogramVec,
    pub tickets_waiting: IntGaugeVec,
    pub ws_connections: IntGauge,
    pub room_deliveries_dropped_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let tickets_issued_total = IntCounterVec::new(
            Opts::new("tickets_issued_total", "Tickets issued per office"),
            &["office"],
        )
        .expect("valid tickets_issued_total metric");

        let dispatch_total = IntCounterVec::new(
            Opts::new("dispatch_total", "Dispatcher operations by outcome"),
            &["operation", "outcome"],
        )
        .expect("valid dispatch_total metric");

        let dispatch_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "dispatch_latency_seconds",
                "Latency of dispatcher operations in seconds",
            ),
            &["operation"],
        )
        .expect("valid dispatch_latency_seconds metric");

        let tickets_waiting = IntGaugeVec::new(
            Opts::new("tickets_waiting", "Current waiting tickets per office"),
            &["office"],
        )
        .expect("valid tickets_waiting metric");

        let ws_connections = IntGauge::new(
            "ws_connections",
            "Currently connected websocket clients",
        )
        .expect("valid ws_connections metric");

        let room_deliveries_dropped_total = IntCounter::new(
            "room_deliveries_dropped_total",
            "Room events dropped because a subscriber channel was full or closed",
        )
        .expect("valid room_deliveries_dropped_total metric");

        registry
            .register(Box::new(tickets_issued_total.clone()))
            .expect("register tickets_issued_total");
        registry
            .register(Box::new(dispatch_total.clone()))
            .expect("register dispatch_total");
        registry
            .register(Box::new(dispatch_latency_seconds.clone()))
            .expect("register dispatch_latency_seconds");
        registry
            .register(Box::new(tickets_waiting.clone()))
            .expect("register tickets_waiting");
        registry
            .register(Box::new(ws_connections.clone()))
            .expect("register ws_connections");
        registry
            .register(Box::new(room_deliveries_dropped_total.clone()))
            .expect("register room_deliveries_dropped_total");

        Self {
            registry,
            tickets_issued_total,
            dispatch_total,
            dispatch_latency_seconds,
            tickets_waiting,
            ws_connections,
            room_deliveries_dropped_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
