use prometheus::{Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub dispatches_total: IntCounterVec,
    pub orders_in_queue: IntGauge,
    pub dispatch_latency_seconds: HistogramVec,
    pub riders_available: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let dispatches_total = IntCounterVec::new(
            Opts::new("dispatches_total", "Completed dispatch attempts by reason"),
            &["reason"],
        )
        .expect("valid dispatches_total metric");

        let orders_in_queue = IntGauge::new(
            "orders_in_queue",
            "Orders currently waiting in the dispatch queue",
        )
        .expect("valid orders_in_queue metric");

        let dispatch_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "dispatch_latency_seconds",
                "Latency of dispatch processing in seconds",
            ),
            &["outcome"],
        )
        .expect("valid dispatch_latency_seconds metric");

        let riders_available = IntGauge::new(
            "riders_available",
            "Riders currently marked available for dispatch",
        )
        .expect("valid riders_available metric");

        registry
            .register(Box::new(dispatches_total.clone()))
            .expect("register dispatches_total");
        registry
            .register(Box::new(orders_in_queue.clone()))
            .expect("register orders_in_queue");
        registry
            .register(Box::new(dispatch_latency_seconds.clone()))
            .expect("register dispatch_latency_seconds");
        registry
            .register(Box::new(riders_available.clone()))
            .expect("register riders_available");

        Self {
            registry,
            dispatches_total,
            orders_in_queue,
            dispatch_latency_seconds,
            riders_available,
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
