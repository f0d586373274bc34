use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_submitted_total: IntCounterVec,
    pub claims_total: IntCounterVec,
    pub distance_lookup_seconds: HistogramVec,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orders_submitted_total = IntCounterVec::new(
            Opts::new("orders_submitted_total", "Order submissions by outcome"),
            &["outcome"],
        )
        .expect("valid orders_submitted_total metric");

        let claims_total = IntCounterVec::new(
            Opts::new("claims_total", "Claim attempts by outcome"),
            &["outcome"],
        )
        .expect("valid claims_total metric");

        let distance_lookup_seconds = HistogramVec::new(
            HistogramOpts::new(
                "distance_lookup_seconds",
                "Latency of distance lookups in seconds",
            ),
            &["outcome"],
        )
        .expect("valid distance_lookup_seconds metric");

        registry
            .register(Box::new(orders_submitted_total.clone()))
            .expect("register orders_submitted_total");
        registry
            .register(Box::new(claims_total.clone()))
            .expect("register claims_total");
        registry
            .register(Box::new(distance_lookup_seconds.clone()))
            .expect("register distance_lookup_seconds");

        Self {
            registry,
            orders_submitted_total,
            claims_total,
            distance_lookup_seconds,
        }
    }

    pub fn record_claim(&self, outcome: &str) {
        self.claims_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_submission(&self, outcome: &str) {
        self.orders_submitted_total.with_label_values(&[outcome]).inc();
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
