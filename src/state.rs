use std::sync::Arc;

use crate::distance::DistanceResolver;
use crate::engine::lifecycle::OrderLifecycle;
use crate::observability::metrics::Metrics;
use crate::store::OrderStore;

pub struct AppState {
    pub orders: OrderLifecycle,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(store: Arc<dyn OrderStore>, resolver: Arc<dyn DistanceResolver>) -> Self {
        let metrics = Metrics::new();
        let orders = OrderLifecycle::new(store, resolver, metrics.clone());

        Self { orders, metrics }
    }
}
