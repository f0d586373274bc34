use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::distance::{DistanceOutcome, DistanceResolver};
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::order::{NewOrder, Order, OrderId, OrderStatus};
use crate::observability::metrics::Metrics;
use crate::store::OrderStore;

pub const DEFAULT_PAGE: i64 = 1;
pub const NO_LIMIT: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: i64,
    pub limit: Option<i64>,
}

impl PageWindow {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Result<Self, AppError> {
        let page = page.unwrap_or(DEFAULT_PAGE);
        let limit = limit.unwrap_or(NO_LIMIT);

        if page < 1 {
            return Err(AppError::InvalidInput(format!(
                "page must be at least 1, got {page}"
            )));
        }
        if limit < NO_LIMIT {
            return Err(AppError::InvalidInput(format!(
                "limit must be -1 or greater, got {limit}"
            )));
        }

        if limit == NO_LIMIT {
            return Ok(Self {
                offset: 0,
                limit: None,
            });
        }

        let offset = (page - 1).checked_mul(limit).ok_or_else(|| {
            AppError::InvalidInput(format!("page {page} with limit {limit} is out of range"))
        })?;

        Ok(Self {
            offset,
            limit: Some(limit),
        })
    }
}

#[derive(Clone)]
pub struct OrderLifecycle {
    store: Arc<dyn OrderStore>,
    resolver: Arc<dyn DistanceResolver>,
    metrics: Metrics,
}

impl OrderLifecycle {
    pub fn new(
        store: Arc<dyn OrderStore>,
        resolver: Arc<dyn DistanceResolver>,
        metrics: Metrics,
    ) -> Self {
        Self {
            store,
            resolver,
            metrics,
        }
    }

    pub fn store_kind(&self) -> &'static str {
        self.store.kind()
    }

    pub async fn submit(&self, origin: GeoPoint, destination: GeoPoint) -> Result<Order, AppError> {
        let result = self.try_submit(origin, destination).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(AppError::InvalidInput(_)) => "invalid",
            Err(AppError::NoRoute(_)) => "no_route",
            Err(_) => "error",
        };
        self.metrics.record_submission(outcome);
        result
    }

    async fn try_submit(&self, origin: GeoPoint, destination: GeoPoint) -> Result<Order, AppError> {
        origin.validate("origin")?;
        destination.validate("destination")?;

        let distance_meters = self.resolve_distance(&origin, &destination).await?;

        let new_order = NewOrder::unassigned(origin, destination, distance_meters);
        let id = self.store.create(&new_order).await?;
        if id < 1 {
            return Err(AppError::Persistence(format!(
                "store assigned invalid order id {id}"
            )));
        }

        info!(order_id = id, distance_meters, "order created");
        Ok(new_order.with_id(id))
    }

    async fn resolve_distance(
        &self,
        origin: &GeoPoint,
        destination: &GeoPoint,
    ) -> Result<u64, AppError> {
        let start = Instant::now();
        let result = self.resolver.resolve(origin, destination).await;

        let label = match &result {
            Ok(DistanceOutcome::Meters(_)) => "ok",
            Ok(DistanceOutcome::NoRoute) => "no_route",
            Ok(DistanceOutcome::NotConfigured) => "not_configured",
            Err(_) => "error",
        };
        self.metrics
            .distance_lookup_seconds
            .with_label_values(&[label])
            .observe(start.elapsed().as_secs_f64());

        match result? {
            DistanceOutcome::Meters(meters) => Ok(meters),
            DistanceOutcome::NotConfigured => Ok(0),
            DistanceOutcome::NoRoute => Err(AppError::NoRoute(format!(
                "no route from [{}] to [{}]",
                origin.to_query_value(),
                destination.to_query_value()
            ))),
        }
    }

    pub async fn list(&self, page: Option<i64>, limit: Option<i64>) -> Result<Vec<Order>, AppError> {
        let window = PageWindow::new(page, limit)?;
        let orders = self.store.find_page(window.offset, window.limit).await?;
        Ok(orders)
    }

    pub async fn claim(&self, order_id: OrderId, requested: &str) -> Result<(), AppError> {
        let result = self.try_claim(order_id, requested).await;
        let outcome = match &result {
            Ok(()) => "success",
            Err(AppError::Conflict(_)) => "conflict",
            Err(AppError::NotFound(_)) => "not_found",
            Err(AppError::InvalidInput(_)) => "invalid",
            Err(_) => "error",
        };
        self.metrics.record_claim(outcome);
        result
    }

    async fn try_claim(&self, order_id: OrderId, requested: &str) -> Result<(), AppError> {
        let target = requested
            .parse::<OrderStatus>()
            .ok()
            .filter(|status| *status == OrderStatus::Taken)
            .ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "status must be {}, got {requested:?}",
                    OrderStatus::Taken
                ))
            })?;

        if order_id < 1 {
            return Err(AppError::InvalidInput(format!("invalid order id {order_id}")));
        }

        let available = self
            .store
            .find_by_id_and_status(order_id, OrderStatus::Unassigned)
            .await?;
        if available.is_none() {
            return Err(AppError::NotFound(format!(
                "order {order_id} with status {} not found",
                OrderStatus::Unassigned
            )));
        }

        let rows = self
            .store
            .update_status(order_id, OrderStatus::Unassigned, target)
            .await?;

        match rows {
            1 => {
                info!(order_id, "order claimed");
                Ok(())
            }
            0 => {
                warn!(order_id, "claim lost race");
                Err(AppError::Conflict(format!(
                    "order {order_id} was taken by another claim"
                )))
            }
            n => Err(AppError::Persistence(format!(
                "claim of order {order_id} changed {n} rows"
            ))),
        }
    }
}
