use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::models::order::{NewOrder, Order, OrderId, OrderStatus};
use crate::store::{OrderStore, StoreError};

#[derive(Default)]
struct Inner {
    last_id: OrderId,
    orders: BTreeMap<OrderId, Order>,
}

#[derive(Default)]
pub struct MemoryOrderStore {
    inner: Mutex<Inner>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create(&self, order: &NewOrder) -> Result<OrderId, StoreError> {
        let mut inner = self.lock()?;
        let id = inner.last_id + 1;
        inner.last_id = id;
        inner.orders.insert(id, order.clone().with_id(id));
        Ok(id)
    }

    async fn find_page(&self, offset: i64, limit: Option<i64>) -> Result<Vec<Order>, StoreError> {
        let inner = self.lock()?;
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = match limit {
            Some(limit) => usize::try_from(limit).unwrap_or(usize::MAX),
            None => usize::MAX,
        };

        Ok(inner.orders.values().skip(skip).take(take).cloned().collect())
    }

    async fn find_by_id_and_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .orders
            .get(&id)
            .filter(|order| order.status == status)
            .cloned())
    }

    async fn update_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        new: OrderStatus,
    ) -> Result<u64, StoreError> {
        let mut inner = self.lock()?;
        match inner.orders.get_mut(&id) {
            Some(order) if order.status == expected => {
                order.status = new;
                order.updated_at = Utc::now();
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
