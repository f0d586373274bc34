pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::order::{NewOrder, Order, OrderId, OrderStatus};

pub use memory::MemoryOrderStore;
pub use postgres::PgOrderStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend failed: {0}")]
    Backend(String),

    #[error("corrupt order row: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create(&self, order: &NewOrder) -> Result<OrderId, StoreError>;

    async fn find_page(&self, offset: i64, limit: Option<i64>) -> Result<Vec<Order>, StoreError>;

    async fn find_by_id_and_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, StoreError>;

    /// Atomic `status = new WHERE id AND status = expected`; returns rows changed.
    async fn update_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        new: OrderStatus,
    ) -> Result<u64, StoreError>;

    fn kind(&self) -> &'static str;
}
