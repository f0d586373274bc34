use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::info;

use crate::geo::GeoPoint;
use crate::models::order::{NewOrder, Order, OrderId, OrderStatus};
use crate::store::{OrderStore, StoreError};

const CREATE_ORDERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id              BIGSERIAL PRIMARY KEY,
    distance        BIGINT NOT NULL CHECK (distance >= 0),
    status          VARCHAR(10) NOT NULL,
    origin_lat      DOUBLE PRECISION NOT NULL,
    origin_lng      DOUBLE PRECISION NOT NULL,
    dest_lat        DOUBLE PRECISION NOT NULL,
    dest_lng        DOUBLE PRECISION NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL,
    updated_at      TIMESTAMPTZ NOT NULL
)
"#;

const ORDER_COLUMNS: &str =
    "id, distance, status, origin_lat, origin_lng, dest_lat, dest_lng, created_at, updated_at";

#[derive(FromRow)]
struct OrderRow {
    id: i64,
    distance: i64,
    status: String,
    origin_lat: f64,
    origin_lng: f64,
    dest_lat: f64,
    dest_lng: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<OrderStatus>()
            .map_err(|err| StoreError::Corrupt(format!("order {}: {err}", row.id)))?;
        let distance_meters = u64::try_from(row.distance).map_err(|_| {
            StoreError::Corrupt(format!("order {}: negative distance {}", row.id, row.distance))
        })?;

        Ok(Order {
            id: row.id,
            distance_meters,
            status,
            origin: GeoPoint {
                lat: row.origin_lat,
                lng: row.origin_lng,
            },
            destination: GeoPoint {
                lat: row.dest_lat,
                lng: row.dest_lng,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(backend)?;

        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_ORDERS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        info!("orders table ready");
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create(&self, order: &NewOrder) -> Result<OrderId, StoreError> {
        let distance = i64::try_from(order.distance_meters).map_err(|_| {
            StoreError::Backend(format!("distance {} overflows BIGINT", order.distance_meters))
        })?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO orders \
             (distance, status, origin_lat, origin_lng, dest_lat, dest_lng, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
        )
        .bind(distance)
        .bind(order.status.as_str())
        .bind(order.origin.lat)
        .bind(order.origin.lng)
        .bind(order.destination.lat)
        .bind(order.destination.lng)
        .bind(order.created_at)
        .bind(order.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        Ok(id)
    }

    async fn find_page(&self, offset: i64, limit: Option<i64>) -> Result<Vec<Order>, StoreError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY id ASC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn find_by_id_and_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, StoreError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND status = $2"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(Order::try_from).transpose()
    }

    async fn update_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        new: OrderStatus,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE orders SET status = $1, updated_at = now() WHERE id = $2 AND status = $3",
        )
        .bind(new.as_str())
        .bind(id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(result.rows_affected())
    }

    fn kind(&self) -> &'static str {
        "postgres"
    }
}
