use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::geo::GeoPoint;

pub type OrderId = i64;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Unassigned,
    Taken,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Unassigned => "UNASSIGNED",
            OrderStatus::Taken => "TAKEN",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown order status {:?}", self.0)
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "UNASSIGNED" => Ok(OrderStatus::Unassigned),
            "TAKEN" => Ok(OrderStatus::Taken),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(rename = "distance")]
    pub distance_meters: u64,
    pub status: OrderStatus,
    #[serde(skip)]
    pub origin: GeoPoint,
    #[serde(skip)]
    pub destination: GeoPoint,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub distance_meters: u64,
    pub status: OrderStatus,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn unassigned(origin: GeoPoint, destination: GeoPoint, distance_meters: u64) -> Self {
        let now = Utc::now();
        Self {
            distance_meters,
            status: OrderStatus::Unassigned,
            origin,
            destination,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(self, id: OrderId) -> Order {
        Order {
            id,
            distance_meters: self.distance_meters,
            status: self.status,
            origin: self.origin,
            destination: self.destination,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
