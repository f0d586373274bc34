pub mod google;

use async_trait::async_trait;
use thiserror::Error;

use crate::geo::GeoPoint;

pub use google::GoogleDistanceResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceOutcome {
    Meters(u64),
    NoRoute,
    NotConfigured,
}

#[derive(Debug, Error)]
pub enum DistanceError {
    #[error("distance service unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait DistanceResolver: Send + Sync {
    async fn resolve(
        &self,
        origin: &GeoPoint,
        destination: &GeoPoint,
    ) -> Result<DistanceOutcome, DistanceError>;
}
