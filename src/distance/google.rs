use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::distance::{DistanceError, DistanceOutcome, DistanceResolver};
use crate::geo::GeoPoint;

pub const DEFAULT_DISTANCE_MATRIX_URL: &str =
    "https://maps.googleapis.com/maps/api/distancematrix/json";

const STATUS_OK: &str = "OK";

#[derive(Debug, Deserialize)]
pub struct DistanceMatrixResponse {
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub rows: Vec<DistanceMatrixRow>,
}

#[derive(Debug, Deserialize)]
pub struct DistanceMatrixRow {
    #[serde(default)]
    pub elements: Vec<DistanceMatrixElement>,
}

#[derive(Debug, Deserialize)]
pub struct DistanceMatrixElement {
    pub status: String,
    #[serde(default)]
    pub distance: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
pub struct TextValue {
    pub value: u64,
}

pub struct GoogleDistanceResolver {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl GoogleDistanceResolver {
    pub fn new(
        api_key: Option<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DistanceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DistanceError::Unavailable(format!("failed to create HTTP client: {err}")))?;

        let api_key = api_key.filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            warn!("distance API key is not set; every order will have distance 0");
        }

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(
        &self,
        key: &str,
        origin: &GeoPoint,
        destination: &GeoPoint,
    ) -> Result<DistanceMatrixResponse, DistanceError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("origins", origin.to_query_value()),
                ("destinations", destination.to_query_value()),
                ("key", key.to_string()),
            ])
            .send()
            .await
            .map_err(|err| DistanceError::Unavailable(format!("request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DistanceError::Unavailable(format!(
                "provider responded with HTTP {status}"
            )));
        }

        response
            .json::<DistanceMatrixResponse>()
            .await
            .map_err(|err| DistanceError::Unavailable(format!("malformed response: {err}")))
    }
}

#[async_trait]
impl DistanceResolver for GoogleDistanceResolver {
    async fn resolve(
        &self,
        origin: &GeoPoint,
        destination: &GeoPoint,
    ) -> Result<DistanceOutcome, DistanceError> {
        let Some(key) = self.api_key.as_deref() else {
            return Ok(DistanceOutcome::NotConfigured);
        };

        let response = self.fetch(key, origin, destination).await?;
        let outcome = interpret(response)?;
        debug!(?outcome, "distance resolved");
        Ok(outcome)
    }
}

pub fn interpret(response: DistanceMatrixResponse) -> Result<DistanceOutcome, DistanceError> {
    if response.status != STATUS_OK {
        let detail = response
            .error_message
            .map(|msg| format!(" ({msg})"))
            .unwrap_or_default();
        return Err(DistanceError::Unavailable(format!(
            "provider status {}{detail}",
            response.status
        )));
    }

    let element = response
        .rows
        .into_iter()
        .next()
        .and_then(|row| row.elements.into_iter().next())
        .ok_or_else(|| DistanceError::Unavailable("response has no matrix element".to_string()))?;

    if element.status != STATUS_OK {
        return Ok(DistanceOutcome::NoRoute);
    }

    element
        .distance
        .map(|distance| DistanceOutcome::Meters(distance.value))
        .ok_or_else(|| DistanceError::Unavailable("element has no distance".to_string()))
}
