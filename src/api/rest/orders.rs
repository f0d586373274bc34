use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{patch, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::api::rest::{json_body, json_response, JsonResponse};
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::order::{Order, OrderId};
use crate::state::AppState;

pub const CLAIM_SUCCESS: &str = "SUCCESS";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", patch(claim_order))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    #[serde(alias = "Origin")]
    pub origin: Vec<String>,
    #[serde(alias = "Destination")]
    pub destination: Vec<String>,
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Deserialize, Serialize)]
pub struct ClaimStatus {
    #[serde(rename = "Status", alias = "status")]
    pub status: String,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<JsonResponse<Order>, AppError> {
    let payload = json_body(payload)?;
    let origin = GeoPoint::parse_pair("origin", &payload.origin)?;
    let destination = GeoPoint::parse_pair("destination", &payload.destination)?;

    let order = state.orders.submit(origin, destination).await?;
    Ok(json_response(order))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListOrdersQuery>, QueryRejection>,
) -> Result<JsonResponse<Vec<Order>>, AppError> {
    let Query(query) =
        query.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;
    let page = parse_query_number("page", query.page.as_deref())?;
    let limit = parse_query_number("limit", query.limit.as_deref())?;

    let orders = state.orders.list(page, limit).await?;
    Ok(json_response(orders))
}

async fn claim_order(
    State(state): State<Arc<AppState>>,
    id: Result<Path<String>, PathRejection>,
    payload: Result<Json<ClaimStatus>, JsonRejection>,
) -> Result<JsonResponse<ClaimStatus>, AppError> {
    let Path(raw_id) = id.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;
    let order_id = parse_order_id(&raw_id)?;
    let payload = json_body(payload)?;

    state.orders.claim(order_id, &payload.status).await?;
    Ok(json_response(ClaimStatus {
        status: CLAIM_SUCCESS.to_string(),
    }))
}

fn parse_order_id(raw: &str) -> Result<OrderId, AppError> {
    match raw.parse::<OrderId>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(AppError::InvalidInput(format!("invalid order id: {raw}"))),
    }
}

fn parse_query_number(name: &str, raw: Option<&str>) -> Result<Option<i64>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .map_err(|err| AppError::InvalidInput(format!("invalid {name} {value:?}: {err}"))),
    }
}
