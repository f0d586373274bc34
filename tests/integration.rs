use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use order_dispatch::api::rest::router;
use order_dispatch::distance::{
    DistanceError, DistanceOutcome, DistanceResolver, GoogleDistanceResolver,
};
use order_dispatch::geo::GeoPoint;
use order_dispatch::models::order::{NewOrder, Order, OrderId, OrderStatus};
use order_dispatch::state::AppState;
use order_dispatch::store::{MemoryOrderStore, OrderStore, StoreError};
use serde_json::{json, Value};
use tower::ServiceExt;

struct StubResolver(DistanceOutcome);

#[async_trait]
impl DistanceResolver for StubResolver {
    async fn resolve(
        &self,
        _origin: &GeoPoint,
        _destination: &GeoPoint,
    ) -> Result<DistanceOutcome, DistanceError> {
        Ok(self.0)
    }
}

struct DownResolver;

#[async_trait]
impl DistanceResolver for DownResolver {
    async fn resolve(
        &self,
        _origin: &GeoPoint,
        _destination: &GeoPoint,
    ) -> Result<DistanceOutcome, DistanceError> {
        Err(DistanceError::Unavailable("connection refused".to_string()))
    }
}

struct RacingStore {
    inner: MemoryOrderStore,
}

#[async_trait]
impl OrderStore for RacingStore {
    async fn create(&self, order: &NewOrder) -> Result<OrderId, StoreError> {
        self.inner.create(order).await
    }

    async fn find_page(&self, offset: i64, limit: Option<i64>) -> Result<Vec<Order>, StoreError> {
        self.inner.find_page(offset, limit).await
    }

    async fn find_by_id_and_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, StoreError> {
        let found = self.inner.find_by_id_and_status(id, status).await?;
        if found.is_some() {
            self.inner
                .update_status(id, OrderStatus::Unassigned, OrderStatus::Taken)
                .await?;
        }
        Ok(found)
    }

    async fn update_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        new: OrderStatus,
    ) -> Result<u64, StoreError> {
        self.inner.update_status(id, expected, new).await
    }

    fn kind(&self) -> &'static str {
        "racing"
    }
}

fn app_with(store: Arc<dyn OrderStore>, resolver: Arc<dyn DistanceResolver>) -> axum::Router {
    router(Arc::new(AppState::new(store, resolver)))
}

fn setup(meters: u64) -> axum::Router {
    app_with(
        Arc::new(MemoryOrderStore::new()),
        Arc::new(StubResolver(DistanceOutcome::Meters(meters))),
    )
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn claim_request(id: &str) -> Request<Body> {
    json_request("PATCH", &format!("/orders/{id}"), json!({ "Status": "TAKEN" }))
}

fn order_body() -> Value {
    json!({
        "origin": ["22.2802", "114.184919"],
        "destination": ["25.052192", "121.522333"]
    })
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn submit(app: &axum::Router) -> Value {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/orders", order_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[tokio::test]
async fn health_reports_store_backend() {
    let app = setup(1);
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "memory");
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup(1);
    submit(&app).await;

    let response = app.oneshot(get_request("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("orders_submitted_total"));
}

#[tokio::test]
async fn create_order_returns_unassigned_order() {
    let app = setup(1049);
    let response = app
        .oneshot(json_request("POST", "/orders", order_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/json; charset=utf-8"
    );
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");

    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({ "id": 1, "distance": 1049, "status": "UNASSIGNED" })
    );
}

#[tokio::test]
async fn create_order_accepts_capitalized_fields() {
    let app = setup(7);
    let response = app
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({
                "Origin": ["1.5", "2.5"],
                "Destination": ["3.5", "4.5"]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_order_out_of_range_returns_400() {
    let app = setup(1);
    let response = app
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({
                "origin": ["-190", "0"],
                "destination": ["25.052192", "121.522333"]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()["content-type"],
        "application/json; charset=utf-8"
    );
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("origin"));
}

#[tokio::test]
async fn create_order_malformed_body_returns_400() {
    let app = setup(1);

    let wrong_arity = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({ "origin": ["1", "2", "3"], "destination": ["1", "2"] }),
        ))
        .await
        .unwrap();
    assert_eq!(wrong_arity.status(), StatusCode::BAD_REQUEST);

    let not_json = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .body(Body::from("{origin"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(not_json.status(), StatusCode::BAD_REQUEST);
    let body = body_json(not_json).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn create_order_wrong_content_type_returns_415() {
    let app = setup(1);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "text/plain")
                .body(Body::from(order_body().to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body = body_json(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn create_order_without_route_returns_400() {
    let app = app_with(
        Arc::new(MemoryOrderStore::new()),
        Arc::new(StubResolver(DistanceOutcome::NoRoute)),
    );
    let response = app
        .clone()
        .oneshot(json_request("POST", "/orders", order_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let listed = body_json(app.oneshot(get_request("/orders")).await.unwrap()).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn create_order_with_distance_service_down_returns_500() {
    let app = app_with(Arc::new(MemoryOrderStore::new()), Arc::new(DownResolver));
    let response = app
        .oneshot(json_request("POST", "/orders", order_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn create_order_without_api_key_has_zero_distance() {
    let resolver =
        GoogleDistanceResolver::new(None, "http://127.0.0.1:9", Duration::from_millis(100))
            .unwrap();
    let app = app_with(Arc::new(MemoryOrderStore::new()), Arc::new(resolver));

    let body = submit(&app).await;
    assert_eq!(body["distance"], 0);
    assert_eq!(body["status"], "UNASSIGNED");
}

#[tokio::test]
async fn list_orders_initially_empty() {
    let app = setup(1);
    let response = app.oneshot(get_request("/orders")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn list_orders_includes_submitted_order() {
    let app = setup(1049);
    let created = submit(&app).await;

    let response = app.oneshot(get_request("/orders")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body, json!([created]));
}

#[tokio::test]
async fn list_orders_pages_by_id() {
    let app = setup(10);
    for _ in 0..5 {
        submit(&app).await;
    }

    let ids = |value: Value| -> Vec<i64> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|order| order["id"].as_i64().unwrap())
            .collect()
    };

    let page_two = app
        .clone()
        .oneshot(get_request("/orders?page=2&limit=2"))
        .await
        .unwrap();
    assert_eq!(ids(body_json(page_two).await), vec![3, 4]);

    let page_three = app
        .clone()
        .oneshot(get_request("/orders?page=3&limit=2"))
        .await
        .unwrap();
    assert_eq!(ids(body_json(page_three).await), vec![5]);

    let unlimited = app
        .clone()
        .oneshot(get_request("/orders?page=3&limit=-1"))
        .await
        .unwrap();
    assert_eq!(ids(body_json(unlimited).await), vec![1, 2, 3, 4, 5]);

    let defaults = app
        .oneshot(get_request("/orders?page=&limit="))
        .await
        .unwrap();
    assert_eq!(ids(body_json(defaults).await), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn list_orders_rejects_invalid_paging() {
    let app = setup(1);
    for uri in [
        "/orders?page=0",
        "/orders?limit=-2",
        "/orders?page=abc",
        "/orders?limit=1.5",
    ] {
        let response = app.clone().oneshot(get_request(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let body = body_json(response).await;
        assert!(body["error"].is_string(), "{uri}");
    }
}

#[tokio::test]
async fn claim_order_succeeds_once() {
    let app = setup(1);
    submit(&app).await;

    let response = app.clone().oneshot(claim_request("1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "Status": "SUCCESS" }));

    let again = app.clone().oneshot(claim_request("1")).await.unwrap();
    assert_eq!(again.status(), StatusCode::NOT_FOUND);

    let listed = body_json(app.oneshot(get_request("/orders")).await.unwrap()).await;
    assert_eq!(listed[0]["status"], "TAKEN");
    assert_eq!(listed[0]["distance"], 1);
}

#[tokio::test]
async fn claim_order_accepts_lowercase_status_key() {
    let app = setup(1);
    submit(&app).await;

    let response = app
        .clone()
        .oneshot(json_request("PATCH", "/orders/1", json!({ "status": "TAKEN" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "Status": "SUCCESS" }));

    let listed = body_json(app.oneshot(get_request("/orders")).await.unwrap()).await;
    assert_eq!(listed[0]["status"], "TAKEN");
}

#[tokio::test]
async fn claim_unknown_order_returns_404() {
    let app = setup(1);
    let response = app.oneshot(claim_request("42")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn claim_rejects_invalid_ids() {
    let app = setup(1);
    submit(&app).await;

    for id in ["abc", "0", "-1"] {
        let response = app.clone().oneshot(claim_request(id)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{id}");
    }
}

#[tokio::test]
async fn claim_rejects_invalid_body() {
    let app = setup(1);
    submit(&app).await;

    let wrong_status = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/orders/1",
            json!({ "Status": "UNASSIGNED" }),
        ))
        .await
        .unwrap();
    assert_eq!(wrong_status.status(), StatusCode::BAD_REQUEST);

    let missing_status = app
        .clone()
        .oneshot(json_request("PATCH", "/orders/1", json!({ "state": "TAKEN" })))
        .await
        .unwrap();
    assert_eq!(missing_status.status(), StatusCode::BAD_REQUEST);

    let response = app.oneshot(claim_request("1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn claim_that_loses_race_returns_400() {
    let app = app_with(
        Arc::new(RacingStore {
            inner: MemoryOrderStore::new(),
        }),
        Arc::new(StubResolver(DistanceOutcome::Meters(1))),
    );
    submit(&app).await;

    let response = app.oneshot(claim_request("1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("another claim"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_have_exactly_one_winner() {
    let app = setup(1);
    submit(&app).await;

    let attempts = (0..32).map(|_| {
        let app = app.clone();
        tokio::spawn(async move { app.oneshot(claim_request("1")).await.unwrap().status() })
    });
    let statuses: Vec<StatusCode> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let winners = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    assert_eq!(winners, 1);
    assert!(statuses
        .iter()
        .filter(|s| **s != StatusCode::OK)
        .all(|s| *s == StatusCode::BAD_REQUEST || *s == StatusCode::NOT_FOUND));
}
