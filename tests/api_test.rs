// Integration tests for the reference server HTTP surface.
//
// Requests go through the full app router via tower::ServiceExt::oneshot.
// The /ws route answers 426 here since test requests carry no hyper upgrade
// extension; a real upgrade is covered in live_feed_test.rs.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use vessel_feed::api::{create_app, AppState};
use vessel_feed::config::ServerConfig;
use vessel_feed::fleet::FleetStore;

fn make_app(fleet: Arc<FleetStore>) -> Router {
    let config = ServerConfig {
        max_limit: 50,
        ..ServerConfig::default()
    };
    create_app(Arc::new(AppState::new(fleet, &config)))
}

fn seeded_fleet() -> Arc<FleetStore> {
    let fleet = Arc::new(FleetStore::new());
    let outcome = fleet.ingest(&[
        json!({"id": 1, "name": "Nordic Star", "lat": 59.9, "lng": 10.7, "region": "europe"}),
        json!({"id": 2, "name": "Baltic Wind", "lat": "54.3", "lng": "10.1", "region": "Europe"}),
        json!({"id": 3, "name": "Pacific Dawn", "lat": 1.26, "lng": 103.8, "region": "asia"}),
    ]);
    assert_eq!(outcome.accepted, 3);
    fleet
}

async fn send(app: Router, method: Method, uri: &str, body: Body) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

// ── Pull endpoint ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_pull_all_regions() {
    let app = make_app(seeded_fleet());
    let (status, body) = send(app, Method::GET, "/api/vessels", Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    let vessels = body["vessels"].as_array().unwrap();
    assert_eq!(vessels.len(), 3);
    // Coordinates are normalized to numbers on the way in
    assert_eq!(vessels[1]["currentLat"], json!(54.3));
}

#[tokio::test]
async fn test_pull_region_filter_is_case_insensitive() {
    let app = make_app(seeded_fleet());
    let (status, body) = send(
        app,
        Method::GET,
        "/api/vessels?region=EUROPE&limit=10",
        Body::empty(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body["vessels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn test_pull_global_region_and_limit() {
    let app = make_app(seeded_fleet());
    let (_, body) = send(
        app,
        Method::GET,
        "/api/vessels?region=global&limit=2",
        Body::empty(),
    )
    .await;
    assert_eq!(body["vessels"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_pull_rejects_zero_limit() {
    let app = make_app(seeded_fleet());
    let (status, body) = send(app, Method::GET, "/api/vessels?limit=0", Body::empty()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_get_single_vessel() {
    let app = make_app(seeded_fleet());
    let (status, body) = send(app.clone(), Method::GET, "/api/vessels/3", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Pacific Dawn");

    let (status, _) = send(app, Method::GET, "/api/vessels/99", Body::empty()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Ingestion ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ingest_positions_counts_rejections() {
    let fleet = Arc::new(FleetStore::new());
    let app = make_app(Arc::clone(&fleet));
    let payload = json!({
        "vessels": [
            {"id": "IMO9321483", "lat": 51.9, "lng": 4.1},
            {"id": 7, "lat": null, "lng": null},
            {"name": "no id"}
        ]
    });

    let (status, body) = send(
        app,
        Method::POST,
        "/api/positions",
        Body::from(payload.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"accepted": 2, "rejected": 1}));
    assert_eq!(fleet.len(), 2);
}

#[tokio::test]
async fn test_ingest_rejects_malformed_body() {
    let app = make_app(Arc::new(FleetStore::new()));
    let (status, body) = send(
        app,
        Method::POST,
        "/api/positions",
        Body::from("{\"vessels\": 12"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_delete_vessel() {
    let fleet = seeded_fleet();
    let app = make_app(Arc::clone(&fleet));

    let (status, body) = send(app.clone(), Method::DELETE, "/api/vessels/2", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], "2");
    assert_eq!(fleet.len(), 2);

    let (status, _) = send(app, Method::DELETE, "/api/vessels/2", Body::empty()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Misc ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_reports_fleet_size() {
    let app = make_app(seeded_fleet());
    let (status, body) = send(app, Method::GET, "/health", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["vessels"], 3);
}

#[tokio::test]
async fn test_ws_route_requires_upgrade() {
    let app = make_app(seeded_fleet());
    let (status, _) = send(app, Method::GET, "/ws", Body::empty()).await;
    assert_ne!(status, StatusCode::OK);
    assert_ne!(status, StatusCode::NOT_FOUND);
}
