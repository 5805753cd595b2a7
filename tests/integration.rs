use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use rider_dispatch::api::rest::router;
use rider_dispatch::engine::worker::run_dispatch_worker;
use rider_dispatch::geo::GeoPoint;
use rider_dispatch::geocode::StaticGeocoder;
use rider_dispatch::notify::LogNotifier;
use rider_dispatch::state::{AppState, DispatchTimeouts};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

fn new_state() -> (Arc<AppState>, mpsc::Receiver<Uuid>) {
    let geocoder = StaticGeocoder::new().with_entry(
        "12 Market Road",
        GeoPoint {
            lat: 25.30,
            lng: 86.70,
        },
    );
    let (state, rx) = AppState::new(
        1024,
        1024,
        Arc::new(geocoder),
        Arc::new(LogNotifier),
        DispatchTimeouts::default(),
    );
    (Arc::new(state), rx)
}

fn setup() -> (axum::Router, mpsc::Receiver<Uuid>) {
    let (state, rx) = new_state();
    (router(state), rx)
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

fn post_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
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

async fn create_rider(app: &axum::Router, name: &str, lat: f64, lng: f64) -> Value {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/riders",
            json!({
                "name": name,
                "location": { "lat": lat, "lng": lng }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

async fn create_order_at(app: &axum::Router, lat: f64, lng: f64) -> Value {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({
                "address": {
                    "text": "precomputed",
                    "coordinates": { "lat": lat, "lng": lng }
                },
                "total_amount": 240.0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _rx) = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["orders"], 0);
    assert_eq!(body["riders"], 0);
    assert_eq!(body["riders_available"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, _rx) = setup();
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
    assert!(body.contains("orders_in_queue"));
}

#[tokio::test]
async fn create_rider_returns_rider() {
    let (app, _rx) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/riders",
            json!({
                "name": "Asha",
                "location": { "lat": 25.31, "lng": 86.71 },
                "device_token": "tok-1"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["name"], "Asha");
    assert_eq!(body["available"], true);
    assert!(body["assigned_order"].is_null());
    assert_eq!(body["device_token"], "tok-1");
    assert!(!body["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn create_rider_empty_name_returns_400() {
    let (app, _rx) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/riders",
            json!({
                "name": "  ",
                "location": { "lat": 25.31, "lng": 86.71 }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_rider_out_of_range_location_returns_400() {
    let (app, _rx) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/riders",
            json!({
                "name": "Nowhere",
                "location": { "lat": 95.0, "lng": 0.0 }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_rider_availability() {
    let (app, _rx) = setup();

    let rider = create_rider(&app, "Bilal", 25.31, 86.71).await;
    let id = rider["id"].as_str().unwrap();

    let res = app
        .oneshot(json_request(
            "PATCH",
            &format!("/riders/{id}/availability"),
            json!({ "available": false }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["available"], false);
}

#[tokio::test]
async fn update_rider_location() {
    let (app, _rx) = setup();

    let rider = create_rider(&app, "Chitra", 25.31, 86.71).await;
    let id = rider["id"].as_str().unwrap();

    let res = app
        .oneshot(json_request(
            "PATCH",
            &format!("/riders/{id}/location"),
            json!({ "location": { "lat": 25.40, "lng": 86.80 } }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["location"]["lat"], 25.40);
    assert_eq!(body["location"]["lng"], 86.80);
}

#[tokio::test]
async fn get_nonexistent_order_returns_404() {
    let (app, _rx) = setup();
    let fake_id = "00000000-0000-0000-0000-000000000000";
    let response = app
        .oneshot(get_request(&format!("/orders/{fake_id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_order_starts_placed_and_unassigned() {
    let (app, _rx) = setup();
    let body = create_order_at(&app, 25.30, 86.70).await;

    assert_eq!(body["status"], "placed");
    assert!(body["assigned_rider"].is_null());
}

#[tokio::test]
async fn create_order_without_address_returns_400() {
    let (app, _rx) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({
                "address": { "text": " ", "coordinates": null },
                "total_amount": 10.0
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dispatch_with_no_riders_reports_unassignable() {
    let (app, _rx) = setup();

    let order = create_order_at(&app, 25.30, 86.70).await;
    let order_id = order["id"].as_str().unwrap();

    let res = app
        .clone()
        .oneshot(post_request(&format!("/orders/{order_id}/dispatch")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let result = body_json(res).await;
    assert_eq!(result["success"], false);
    assert_eq!(result["reason"], "NoRidersAvailable");
    assert!(result["assigned_rider_id"].is_null());

    let res = app
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    let order = body_json(res).await;
    assert!(order["assigned_rider"].is_null());
    assert_eq!(order["status"], "placed");
}

#[tokio::test]
async fn dispatch_assigns_nearest_rider_and_is_idempotent() {
    let (app, _rx) = setup();

    // R1 ~1.4 km out, R2 ~30 km out, R3 nearest but unavailable.
    let r1 = create_rider(&app, "R1", 25.31, 86.71).await;
    let _r2 = create_rider(&app, "R2", 25.50, 86.90).await;
    let r3 = create_rider(&app, "R3", 25.30, 86.70).await;
    let r1_id = r1["id"].as_str().unwrap().to_string();
    let r3_id = r3["id"].as_str().unwrap();

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/riders/{r3_id}/availability"),
            json!({ "available": false }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let order = create_order_at(&app, 25.30, 86.70).await;
    let order_id = order["id"].as_str().unwrap();

    let res = app
        .clone()
        .oneshot(post_request(&format!("/orders/{order_id}/dispatch")))
        .await
        .unwrap();
    let result = body_json(res).await;

    assert_eq!(result["success"], true);
    assert_eq!(result["reason"], "Assigned");
    assert_eq!(result["assigned_rider_id"], r1_id);

    let res = app
        .clone()
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    let order = body_json(res).await;
    assert_eq!(order["status"], "preparing");
    assert_eq!(order["assigned_rider"], r1_id);

    let res = app
        .clone()
        .oneshot(get_request("/riders"))
        .await
        .unwrap();
    let riders = body_json(res).await;
    let claimed = riders
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["id"] == r1_id.as_str())
        .unwrap();
    assert_eq!(claimed["available"], false);
    assert_eq!(claimed["assigned_order"], order["id"]);

    // Re-triggering dispatch is a safe no-op.
    let res = app
        .oneshot(post_request(&format!("/orders/{order_id}/dispatch")))
        .await
        .unwrap();
    let result = body_json(res).await;
    assert_eq!(result["success"], false);
    assert_eq!(result["reason"], "AlreadyAssigned");
    assert_eq!(result["assigned_rider_id"], r1_id);
}

#[tokio::test]
async fn dispatch_geocodes_free_text_addresses() {
    let (app, _rx) = setup();

    let rider = create_rider(&app, "R1", 25.31, 86.71).await;
    let rider_id = rider["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({
                "address": { "text": "12 Market Road", "coordinates": null },
                "total_amount": 99.0
            }),
        ))
        .await
        .unwrap();
    let order = body_json(res).await;
    let order_id = order["id"].as_str().unwrap();

    let res = app
        .oneshot(post_request(&format!("/orders/{order_id}/dispatch")))
        .await
        .unwrap();
    let result = body_json(res).await;

    assert_eq!(result["success"], true);
    assert_eq!(result["assigned_rider_id"], rider_id);
}

#[tokio::test]
async fn dispatch_reports_geocode_failure_without_touching_state() {
    let (app, _rx) = setup();

    let rider = create_rider(&app, "R1", 25.31, 86.71).await;
    let rider_id = rider["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({
                "address": { "text": "no such street", "coordinates": null },
                "total_amount": 99.0
            }),
        ))
        .await
        .unwrap();
    let order = body_json(res).await;
    let order_id = order["id"].as_str().unwrap();

    let res = app
        .clone()
        .oneshot(post_request(&format!("/orders/{order_id}/dispatch")))
        .await
        .unwrap();
    let result = body_json(res).await;

    assert_eq!(result["success"], false);
    assert_eq!(result["reason"], "GeocodeFailure");

    let res = app
        .clone()
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    let order = body_json(res).await;
    assert_eq!(order["status"], "placed");
    assert!(order["assigned_rider"].is_null());

    let res = app.oneshot(get_request("/riders")).await.unwrap();
    let riders = body_json(res).await;
    let rider = riders
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["id"] == rider_id.as_str())
        .unwrap();
    assert_eq!(rider["available"], true);
    assert!(rider["assigned_order"].is_null());
}

#[tokio::test]
async fn cancel_releases_the_claimed_rider() {
    let (app, _rx) = setup();

    let rider = create_rider(&app, "R1", 25.31, 86.71).await;
    let rider_id = rider["id"].as_str().unwrap().to_string();

    let order = create_order_at(&app, 25.30, 86.70).await;
    let order_id = order["id"].as_str().unwrap();

    let res = app
        .clone()
        .oneshot(post_request(&format!("/orders/{order_id}/dispatch")))
        .await
        .unwrap();
    let result = body_json(res).await;
    assert_eq!(result["success"], true);

    let res = app
        .clone()
        .oneshot(post_request(&format!("/orders/{order_id}/cancel")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cancelled = body_json(res).await;
    assert_eq!(cancelled["status"], "cancelled");
    assert!(cancelled["assigned_rider"].is_null());

    let res = app.oneshot(get_request("/riders")).await.unwrap();
    let riders = body_json(res).await;
    let released = riders
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["id"] == rider_id.as_str())
        .unwrap();
    assert_eq!(released["available"], true);
    assert!(released["assigned_order"].is_null());
}

#[tokio::test]
async fn delivery_flow_frees_the_rider() {
    let (app, _rx) = setup();

    let rider = create_rider(&app, "R1", 25.31, 86.71).await;
    let rider_id = rider["id"].as_str().unwrap().to_string();

    let order = create_order_at(&app, 25.30, 86.70).await;
    let order_id = order["id"].as_str().unwrap();

    let res = app
        .clone()
        .oneshot(post_request(&format!("/orders/{order_id}/dispatch")))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["success"], true);

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/orders/{order_id}/status"),
            json!({ "status": "out_for_delivery" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/orders/{order_id}/status"),
            json!({ "status": "delivered" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let delivered = body_json(res).await;
    assert_eq!(delivered["status"], "delivered");
    assert_eq!(delivered["assigned_rider"], rider_id);

    let res = app.oneshot(get_request("/riders")).await.unwrap();
    let riders = body_json(res).await;
    let freed = riders
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["id"] == rider_id.as_str())
        .unwrap();
    assert_eq!(freed["available"], true);
    assert!(freed["assigned_order"].is_null());
}

#[tokio::test]
async fn skipping_out_for_delivery_returns_409() {
    let (app, _rx) = setup();

    let rider = create_rider(&app, "R1", 25.31, 86.71).await;
    let _ = rider;

    let order = create_order_at(&app, 25.30, 86.70).await;
    let order_id = order["id"].as_str().unwrap();

    let res = app
        .clone()
        .oneshot(post_request(&format!("/orders/{order_id}/dispatch")))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["success"], true);

    let res = app
        .oneshot(json_request(
            "PATCH",
            &format!("/orders/{order_id}/status"),
            json!({ "status": "delivered" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn queued_orders_are_dispatched_by_the_worker() {
    let (state, rx) = new_state();
    tokio::spawn(run_dispatch_worker(state.clone(), rx));
    let app = router(state.clone());

    let rider = create_rider(&app, "R1", 25.31, 86.71).await;
    let rider_id = rider["id"].as_str().unwrap().to_string();

    let order = create_order_at(&app, 25.30, 86.70).await;
    let order_id = order["id"].as_str().unwrap();

    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let res = app
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    let order = body_json(res).await;
    assert_eq!(order["status"], "preparing");
    assert_eq!(order["assigned_rider"], rider_id);
}
