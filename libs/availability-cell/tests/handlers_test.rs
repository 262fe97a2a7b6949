use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use availability_cell::{availability_routes, AvailabilityState, NoCalendar};
use shared_database::{InMemoryStore, SupabaseClient};
use shared_utils::test_utils::{at, TestClinic, TestConfig};

const SERVICE: &str = "service-x";

fn app(store: Arc<InMemoryStore>) -> Router {
    let state = AvailabilityState::new(TestConfig::default().to_arc(), store.clone(), store, Arc::new(NoCalendar));
    availability_routes(state)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_get_availability_returns_slots() {
    let clinic = TestClinic::default();
    let store = clinic.seeded_store(SERVICE, &["anna", "ben"]).await;
    let date = chrono::NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
    store.insert_booking(clinic.confirmed_booking(Some("anna"), at(date, 10, 0), at(date, 11, 0))).await;

    let response = app(store)
        .oneshot(
            Request::builder()
                .uri(format!("/availability?date=2025-06-10&clinic_id={}&service_id={}", clinic.id, SERVICE))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let slots = body["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 9);
    assert_eq!(slots[0]["time"], "09:00");
    assert_eq!(slots[1]["time"], "10:00");
    assert_eq!(slots[1]["available"], true);
    assert_eq!(slots[1]["available_specialists"], 1);
}

#[tokio::test]
async fn test_invalid_date_is_a_validation_error() {
    let store = TestClinic::default().seeded_store(SERVICE, &["anna"]).await;

    let response = app(store)
        .oneshot(Request::builder().uri("/availability?date=June-10").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_unreachable_database_is_a_server_error() {
    let store = TestClinic::default().seeded_store(SERVICE, &["anna"]).await;
    // Nothing listens on this port.
    let bookings = Arc::new(SupabaseClient::new(&TestConfig::with_supabase_url("http://127.0.0.1:9").to_app_config()));
    let state = AvailabilityState::new(TestConfig::default().to_arc(), bookings, store, Arc::new(NoCalendar));

    let response = availability_routes(state)
        .oneshot(
            Request::builder()
                .uri(format!("/availability?date=2025-06-10&service_id={}", SERVICE))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"], "SERVER_ERROR");
    assert_eq!(body["message"], "Internal server error");
}

#[tokio::test]
async fn test_cors_preflight_is_allowed() {
    let store = TestClinic::default().seeded_store(SERVICE, &["anna"]).await;

    let response = app(store)
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/availability")
                .header("origin", "https://clinic.example")
                .header("access-control-request-method", "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
