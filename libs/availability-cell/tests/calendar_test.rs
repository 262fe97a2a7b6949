use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use availability_cell::{BusyScope, CalendarReader, GoogleCalendarReader};
use shared_utils::test_utils::at;

const TEST_PRIVATE_KEY: &str = include_str!("fixtures/service_account_key.pem");

fn service_account_json(token_uri: &str) -> String {
    json!({
        "type": "service_account",
        "client_email": "booking@clinic-test.iam.gserviceaccount.com",
        "private_key": TEST_PRIVATE_KEY,
        "token_uri": token_uri
    })
    .to_string()
}

fn reader_for(server: &MockServer, calendar_id: &str) -> GoogleCalendarReader {
    GoogleCalendarReader::new(&service_account_json(&format!("{}/token", server.uri())), calendar_id)
        .unwrap()
        .with_api_base(&server.uri())
}

fn tuesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
}

async fn mount_token(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"))
        .and(body_string_contains("assertion="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.test-token",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_lists_day_events_as_global_intervals() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, 1).await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(query_param("timeMin", "2025-06-10T00:00:00Z"))
        .and(query_param("timeMax", "2025-06-10T23:59:59Z"))
        .and(query_param("singleEvents", "true"))
        .and(header("authorization", "Bearer ya29.test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "summary": "Staff meeting",
                    "start": { "dateTime": "2025-06-10T14:00:00+03:00" },
                    "end": { "dateTime": "2025-06-10T15:30:00+03:00" }
                },
                {
                    "summary": "Broken event",
                    "start": { "dateTime": "2025-06-10T09:00:00Z" }
                }
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let reader = reader_for(&mock_server, "primary");
    let intervals = reader.busy_intervals("demo", tuesday()).await.unwrap();

    assert_eq!(intervals.len(), 1);
    assert_eq!(intervals[0].start, at(tuesday(), 14, 0));
    assert_eq!(intervals[0].end, at(tuesday(), 15, 30));
    assert_eq!(intervals[0].scope, BusyScope::Global);
}

#[tokio::test]
async fn test_all_day_event_uses_date_bounds() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, 1).await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                { "start": { "date": "2025-06-10" }, "end": { "date": "2025-06-11" } }
            ]
        })))
        .mount(&mock_server)
        .await;

    let reader = reader_for(&mock_server, "primary");
    let intervals = reader.busy_intervals("demo", tuesday()).await.unwrap();

    assert_eq!(intervals.len(), 1);
    assert_eq!(intervals[0].start, at(tuesday(), 0, 0));
    assert_eq!(intervals[0].end, at(NaiveDate::from_ymd_opt(2025, 6, 11).unwrap(), 0, 0));
}

#[tokio::test]
async fn test_access_token_is_reused_between_reads() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, 1).await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let reader = reader_for(&mock_server, "primary");
    assert!(reader.busy_intervals("demo", tuesday()).await.unwrap().is_empty());
    assert!(reader.busy_intervals("demo", tuesday()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_calendar_id_is_path_encoded() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, 1).await;

    Mock::given(method("GET"))
        .and(path("/calendars/clinic%40group.calendar.google.com/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let reader = reader_for(&mock_server, "clinic@group.calendar.google.com");
    assert!(reader.busy_intervals("demo", tuesday()).await.is_ok());
}

#[tokio::test]
async fn test_token_exchange_failure_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .mount(&mock_server)
        .await;

    let reader = reader_for(&mock_server, "primary");
    assert!(reader.busy_intervals("demo", tuesday()).await.is_err());
}

#[tokio::test]
async fn test_events_failure_is_an_error() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, 1).await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&mock_server)
        .await;

    let reader = reader_for(&mock_server, "primary");
    assert!(reader.busy_intervals("demo", tuesday()).await.is_err());
}

#[tokio::test]
async fn test_oversized_token_lifetime_is_tolerated() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.test-token",
            "expires_in": u64::MAX,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let reader = reader_for(&mock_server, "primary");
    assert!(reader.busy_intervals("demo", tuesday()).await.unwrap().is_empty());
    assert!(reader.busy_intervals("demo", tuesday()).await.unwrap().is_empty());
}
