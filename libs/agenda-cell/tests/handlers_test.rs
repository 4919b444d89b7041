use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use agenda_cell::router::agenda_routes;
use shared_utils::test_utils::TestConfig;

#[tokio::test]
async fn get_settings_returns_the_row_as_json() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/agenda_settings"))
        .and(query_param("professional_id", "eq.prof-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "set-1",
            "professional_id": "prof-1",
            "weekly_schedule": {},
            "slot_duration_minutes": 30,
            "external_sync_enabled": false,
            "external_sync_types": [],
            "feed_token": "feed-token-1",
            "feed_enabled": false
        }])))
        .mount(&server)
        .await;

    let app = agenda_routes(TestConfig::with_store(&server.uri()).to_arc());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/professionals/prof-1/settings")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["professional_id"], "prof-1");
    assert_eq!(value["slot_duration_minutes"], 30);
}

#[tokio::test]
async fn create_block_rejects_timed_block_without_times() {
    let server = MockServer::start().await;
    let app = agenda_routes(TestConfig::with_store(&server.uri()).to_arc());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/blocks")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "professional_id": "prof-1",
                        "start_date": "2024-06-10",
                        "is_all_day": false,
                        "reason": "Compromisso"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(value["error"].as_str().unwrap().contains("start and end times"));
}

#[tokio::test]
async fn delete_block_hits_the_store() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/schedule_blocks"))
        .and(query_param("id", "eq.blk-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let app = agenda_routes(TestConfig::with_store(&server.uri()).to_arc());

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/blocks/blk-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
