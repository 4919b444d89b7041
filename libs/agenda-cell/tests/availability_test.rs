use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use agenda_cell::models::UpdateSettingsRequest;
use agenda_cell::services::AvailabilityService;
use shared_utils::test_utils::TestConfig;

const PROF: &str = "prof-1";

fn settings_row() -> serde_json::Value {
    json!({
        "id": "set-1",
        "professional_id": PROF,
        "weekly_schedule": {
            "1": [
                { "start": "08:00", "end": "10:00", "tipo": "all" }
            ]
        },
        "slot_duration_minutes": 30,
        "external_sync_enabled": false,
        "external_sync_types": [],
        "feed_token": "feed-token-1",
        "feed_enabled": false
    })
}

async fn mount_settings(server: &MockServer, row: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/agenda_settings"))
        .and(query_param("professional_id", format!("eq.{}", PROF)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn settings_are_created_lazily_with_defaults() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/agenda_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/agenda_settings"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": "set-new",
            "professional_id": PROF,
            "weekly_schedule": {},
            "slot_duration_minutes": 30,
            "external_sync_enabled": false,
            "external_sync_types": [],
            "feed_token": "11111111-2222-3333-4444-555555555555",
            "feed_enabled": false
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let config = TestConfig::with_store(&server.uri()).to_app_config();
    let service = AvailabilityService::new(&config);

    let settings = service.get_or_create_settings(PROF).await.unwrap();
    assert_eq!(settings.professional_id, PROF);
    assert_eq!(settings.slot_duration_minutes, 30);
    assert!(!settings.external_sync_enabled);
    assert!(!settings.feed_token.is_empty());
}

#[tokio::test]
async fn existing_settings_are_returned_without_creating() {
    let server = MockServer::start().await;
    mount_settings(&server, settings_row()).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/agenda_settings"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let config = TestConfig::with_store(&server.uri()).to_app_config();
    let service = AvailabilityService::new(&config);

    let settings = service.get_or_create_settings(PROF).await.unwrap();
    assert_eq!(settings.id, "set-1");
    assert_eq!(settings.weekly_schedule.len(), 1);
}

#[tokio::test]
async fn update_rejects_inverted_intervals() {
    let server = MockServer::start().await;
    let config = TestConfig::with_store(&server.uri()).to_app_config();
    let service = AvailabilityService::new(&config);

    let request: UpdateSettingsRequest = serde_json::from_value(json!({
        "weekly_schedule": {
            "1": [ { "start": "10:00", "end": "08:00" } ]
        }
    }))
    .unwrap();

    let err = service.update_settings(PROF, request).await.unwrap_err();
    assert!(err.to_string().contains("before end"));
}

#[tokio::test]
async fn slots_skip_booked_and_blocked_windows() {
    let server = MockServer::start().await;
    mount_settings(&server, settings_row()).await;

    // 2024-06-10 is a Monday, matching schedule key "1"
    let date = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/agendamentos"))
        .and(query_param("professional_id", format!("eq.{}", PROF)))
        .and(query_param("date", "eq.2024-06-10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "apt-1",
            "professional_id": PROF,
            "professional_name": "Dra. Ana Costa",
            "patient_id": "pat-1",
            "patient_name": "Maria Silva",
            "date": "2024-06-10",
            "start_time": "08:30",
            "tipo": "consulta",
            "status": "agendado"
        }])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/schedule_blocks"))
        .and(query_param("professional_id", format!("eq.{}", PROF)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "blk-1",
            "professional_id": PROF,
            "start_date": "2024-06-10",
            "end_date": "2024-06-10",
            "start_time": "09:00",
            "end_time": "09:30",
            "is_all_day": false,
            "reason": "Reunião",
            "recurrence": "none"
        }])))
        .mount(&server)
        .await;

    let config = TestConfig::with_store(&server.uri()).to_app_config();
    let service = AvailabilityService::new(&config);

    let slots = service.available_slots(PROF, date, None).await.unwrap();
    let starts: Vec<String> = slots
        .iter()
        .map(|s| s.start_time.format("%H:%M").to_string())
        .collect();

    // 08:00 free, 08:30 booked, 09:00 blocked, 09:30 free
    assert_eq!(starts, vec!["08:00", "09:30"]);
}

#[tokio::test]
async fn slots_respect_interval_type_restriction() {
    let server = MockServer::start().await;

    let mut row = settings_row();
    row["weekly_schedule"] = json!({
        "1": [ { "start": "08:00", "end": "09:00", "tipo": "retorno" } ]
    });
    mount_settings(&server, row).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/agendamentos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/schedule_blocks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let config = TestConfig::with_store(&server.uri()).to_app_config();
    let service = AvailabilityService::new(&config);
    let date = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();

    let consulta = service.available_slots(PROF, date, Some("consulta")).await.unwrap();
    assert!(consulta.is_empty());

    let retorno = service.available_slots(PROF, date, Some("retorno")).await.unwrap();
    assert_eq!(retorno.len(), 2);
}

#[tokio::test]
async fn absent_weekday_is_fully_blocked() {
    let server = MockServer::start().await;
    mount_settings(&server, settings_row()).await;

    let config = TestConfig::with_store(&server.uri()).to_app_config();
    let service = AvailabilityService::new(&config);

    // 2024-06-11 is a Tuesday; the schedule only has Monday
    let date = NaiveDate::from_ymd_opt(2024, 6, 11).unwrap();
    let slots = service.available_slots(PROF, date, None).await.unwrap();
    assert!(slots.is_empty());
}
