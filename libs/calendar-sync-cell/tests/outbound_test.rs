use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use calendar_sync_cell::models::{SyncEventEnvelope, SyncOutcome};
use calendar_sync_cell::services::CalendarSyncService;
use shared_utils::test_utils::TestConfig;

fn appointment(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "professional_id": "prof-1",
        "professional_name": "Dra. Ana Costa",
        "patient_id": "pat-1",
        "patient_name": "Maria Silva",
        "phone": "+5511999999999",
        "date": "2024-06-10",
        "start_time": "09:00",
        "tipo": "consulta",
        "status": "agendado",
        "reminder_sent": false,
        "followup_sent": false
    })
}

fn envelope(event_type: &str, data: Option<serde_json::Value>, old: Option<serde_json::Value>) -> SyncEventEnvelope {
    serde_json::from_value(json!({
        "event": { "type": event_type },
        "data": data,
        "old_data": old
    }))
    .unwrap()
}

async fn mount_token(external: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/token"))
        .and(query_param("professional_id", "prof-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "operator-token"
        })))
        .mount(external)
        .await;
}

fn sync_config(store: &MockServer, external: &MockServer) -> shared_config::AppConfig {
    TestConfig::with_store(&store.uri())
        .calendar_token(&format!("{}/token", external.uri()))
        .google_api(&external.uri())
        .to_app_config()
}

#[tokio::test]
async fn create_posts_the_event_and_writes_back_the_remote_id() {
    let store = MockServer::start().await;
    let external = MockServer::start().await;
    mount_token(&external).await;

    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .and(body_partial_json(json!({
            "summary": "Consulta: Maria Silva",
            "start": {
                "dateTime": "2024-06-10T09:00:00-03:00",
                "timeZone": "America/Sao_Paulo"
            },
            "end": {
                // No end_time on the appointment: start + 30 minutes
                "dateTime": "2024-06-10T09:30:00-03:00"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "evt-123" })))
        .expect(1)
        .mount(&external)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/agendamentos"))
        .and(query_param("id", "eq.apt-1"))
        .and(body_partial_json(json!({ "external_event_id": "evt-123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "apt-1" }])))
        .expect(1)
        .mount(&store)
        .await;

    let service = CalendarSyncService::new(&sync_config(&store, &external));
    let outcome = service
        .handle_event(envelope("create", Some(appointment("apt-1")), None))
        .await
        .unwrap();

    assert_matches!(outcome, SyncOutcome::Created { external_event_id } if external_event_id == "evt-123");
}

#[tokio::test]
async fn update_without_tracked_changes_makes_zero_remote_calls() {
    let store = MockServer::start().await;
    let external = MockServer::start().await;

    // Only the sent-flag changed; summary/time/status fields are identical
    let mut new_data = appointment("apt-1");
    new_data["reminder_sent"] = json!(true);
    new_data["external_event_id"] = json!("evt-123");
    let mut old_data = appointment("apt-1");
    old_data["external_event_id"] = json!("evt-123");

    let service = CalendarSyncService::new(&sync_config(&store, &external));
    let outcome = service
        .handle_event(envelope("update", Some(new_data), Some(old_data)))
        .await
        .unwrap();

    assert_matches!(outcome, SyncOutcome::Skipped { .. });
    assert!(external.received_requests().await.unwrap().is_empty());
    assert!(store.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn status_change_is_tracked_and_patches_the_remote_event() {
    let store = MockServer::start().await;
    let external = MockServer::start().await;
    mount_token(&external).await;

    let mut old_data = appointment("apt-1");
    old_data["external_event_id"] = json!("evt-123");
    let mut new_data = old_data.clone();
    new_data["status"] = json!("realizado");

    Mock::given(method("PATCH"))
        .and(path("/calendars/primary/events/evt-123"))
        .and(body_partial_json(json!({
            "description": "Tipo: consulta\nStatus: realizado"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&external)
        .await;

    let service = CalendarSyncService::new(&sync_config(&store, &external));
    let outcome = service
        .handle_event(envelope("update", Some(new_data), Some(old_data)))
        .await
        .unwrap();

    assert_matches!(outcome, SyncOutcome::Updated);
    // The synchronizer never touches the store on a plain update
    assert!(store.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn update_without_any_remote_id_repairs_by_creating() {
    let store = MockServer::start().await;
    let external = MockServer::start().await;
    mount_token(&external).await;

    let old_data = appointment("apt-1");
    let mut new_data = appointment("apt-1");
    new_data["status"] = json!("realizado");

    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "evt-new" })))
        .expect(1)
        .mount(&external)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/agendamentos"))
        .and(query_param("id", "eq.apt-1"))
        .and(body_partial_json(json!({ "external_event_id": "evt-new" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "apt-1" }])))
        .expect(1)
        .mount(&store)
        .await;

    let service = CalendarSyncService::new(&sync_config(&store, &external));
    let outcome = service
        .handle_event(envelope("update", Some(new_data), Some(old_data)))
        .await
        .unwrap();

    assert_matches!(outcome, SyncOutcome::Created { external_event_id } if external_event_id == "evt-new");
}

#[tokio::test]
async fn update_falls_back_to_the_old_remote_id() {
    let store = MockServer::start().await;
    let external = MockServer::start().await;
    mount_token(&external).await;

    let mut old_data = appointment("apt-1");
    old_data["external_event_id"] = json!("evt-old");
    let mut new_data = appointment("apt-1");
    new_data["status"] = json!("realizado");

    Mock::given(method("PATCH"))
        .and(path("/calendars/primary/events/evt-old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&external)
        .await;

    let service = CalendarSyncService::new(&sync_config(&store, &external));
    let outcome = service
        .handle_event(envelope("update", Some(new_data), Some(old_data)))
        .await
        .unwrap();

    assert_matches!(outcome, SyncOutcome::Updated);
}

#[tokio::test]
async fn delete_issues_exactly_one_remote_delete() {
    let store = MockServer::start().await;
    let external = MockServer::start().await;
    mount_token(&external).await;

    let mut old_data = appointment("apt-1");
    old_data["external_event_id"] = json!("evt-123");

    Mock::given(method("DELETE"))
        .and(path("/calendars/primary/events/evt-123"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&external)
        .await;

    let service = CalendarSyncService::new(&sync_config(&store, &external));
    let outcome = service
        .handle_event(envelope("delete", None, Some(old_data)))
        .await
        .unwrap();

    assert_matches!(outcome, SyncOutcome::Deleted);
}

#[tokio::test]
async fn delete_of_an_unsynced_appointment_is_a_no_op() {
    let store = MockServer::start().await;
    let external = MockServer::start().await;

    let service = CalendarSyncService::new(&sync_config(&store, &external));
    let outcome = service
        .handle_event(envelope("delete", None, Some(appointment("apt-1"))))
        .await
        .unwrap();

    assert_matches!(outcome, SyncOutcome::Skipped { .. });
    assert!(external.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_token_turns_sync_into_a_logged_no_op() {
    let store = MockServer::start().await;
    let external = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": null })))
        .mount(&external)
        .await;

    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "evt-1" })))
        .expect(0)
        .mount(&external)
        .await;

    let service = CalendarSyncService::new(&sync_config(&store, &external));
    let outcome = service
        .handle_event(envelope("create", Some(appointment("apt-1")), None))
        .await
        .unwrap();

    assert_matches!(outcome, SyncOutcome::Skipped { .. });
}

#[tokio::test]
async fn upstream_failure_is_surfaced_without_retry() {
    let store = MockServer::start().await;
    let external = MockServer::start().await;
    mount_token(&external).await;

    let mut old_data = appointment("apt-1");
    old_data["external_event_id"] = json!("evt-123");
    let mut new_data = old_data.clone();
    new_data["status"] = json!("realizado");

    Mock::given(method("PATCH"))
        .and(path("/calendars/primary/events/evt-123"))
        .respond_with(ResponseTemplate::new(410).set_body_string("Gone"))
        .expect(1)
        .mount(&external)
        .await;

    let service = CalendarSyncService::new(&sync_config(&store, &external));
    let err = service
        .handle_event(envelope("update", Some(new_data), Some(old_data)))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("410"));
}
