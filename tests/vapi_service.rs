use serde_json::json;
use std::time::Duration;
use vapi_bridge::application::VapiService;
use vapi_bridge::config::ClientConfig;
use vapi_bridge::domain::errors::ApiError;
use vapi_bridge::domain::reports::HealthStatus;
use vapi_bridge::domain::request::ApiRequest;
use vapi_bridge::domain::resource::{ListParams, ResourceKind};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service_for(server: &MockServer) -> VapiService {
    let mut config = ClientConfig::new(server.uri(), "sk-test");
    config.retry.base_delay = Duration::from_millis(10);
    VapiService::new(&config, None).expect("service")
}

#[tokio::test]
async fn health_check_reports_healthy_with_latency() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assistant"))
        .and(query_param("limit", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let report = service_for(&server).health_check().await;

    assert_eq!(report.status, HealthStatus::Healthy);
    assert_eq!(report.status_code, 200);
    assert!(report.error.is_none());
    assert!(report.response_time_ms >= 50);
    assert!(report.response_time_ms < 500, "took {}ms", report.response_time_ms);
}

#[tokio::test]
async fn health_check_reports_unhealthy_with_status_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assistant"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .mount(&server)
        .await;

    let report = service_for(&server).health_check().await;

    assert_eq!(report.status, HealthStatus::Unhealthy);
    assert_eq!(report.status_code, 500);
    assert!(report.error.unwrap().contains("boom"));
}

#[tokio::test]
async fn fan_out_isolates_unknown_and_failed_kinds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assistant"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "a1"}, {"id": "a2"}])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/call"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid key"})))
        .mount(&server)
        .await;

    let results = service_for(&server)
        .fan_out_fetch(&["assistants", "calls", "bogus"])
        .await;

    assert_eq!(results.len(), 3);

    let assistants = &results["assistants"];
    assert!(assistants.success);
    assert_eq!(assistants.count, Some(2));

    let calls = &results["calls"];
    assert!(!calls.success);
    assert!(calls.error.as_ref().unwrap().contains("Invalid key"));

    let bogus = &results["bogus"];
    assert!(!bogus.success);
    assert!(bogus.data.is_none());
    assert_eq!(bogus.error.as_deref(), Some("Unknown resource kind: bogus"));
}

#[tokio::test]
async fn list_resource_is_idempotent_against_deterministic_stub() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/phone-number"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"number": "+15550100"}])))
        .expect(2)
        .mount(&server)
        .await;

    let service = service_for(&server);
    let first = service.list_resource(ResourceKind::PhoneNumbers, 10).await.unwrap();
    let second = service.list_resource(ResourceKind::PhoneNumbers, 10).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn list_resource_propagates_client_errors_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "Forbidden"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = service_for(&server)
        .list_resource_page(ResourceKind::Calls, ListParams::limit(5).with_offset(10))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ApiError::Client {
            status: 403,
            message: "Forbidden".to_string(),
        }
    );
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), Some("limit=5&offset=10"));
}

#[tokio::test]
async fn get_resource_fetches_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assistant/a-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "a-42"})))
        .expect(1)
        .mount(&server)
        .await;

    let data = service_for(&server)
        .get_resource(ResourceKind::Assistants, "a-42")
        .await
        .unwrap();
    assert_eq!(data["id"], "a-42");
}

#[tokio::test]
async fn enqueued_requests_all_settle_through_transport() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/call"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(7)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tool"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "bad tool"})))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(&server);
    let mut handles: Vec<_> = (0..7)
        .map(|_| service.enqueue(ApiRequest::get("/call")))
        .collect();
    handles.insert(3, service.enqueue(ApiRequest::get("/tool")));

    let results = futures::future::join_all(handles).await;

    assert_eq!(results.len(), 8);
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 7);
    assert_eq!(results[3].as_ref().unwrap_err().status_code(), 400);
}
