use std::time::Duration;

use pretty_assertions::assert_eq;
use tracker_engine::{
    ClientSettings, FailureKind, LifecycleAction, ReqwestScrapingClient, ScrapingClient,
    SubmittedItem,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ReqwestScrapingClient {
    let settings = ClientSettings {
        base_url: server.uri(),
        auth_token: Some("placeholder-token".to_string()),
        ..ClientSettings::default()
    };
    ReqwestScrapingClient::new(&settings).expect("client")
}

#[tokio::test]
async fn lifecycle_actions_hit_their_endpoints() {
    let server = MockServer::start().await;
    for segment in ["pause", "resume", "stop", "retry"] {
        Mock::given(method("POST"))
            .and(path(format!("/scraping/w1/{segment}")))
            .and(header("authorization", "Bearer placeholder-token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("DELETE"))
        .and(path("/scraping/w1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    for action in [
        LifecycleAction::Pause,
        LifecycleAction::Resume,
        LifecycleAction::Stop,
        LifecycleAction::Retry,
        LifecycleAction::Delete,
    ] {
        client
            .dispatch("w1", action)
            .await
            .unwrap_or_else(|err| panic!("{action} failed: {err}"));
    }
}

#[tokio::test]
async fn non_success_status_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/scraping/w1/pause"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .dispatch("w1", LifecycleAction::Pause)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(500));
}

#[tokio::test]
async fn snapshot_is_decoded_from_camel_case() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scraping/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "batchId": "b1",
            "totalSites": 3,
            "completedSites": 1,
            "failedSites": 0,
            "pendingSites": 1,
            "activeSites": ["http://a.com"]
        })))
        .mount(&server)
        .await;

    let snapshot = client_for(&server)
        .current_snapshot()
        .await
        .expect("snapshot")
        .expect("job running");
    assert_eq!(snapshot.batch_id, "b1");
    assert_eq!(snapshot.total_sites, 3);
    assert_eq!(snapshot.active_sites, vec!["http://a.com".to_string()]);
    assert!(snapshot.failed_urls.is_empty());
}

#[tokio::test]
async fn idle_service_has_no_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scraping/current"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("null", "application/json"))
        .mount(&server)
        .await;

    let snapshot = client_for(&server).current_snapshot().await.expect("ok");
    assert_eq!(snapshot, None);
}

#[tokio::test]
async fn malformed_snapshot_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scraping/current"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>", "text/html"))
        .mount(&server)
        .await;

    let err = client_for(&server).current_snapshot().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Decode);
}

#[tokio::test]
async fn results_are_keyed_by_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scraping/results/b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "batchId": "b1",
            "results": {
                "http://a.com": { "success": true, "title": "Careers", "data": [{}, {}] },
                "http://b.com": { "success": false, "error": "blocked" }
            }
        })))
        .mount(&server)
        .await;

    let results = client_for(&server).fetch_results("b1").await.expect("results");
    let page = &results.results["http://a.com"];
    assert!(page.success);
    assert_eq!(page.title.as_deref(), Some("Careers"));
    assert_eq!(page.record_count(), 2);
    assert_eq!(results.results["http://b.com"].record_count(), 0);
    assert_eq!(results.results["http://b.com"].error.as_deref(), Some("blocked"));
}

#[tokio::test]
async fn submit_posts_urls_and_returns_items() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/scraping"))
        .and(body_json(serde_json::json!({ "urls": ["http://a.com"] })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "batchId": "b7",
            "items": [{ "id": "w9", "url": "http://a.com" }]
        })))
        .mount(&server)
        .await;

    let response = client_for(&server)
        .submit(&["http://a.com".to_string()])
        .await
        .expect("submitted");
    assert_eq!(response.batch_id, "b7");
    assert_eq!(
        response.items,
        vec![SubmittedItem {
            id: "w9".to_string(),
            url: "http://a.com".to_string(),
        }]
    );
}

#[tokio::test]
async fn slow_service_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/scraping/w1/stop"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(250)))
        .mount(&server)
        .await;

    let settings = ClientSettings {
        base_url: server.uri(),
        request_timeout: Duration::from_millis(50),
        ..ClientSettings::default()
    };
    let client = ReqwestScrapingClient::new(&settings).unwrap();

    let err = client.dispatch("w1", LifecycleAction::Stop).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}
