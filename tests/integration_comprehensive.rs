//! End-to-end tests of the session protocol against a wiremock server.
//!
//! These tests verify:
//! - Fresh sessions never log in
//! - A 403 leads to exactly one login and one replay carrying the new cookie
//! - Rejected credentials surface the final 403 unchanged
//! - Metrics queries keep parameter order on the wire
//! - Metrics discovery recovers from the HTML login page once

use calamari_client::{
    AuthState, CalamariApi, CalamariClient, ClientV1, ClientV2, Error, MetricsQuerying,
    SessionConfig,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Test Helpers
// ============================================================================

fn config(server: &MockServer) -> SessionConfig {
    SessionConfig::builder(server.uri(), "admin", "s3cret")
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

fn v2_client(server: &MockServer) -> ClientV2 {
    ClientV2::new(config(server)).unwrap()
}

async fn mount_login(server: &MockServer, api_version: &str, status: u16, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(format!("/api/{}/auth/login", api_version)))
        .and(body_string_contains("username=admin"))
        .and(body_string_contains("password=s3cret"))
        .respond_with(
            ResponseTemplate::new(status)
                .insert_header("set-cookie", "sessionid=abc123; Path=/")
                .set_body_json(json!({})),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_forbidden_once(server: &MockServer, http_method: &str, endpoint: &str) {
    Mock::given(method(http_method))
        .and(path(endpoint))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"detail": "Authentication credentials were not provided."})),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(server)
        .await;
}

// ============================================================================
// Session Protocol Tests
// ============================================================================

#[tokio::test]
async fn test_fresh_session_returns_body_without_login() {
    let server = MockServer::start().await;
    mount_login(&server, "v2", 200, 0).await;

    Mock::given(method("GET"))
        .and(path("/api/v2/cluster/1/osd"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 0, "up": true}])))
        .expect(1)
        .mount(&server)
        .await;

    let client = v2_client(&server);
    let osds = client.cluster_osd_list("1").await.unwrap();

    assert_eq!(osds[0]["up"], true);
    assert_eq!(client.session().auth_state().await, AuthState::Unauthenticated);
}

#[tokio::test]
async fn test_stale_session_reauthenticates_once_and_replays_with_cookie() {
    let server = MockServer::start().await;
    mount_login(&server, "v2", 200, 1).await;
    mount_forbidden_once(&server, "GET", "/api/v2/cluster").await;

    Mock::given(method("GET"))
        .and(path("/api/v2/cluster"))
        .and(header("cookie", "sessionid=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "fsid-1"}])))
        .expect(1)
        .mount(&server)
        .await;

    let client = v2_client(&server);
    let clusters = client.cluster_list().await.unwrap();

    assert_eq!(clusters[0]["id"], "fsid-1");
    assert_eq!(client.session().auth_state().await, AuthState::Authenticated);
}

#[tokio::test]
async fn test_replayed_post_keeps_its_body() {
    let server = MockServer::start().await;
    mount_login(&server, "v2", 200, 1).await;
    mount_forbidden_once(&server, "POST", "/api/v2/cluster/fsid-1/cli").await;

    Mock::given(method("POST"))
        .and(path("/api/v2/cluster/fsid-1/cli"))
        .and(body_string_contains(r#""command":"status""#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"out": "HEALTH_OK", "status": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let client = v2_client(&server);
    let result = client.cli("fsid-1", "status").await.unwrap();

    assert_eq!(result["out"], "HEALTH_OK");
}

#[tokio::test]
async fn test_rejected_credentials_surface_final_403() {
    let server = MockServer::start().await;
    mount_login(&server, "v1", 401, 1).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/cluster"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "denied"})))
        .expect(2)
        .mount(&server)
        .await;

    let client = ClientV1::new(config(&server)).unwrap();
    let response = client.session().get("api/v1/cluster", Vec::new()).await.unwrap();

    assert_eq!(response.status, 403);
    assert_eq!(client.session().auth_state().await, AuthState::Unauthenticated);
}

#[tokio::test]
async fn test_api_get_fails_on_403_after_retry() {
    let server = MockServer::start().await;
    mount_login(&server, "v1", 401, 1).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/cluster/fsid-1/space"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "denied"})))
        .expect(2)
        .mount(&server)
        .await;

    let client = ClientV1::new(config(&server)).unwrap();
    let err = client.cluster_space("fsid-1").await.unwrap_err();

    assert!(matches!(err, Error::Status { status: 403, .. }));
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start().await;
    mount_login(&server, "v2", 200, 0).await;

    Mock::given(method("GET"))
        .and(path("/api/v2/event"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = v2_client(&server).event_list().await.unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_explicit_login_then_logout() {
    let server = MockServer::start().await;
    mount_login(&server, "v2", 200, 1).await;

    Mock::given(method("POST"))
        .and(path("/api/v2/auth/logout"))
        .and(header("cookie", "sessionid=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = CalamariClient::v2(config(&server)).unwrap();
    client.authenticate().await.unwrap();
    assert_eq!(client.session().auth_state().await, AuthState::Authenticated);

    client.logout().await.unwrap();
    assert_eq!(client.session().auth_state().await, AuthState::Unauthenticated);
}

#[tokio::test]
async fn test_request_list_with_state() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/request"))
        .and(query_param("state", "submitted"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 0, "results": []})))
        .expect(1)
        .mount(&server)
        .await;

    let requests = v2_client(&server)
        .request_list(Some(calamari_client::RequestState::Submitted))
        .await
        .unwrap();
    assert_eq!(requests["count"], 0);
}

// ============================================================================
// Metrics Tests
// ============================================================================

#[tokio::test]
async fn test_render_sends_targets_in_order() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/graphite/render/"))
        .and(query_param("format", "json-array"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "targets": ["servers.n1.loadavg.01", "servers.n1.loadavg.05", "servers.n1.loadavg.15"],
            "datapoints": [[1453947000, 0.5, 0.4, 0.3], [1453947060, null, 0.4, 0.3]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = v2_client(&server);
    let series = client.metrics().server_loadavg_data("n1", "-3d").await.unwrap();

    assert_eq!(series.targets.len(), 3);
    assert_eq!(series.latest(0), Some(0.5));

    let received = server.received_requests().await.unwrap();
    let pairs: Vec<(String, String)> = received[0]
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let expected: Vec<(String, String)> = [
        ("target", "servers.n1.loadavg.01"),
        ("target", "servers.n1.loadavg.05"),
        ("target", "servers.n1.loadavg.15"),
        ("from", "-3d"),
        ("format", "json-array"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    assert_eq!(pairs, expected);
}

#[tokio::test]
async fn test_metrics_find_recovers_from_login_page() {
    let server = MockServer::start().await;
    mount_login(&server, "v1", 200, 1).await;

    Mock::given(method("GET"))
        .and(path("/graphite/metrics/find"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><form id=\"login\"></form></html>"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/graphite/metrics/find"))
        .and(query_param("query", "servers.n1.network.*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "servers.n1.network.eth0", "text": "eth0", "leaf": 0, "expandable": 1},
            {"id": "servers.n1.network.lo", "text": "lo", "leaf": 0, "expandable": 1}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = CalamariClient::v1(config(&server)).unwrap();
    let nics = client.metrics().server_nics("n1").await.unwrap();

    let ids: Vec<&str> = nics.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["servers.n1.network.eth0", "servers.n1.network.lo"]);
}

#[tokio::test]
async fn test_metrics_find_gives_up_after_one_retry() {
    let server = MockServer::start().await;
    mount_login(&server, "v2", 200, 1).await;

    Mock::given(method("GET"))
        .and(path("/graphite/metrics/find"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .expect(2)
        .mount(&server)
        .await;

    let err = v2_client(&server)
        .metrics()
        .graphite_metrics_find("servers.*")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Decode { .. }));
}
