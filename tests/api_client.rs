//! Request client behaviour against a live mock backend.

mod common;

use std::time::{Duration, Instant};

use common::mock_backend::{MockBackend, MockResponse};
use common::{api_for, test_config};
use serde_json::json;
use teacher_panel::api::{ApiClient, RequestOptions, TeacherApi};
use teacher_panel::ApiError;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn get_5xx_is_retried_once_after_delay() {
    let mock = MockBackend::start().await;
    mock.route("/groups/list.php", MockResponse::error(500, "Database down"))
        .await;

    let err = api_for(&mock).groups(None).await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), "Database down");

    let requests = mock.requests_to("/groups/list.php").await;
    assert_eq!(requests.len(), 2, "one retry for GET on 5xx");
    let gap = requests[1].at.duration_since(requests[0].at);
    assert!(gap >= Duration::from_millis(50), "retry waited {:?}", gap);
}

#[tokio::test]
async fn get_recovers_when_retry_succeeds() {
    let mock = MockBackend::start().await;
    mock.route("/groups/list.php", MockResponse::error(503, "Busy"))
        .await;
    mock.route(
        "/groups/list.php",
        MockResponse::json(r#"{"ok": true, "groups": [{"id": 1, "name": "Math", "code": "M1"}]}"#),
    )
    .await;

    let groups = api_for(&mock).groups(None).await.unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "Math");
    assert_eq!(mock.captured_requests().await.len(), 2);
}

#[tokio::test]
async fn post_5xx_is_never_retried() {
    let mock = MockBackend::start().await;
    mock.route("/groups/create.php", MockResponse::error(500, "Insert failed"))
        .await;

    let err = api_for(&mock).create_group("Chemistry").await.unwrap_err();

    assert_eq!(err.to_string(), "Insert failed");
    let requests = mock.captured_requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].json()["name"], "Chemistry");
}

#[tokio::test]
async fn get_4xx_is_not_retried() {
    let mock = MockBackend::start().await;
    mock.route("/auth/me.php", MockResponse::error(401, "Not authorized"))
        .await;

    let err = api_for(&mock).me(None).await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(err.to_string(), "Not authorized");
    assert_eq!(mock.captured_requests().await.len(), 1);
}

#[tokio::test]
async fn ok_false_on_200_is_an_error() {
    let mock = MockBackend::start().await;
    mock.route(
        "/groups/rotate_code.php",
        MockResponse::json(r#"{"ok": false, "message": "  Group not found  "}"#),
    )
    .await;

    let err = api_for(&mock).rotate_code(9).await.unwrap_err();

    assert_eq!(err.to_string(), "Group not found");
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn status_message_when_body_is_not_json() {
    let mock = MockBackend::start().await;
    mock.route("/auth/logout.php", MockResponse::html(502, "<h1>Bad Gateway</h1>"))
        .await;

    let err = api_for(&mock).logout().await.unwrap_err();

    assert_eq!(err.to_string(), "Request failed (502)");
    assert_eq!(err.status(), Some(502));
}

#[tokio::test]
async fn timeout_reports_timeout_not_network() {
    let mock = MockBackend::start().await;
    mock.route("/slow.php", MockResponse::default().with_delay(1_000))
        .await;

    let client = ApiClient::new(&test_config(&mock.base_url()).api).unwrap();
    let started = Instant::now();
    let err = client
        .request("/slow.php", RequestOptions::get().timeout_ms(100))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Timeout), "got {:?}", err);
    assert_eq!(err.to_string(), "Timeout or cancelled");
    assert!(started.elapsed() < Duration::from_millis(900));
    assert_eq!(mock.captured_requests().await.len(), 1, "timeouts are final");
}

#[tokio::test]
async fn cancel_token_aborts_in_flight_request() {
    let mock = MockBackend::start().await;
    mock.route("/auth/me.php", MockResponse::default().with_delay(1_000))
        .await;

    let api = api_for(&mock);
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = api.me(Some(token)).await.unwrap_err();

    assert!(matches!(err, ApiError::Timeout));
    assert!(started.elapsed() < Duration::from_millis(900));
}

#[tokio::test]
async fn unreachable_host_is_network_error_after_retry() {
    let base = format!("http://127.0.0.1:{}", common::free_port());
    let api = TeacherApi::from_config(&test_config(&base)).unwrap();

    let err = api.groups(None).await.unwrap_err();

    assert!(matches!(err, ApiError::Network { .. }), "got {:?}", err);
    assert!(err.to_string().starts_with("Network error"));
}

#[tokio::test]
async fn query_parameters_are_encoded() {
    let mock = MockBackend::start().await;
    mock.route("/groups/join_requests.php", MockResponse::json(&common::requests_json(&[11])))
        .await;

    let requests = api_for(&mock)
        .join_requests(3, teacher_panel::api::JoinStatus::Approved, None)
        .await
        .unwrap();

    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].name, "Student 11");
    let captured = mock.captured_requests().await;
    assert_eq!(captured[0].query.as_deref(), Some("group_id=3&status=approved"));
}

#[tokio::test]
async fn json_body_sets_content_type_unless_overridden() {
    let mock = MockBackend::start().await;
    let client = ApiClient::new(&test_config(&mock.base_url()).api).unwrap();

    client
        .request(
            "/plain.php",
            RequestOptions::post().json(&json!({ "a": 1 })).unwrap(),
        )
        .await
        .unwrap();
    client
        .request(
            "/custom.php",
            RequestOptions::post()
                .json(&json!({ "a": 1 }))
                .unwrap()
                .header("Content-Type", "application/json; charset=utf-8")
                .header("X-Client", "teacher-panel"),
        )
        .await
        .unwrap();

    let captured = mock.captured_requests().await;
    assert_eq!(captured[0].header("content-type"), Some("application/json"));
    assert_eq!(
        captured[1].header("content-type"),
        Some("application/json; charset=utf-8")
    );
    assert_eq!(captured[1].header("x-client"), Some("teacher-panel"));
}

#[tokio::test]
async fn session_cookie_is_sent_back() {
    let mock = MockBackend::start().await;
    let mut login = MockResponse::json(common::teacher_json());
    login
        .headers
        .push(("set-cookie".to_string(), "PHPSESSID=abc123; Path=/".to_string()));
    mock.route("/auth/login.php", login).await;
    mock.route("/auth/me.php", MockResponse::json(common::teacher_json()))
        .await;

    let api = api_for(&mock);
    api.login("dilnoza", "secret").await.unwrap();
    api.me(None).await.unwrap();

    let me = mock.requests_to("/auth/me.php").await;
    let cookie = me[0].header("cookie").unwrap_or("");
    assert!(cookie.contains("PHPSESSID=abc123"), "cookie header: {:?}", cookie);
}

#[tokio::test]
async fn explicit_failure_with_object_message_is_an_error() {
    let mock = MockBackend::start().await;
    mock.route(
        "/groups/approve_student.php",
        MockResponse::json(r#"{"ok": false, "message": {"uz": "Xato"}}"#),
    )
    .await;

    let err = api_for(&mock).approve_student(3, 11).await.unwrap_err();

    assert_eq!(err.to_string(), "Request failed");
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn logout_posts_without_a_body() {
    let mock = MockBackend::start().await;

    api_for(&mock).logout().await.unwrap();

    let logout = mock.requests_to("/auth/logout.php").await;
    assert_eq!(logout.len(), 1);
    assert_eq!(logout[0].method, "POST");
    assert!(logout[0].body.is_empty());
    assert_eq!(logout[0].header("content-type"), None);
}

#[tokio::test]
async fn clearing_an_override_sends_null_score() {
    let mock = MockBackend::start().await;
    let api = api_for(&mock);

    api.override_grade(4, Some(18.5), Some("Well argued")).await.unwrap();
    api.override_grade(4, None, None).await.unwrap();

    let sent = mock.requests_to("/submissions/override.php").await;
    assert_eq!(sent[0].json()["teacher_score"], 18.5);
    assert_eq!(sent[0].json()["teacher_feedback"], "Well argued");
    assert!(sent[1].json()["teacher_score"].is_null());
    assert_eq!(sent[1].json()["teacher_feedback"], "");
}

#[test]
fn invalid_config_is_rejected_before_any_request() {
    let err = TeacherApi::from_config(&test_config("ftp://127.0.0.1")).unwrap_err();

    assert!(matches!(err, ApiError::Config(_)), "got {:?}", err);
    assert!(err.to_string().starts_with("Configuration error"));
}
