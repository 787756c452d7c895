//! Detail fetch classification and session validation over HTTP

use crate::common::{site_for, MARKER_PAGE};
use std::time::Duration;
use tender_harvest::crawler::{DetailSource, FetchError, HttpDetailSource};
use tender_harvest::session::{validate_session, Credential};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credential() -> Credential {
    vec![
        ("__jsl_clearance_s".to_string(), "token".to_string()),
        ("JSESSIONID".to_string(), "abc".to_string()),
    ]
    .into_iter()
    .collect()
}

fn source(max_retries: u32) -> HttpDetailSource {
    HttpDetailSource::new(
        reqwest::Client::new(),
        &credential(),
        521,
        max_retries,
        Duration::from_millis(1),
    )
}

#[tokio::test]
async fn test_fetch_sends_credential() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/detail/1.html"))
        .and(header("cookie", "JSESSIONID=abc; __jsl_clearance_s=token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h2>ok</h2>"))
        .expect(1)
        .mount(&server)
        .await;

    let body = source(3)
        .fetch(&format!("{}/detail/1.html", server.uri()))
        .await
        .unwrap();
    assert_eq!(body, "<h2>ok</h2>");
}

#[tokio::test]
async fn test_challenge_status_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(521))
        .expect(1)
        .mount(&server)
        .await;

    let err = source(3)
        .fetch(&format!("{}/detail/1.html", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::CredentialInvalid { status: 521 });
}

#[tokio::test]
async fn test_server_error_exhausts_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let err = source(3)
        .fetch(&format!("{}/detail/1.html", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        FetchError::HttpStatus {
            status: 500,
            attempts: 3
        }
    );
}

#[tokio::test]
async fn test_server_error_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("third time"))
        .mount(&server)
        .await;

    let body = source(3)
        .fetch(&format!("{}/detail/1.html", server.uri()))
        .await
        .unwrap();
    assert_eq!(body, "third time");
}

#[tokio::test]
async fn test_timeout_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(50))
        .build()
        .unwrap();
    let source = HttpDetailSource::new(client, &credential(), 521, 2, Duration::from_millis(1));

    let err = source
        .fetch(&format!("{}/detail/1.html", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FetchError::TransientFetchError { attempts: 2, .. }
    ));
}

#[tokio::test]
async fn test_validate_session_accepts_marker_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jyxx/transaction_detail.html"))
        .and(header("cookie", "JSESSIONID=abc; __jsl_clearance_s=token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MARKER_PAGE))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    assert!(validate_session(&client, &site_for(&server.uri()), &credential()).await);
}

#[tokio::test]
async fn test_validate_session_rejects_challenge() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(521).set_body_string("<script>document.cookie=...</script>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    assert!(!validate_session(&client, &site_for(&server.uri()), &credential()).await);
}

#[tokio::test]
async fn test_validate_session_rejects_page_without_marker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<title>Please wait</title>"))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    assert!(!validate_session(&client, &site_for(&server.uri()), &credential()).await);
}
