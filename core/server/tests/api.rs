//! Router tests against a mock Drive API.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use docdrive_server::{router, AppState};
use docdrive_storage::gdrive::{AuthConfig, Tokens};
use docdrive_storage::{
    CredentialManager, CredentialSource, DeferredConsent, DriveClient, DriveClientConfig,
    TokenStore,
};

struct Harness {
    server: MockServer,
    app: axum::Router,
    _dir: tempfile::TempDir,
}

async fn harness(token: Option<&str>) -> Harness {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let store = TokenStore::new(dir.path().join("token.json"));

    if let Some(access) = token {
        store
            .save(&Tokens {
                access_token: access.to_string(),
                refresh_token: None,
                expires_at: Utc::now() + Duration::hours(1),
            })
            .await
            .unwrap();
    }

    let source = CredentialSource::Installed {
        auth: AuthConfig {
            token_url: format!("{}/token", server.uri()),
            ..AuthConfig::new("client", "secret")
        },
        store,
    };
    let credentials =
        CredentialManager::new(source, Arc::new(DeferredConsent::new("/auth/login"))).unwrap();
    let drive = DriveClient::new(
        Arc::new(credentials),
        DriveClientConfig {
            api_base: server.uri(),
            ..Default::default()
        },
    )
    .unwrap();

    Harness {
        server,
        app: router(Arc::new(AppState::new(drive))),
        _dir: dir,
    }
}

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn drive_file(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "mimeType": "application/pdf",
        "size": "2048",
        "createdTime": "2024-01-01T00:00:00Z",
        "modifiedTime": "2024-01-02T00:00:00Z"
    })
}

#[tokio::test]
async fn root_and_health() {
    let h = harness(None).await;

    let (status, body) = get(&h.app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "ok");

    let (status, body) = get(&h.app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn list_files_defaults_to_ten() {
    let h = harness(Some("live")).await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("pageSize", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [drive_file("a", "invoice_001.pdf")]
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let (status, body) = get(&h.app, "/drive/files").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], "a");
    assert_eq!(body[0]["type"], "file");
    assert_eq!(body[0]["size"], 2048);
}

#[tokio::test]
async fn page_size_out_of_range_is_bad_request() {
    let h = harness(Some("live")).await;

    let (status, body) = get(&h.app, "/drive/files?page_size=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_request_error");

    let (status, _) = get(&h.app, "/drive/search?query=x&page_size=5000").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_forwards_query() {
    let h = harness(Some("live")).await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("q", "name contains 'receipt'"))
        .and(query_param("pageSize", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [drive_file("r", "receipt_may.pdf")]
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let (status, body) = get(
        &h.app,
        "/drive/search?query=name%20contains%20%27receipt%27&page_size=3",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "receipt_may.pdf");
}

#[tokio::test]
async fn metadata_classifies_document() {
    let h = harness(Some("live")).await;
    Mock::given(method("GET"))
        .and(path("/files/doc-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(drive_file("doc-1", "請求書_B社.pdf")),
        )
        .mount(&h.server)
        .await;

    let (status, body) = get(&h.app, "/drive/files/doc-1/metadata").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "invoice");
    assert_eq!(body["created_at"], "2024-01-01T00:00:00Z");
    assert_eq!(body["tags"], json!([]));
    assert_eq!(body["client_name"], Value::Null);
}

#[tokio::test]
async fn metadata_for_unknown_file_is_not_found() {
    let h = harness(Some("live")).await;
    Mock::given(method("GET"))
        .and(path("/files/nope"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": 404, "message": "File not found: nope."}
        })))
        .mount(&h.server)
        .await;

    let (status, body) = get(&h.app, "/drive/files/nope/metadata").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "File not found: nope.");
}

#[tokio::test]
async fn files_by_type_filters() {
    let h = harness(Some("live")).await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [
                drive_file("1", "契約書_A社.docx"),
                drive_file("2", "invoice.pdf"),
                drive_file("3", "Contract_final.pdf")
            ]
        })))
        .mount(&h.server)
        .await;

    let (status, body) = get(&h.app, "/drive/files/type/contract").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["1", "3"]);

    let (status, _) = get(&h.app, "/drive/files/type/memo").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_credential_is_unauthorized() {
    let h = harness(None).await;

    let (status, body) = get(&h.app, "/drive/files").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("/auth/login"));
}

#[tokio::test]
async fn provider_failure_is_bad_gateway() {
    let h = harness(Some("live")).await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .mount(&h.server)
        .await;

    let (status, body) = get(&h.app, "/drive/files").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("backend error"));
}

#[tokio::test]
async fn login_redirects_to_consent_page() {
    let h = harness(None).await;

    let response = h
        .app
        .clone()
        .oneshot(Request::builder().uri("/auth/login").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers()["location"].to_str().unwrap();
    assert!(location.contains("accounts.google.com"));
    assert!(location.contains("drive.readonly"));
}

#[tokio::test]
async fn redirect_without_pending_login_is_rejected() {
    let h = harness(None).await;

    let (status, _) = get(&h.app, "/oauth2-redirect?code=abc&state=forged").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get(&h.app, "/oauth2-redirect?state=only").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&h.app, "/oauth2-redirect?error=access_denied").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_query_uses_error_envelope() {
    let h = harness(Some("live")).await;

    let (status, body) = get(&h.app, "/drive/files?page_size=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_request_error");
    assert_eq!(body["error"]["code"], "invalid_parameter");

    let (status, body) = get(&h.app, "/drive/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_request_error");

    let (status, body) = get(&h.app, "/drive/files/type/invoice?page_size=ten").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn forged_callback_does_not_cancel_login() {
    let h = harness(None).await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "granted",
            "token_type": "Bearer",
            "expires_in": 3599,
            "refresh_token": "refresh"
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let response = h
        .app
        .clone()
        .oneshot(Request::builder().uri("/auth/login").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let location = response.headers()["location"].to_str().unwrap().to_string();
    let state = url::Url::parse(&location)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap();

    let (status, _) = get(&h.app, "/oauth2-redirect?code=x&state=junk").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = get(
        &h.app,
        &format!("/oauth2-redirect?code=real&state={}", state),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "authenticated");
}
