use std::fs;

use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, LOCATION},
        Method, Request, StatusCode,
    },
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use usergate_config::AppConfig;
use usergate_gateway::create_router;
use usergate_runtime::BackendServices;

const SEED: &str = r#"{
    "users": [
        { "username": "alice", "email": "alice@example.com", "password": "correct horse" },
        { "username": "mallory", "email": "mallory@example.com", "password": "correct horse", "blocked": true }
    ]
}"#;

struct TestApp {
    router: Router,
    _seed_dir: TempDir,
}

struct TestResponse {
    status: StatusCode,
    location: Option<String>,
    body: Value,
}

impl TestApp {
    async fn new() -> Self {
        let seed_dir = TempDir::new().expect("create temp dir");
        let seed_path = seed_dir.path().join("seed.json");
        fs::write(&seed_path, SEED).expect("write seed file");

        let services = BackendServices::initialise(&AppConfig::default(), Some(&seed_path))
            .await
            .expect("initialise backend services");

        Self {
            router: create_router(services.gateway_state()),
            _seed_dir: seed_dir,
        }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let body = match body {
            Some(json_body) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json_body).expect("serialize request body"))
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("router response");

        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };

        TestResponse {
            status,
            location,
            body,
        }
    }

    async fn login(&self, login: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/api/user/security/login",
            Some(json!({ "login": login, "password": "correct horse", "rememberMe": true })),
            None,
        )
        .await
    }
}

#[tokio::test]
async fn seeded_user_walks_through_session_lifecycle() {
    let app = TestApp::new().await;

    let response = app.login("alice@example.com").await;
    assert_eq!(response.status, StatusCode::OK);
    let token = response.body["token"]
        .as_str()
        .expect("token in login response")
        .to_string();

    let response = app
        .request(Method::GET, "/api/user/profile", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::FOUND);
    let own_profile = response.location.expect("profile redirect");

    let response = app
        .request(
            Method::POST,
            "/api/user/settings/profile",
            Some(json!({ "name": "Alice Liddell", "location": "Oxford" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::FOUND);

    let response = app.request(Method::GET, &own_profile, None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["name"], "Alice Liddell");
    assert_eq!(response.body["location"], "Oxford");

    let response = app
        .request(Method::GET, "/api/user/settings/networks", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["accounts"], json!([]));

    let response = app
        .request(Method::POST, "/api/user/security/logout", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!(true));

    let response = app
        .request(Method::GET, "/api/user/settings/networks", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn blocked_seed_user_cannot_log_in() {
    let app = TestApp::new().await;

    let response = app.login("mallory").await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body[0]["message"], "Your account has been blocked");
}

#[tokio::test]
async fn social_auth_is_unavailable_without_configured_clients() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/user/security/auth?authclient=github",
            Some(json!({ "code": "abc" })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
