use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use usergate_auth::{hash_password, AuthClientCollection, ClientIdentity, StaticClient};
use usergate_config::{AuthConfig, AuthMethod};
use usergate_gateway::{create_router, GatewayState};
use usergate_users::{EventBus, MemoryDirectory, NewUser, Repositories, User, UserStore};

type TestResult<T = ()> = anyhow::Result<T>;

const PASSWORD: &str = "correct horse";

struct TestContext {
    directory: Arc<MemoryDirectory>,
    router: Router,
}

impl TestContext {
    fn new() -> Self {
        Self::with_config(AuthConfig::default())
    }

    fn with_config(config: AuthConfig) -> Self {
        let directory = Arc::new(MemoryDirectory::new());
        let repositories = Repositories::for_directory(directory.clone(), config.enable_session);
        let clients = AuthClientCollection::new().with_client(Arc::new(StaticClient::new(
            ClientIdentity::new("static", "remote-42")
                .with_email("remote@example.com")
                .with_username("remote"),
        )));
        let state = GatewayState::new(repositories, Arc::new(EventBus::new()), clients, config);

        Self {
            directory,
            router: create_router(state),
        }
    }

    async fn user(&self, username: &str) -> TestResult<User> {
        let hash = hash_password(PASSWORD).map_err(|err| anyhow::anyhow!(err.to_string()))?;
        let user = self
            .directory
            .insert_user(NewUser::new(username, format!("{username}@example.com")).with_password_hash(hash))
            .await?;
        Ok(user)
    }

    async fn token(&self, user: &User) -> TestResult<String> {
        Ok(self.directory.generate_access_token(user, 0, None).await?.code)
    }

    async fn send(&self, request: Request<Body>) -> TestResult<(StatusCode, axum::http::HeaderMap, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await?.to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, headers, body))
    }
}

fn post(uri: &str, token: Option<&str>, body: Value) -> TestResult<Request<Body>> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Value::Null => Body::empty(),
        body => Body::from(body.to_string()),
    };
    Ok(builder.body(body)?)
}

fn get(uri: &str, token: Option<&str>) -> TestResult<Request<Body>> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    Ok(builder.body(Body::empty())?)
}

#[tokio::test]
async fn login_issues_an_access_token() -> TestResult {
    let ctx = TestContext::new();
    let alice = ctx.user("alice").await?;

    let (status, _, body) = ctx
        .send(post(
            "/api/user/security/login",
            None,
            json!({ "login": "alice", "password": PASSWORD }),
        )?)
        .await?;

    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap_or_default();
    assert_eq!(token.len(), 43);
    assert!(body.get("expires_at").is_some());
    assert_eq!(ctx.directory.access_token_count(alice.id).await, 1);
    Ok(())
}

#[tokio::test]
async fn login_with_bad_password_lists_field_errors() -> TestResult {
    let ctx = TestContext::new();
    ctx.user("alice").await?;

    let (status, _, body) = ctx
        .send(post(
            "/api/user/security/login",
            None,
            json!({ "login": "alice", "password": "wrong" }),
        )?)
        .await?;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body[0]["field"], "password");
    assert_eq!(body[0]["message"], "Invalid login or password");
    Ok(())
}

#[tokio::test]
async fn login_while_authenticated_answers_true() -> TestResult {
    let ctx = TestContext::new();
    let alice = ctx.user("alice").await?;
    let token = ctx.token(&alice).await?;

    let (status, _, body) = ctx
        .send(post(
            "/api/user/security/login",
            Some(&token),
            json!({ "login": "alice", "password": PASSWORD }),
        )?)
        .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Bool(true));
    Ok(())
}

#[tokio::test]
async fn wrong_verb_is_method_not_allowed() -> TestResult {
    let ctx = TestContext::new();

    let (status, headers, body) = ctx.send(get("/api/user/security/login", None)?).await?;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(headers[header::ALLOW], "POST, OPTIONS");
    assert!(body["message"]
        .as_str()
        .unwrap_or_default()
        .contains("can only handle the following request methods: POST, OPTIONS"));
    Ok(())
}

#[tokio::test]
async fn options_lists_allowed_verbs() -> TestResult {
    let ctx = TestContext::new();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/user/profile/1")
        .body(Body::empty())?;
    let (status, headers, _) = ctx.send(request).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ALLOW], "GET, HEAD, OPTIONS");
    Ok(())
}

#[tokio::test]
async fn malformed_ids_still_go_through_the_action_checks() -> TestResult {
    let ctx = TestContext::new();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/user/profile/abc")
        .body(Body::empty())?;
    let (status, headers, _) = ctx.send(request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ALLOW], "GET, HEAD, OPTIONS");

    let (status, headers, _) = ctx
        .send(get("/api/user/settings/disconnect/abc", None)?)
        .await?;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(headers[header::ALLOW], "POST, OPTIONS");

    let (status, _, _) = ctx
        .send(post("/api/user/settings/disconnect/abc", None, Value::Null)?)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, body) = ctx.send(get("/api/user/profile/abc", None)?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
    Ok(())
}

#[tokio::test]
async fn logout_requires_a_token() -> TestResult {
    let ctx = TestContext::new();

    let (status, headers, _) = ctx
        .send(post("/api/user/security/logout", None, Value::Null)?)
        .await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(headers.contains_key(header::WWW_AUTHENTICATE));
    Ok(())
}

#[tokio::test]
async fn logout_clears_the_presented_token() -> TestResult {
    let ctx = TestContext::new();
    let alice = ctx.user("alice").await?;
    let token = ctx.token(&alice).await?;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/user/security/logout")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())?;
    let (status, _, body) = ctx.send(request).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Bool(true));
    assert_eq!(ctx.directory.access_token_count(alice.id).await, 0);

    let (status, _, _) = ctx
        .send(post("/api/user/security/logout", Some(&token), Value::Null)?)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn session_logout_ends_only_the_presented_login() -> TestResult {
    let ctx = TestContext::with_config(AuthConfig {
        enable_session: true,
        ..AuthConfig::default()
    });
    ctx.user("alice").await?;

    let mut tokens = Vec::new();
    for _ in 0..2 {
        let (status, _, body) = ctx
            .send(post(
                "/api/user/security/login",
                None,
                json!({ "login": "alice", "password": PASSWORD }),
            )?)
            .await?;
        assert_eq!(status, StatusCode::OK);
        tokens.push(body["token"].as_str().unwrap_or_default().to_string());
    }

    for token in &tokens {
        let (status, _, body) = ctx
            .send(post("/api/user/security/logout", Some(token), Value::Null)?)
            .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Bool(true));
    }

    let (status, _, _) = ctx
        .send(post("/api/user/security/logout", Some(&tokens[0]), Value::Null)?)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn tokens_without_a_live_session_are_refused() -> TestResult {
    let ctx = TestContext::with_config(AuthConfig {
        enable_session: true,
        ..AuthConfig::default()
    });
    let alice = ctx.user("alice").await?;
    let token = ctx.token(&alice).await?;

    let (status, _, _) = ctx
        .send(get("/api/user/settings/networks", Some(&token))?)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn query_token_is_accepted_when_enabled() -> TestResult {
    let ctx = TestContext::with_config(AuthConfig {
        auth_methods: vec![AuthMethod::Bearer, AuthMethod::Query],
        ..AuthConfig::default()
    });
    let alice = ctx.user("alice").await?;
    let token = ctx.token(&alice).await?;

    let (status, _, body) = ctx
        .send(get(&format!("/api/user/settings/networks?access-token={token}"), None)?)
        .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accounts"], json!([]));
    assert_eq!(body["clients"][0]["id"], "static");
    Ok(())
}

#[tokio::test]
async fn query_token_is_ignored_by_default() -> TestResult {
    let ctx = TestContext::new();
    let alice = ctx.user("alice").await?;
    let token = ctx.token(&alice).await?;

    let (status, _, _) = ctx
        .send(get(&format!("/api/user/settings/networks?access-token={token}"), None)?)
        .await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn profile_index_needs_a_logged_in_user() -> TestResult {
    let ctx = TestContext::new();
    let alice = ctx.user("alice").await?;
    let token = ctx.token(&alice).await?;

    let (status, _, body) = ctx.send(get("/api/user/profile", None)?).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Login Required");

    let (status, headers, _) = ctx.send(get("/api/user/profile", Some(&token))?).await?;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[header::LOCATION], format!("/api/user/profile/{}", alice.id));
    Ok(())
}

#[tokio::test]
async fn profile_show_is_public() -> TestResult {
    let ctx = TestContext::new();
    let alice = ctx.user("alice").await?;

    let (status, _, body) = ctx
        .send(get(&format!("/api/user/profile/{}", alice.id), None)?)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], alice.id);

    let (status, _, _) = ctx.send(get("/api/user/profile/999", None)?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn social_auth_sends_unknown_accounts_to_connect() -> TestResult {
    let ctx = TestContext::new();

    let (status, headers, body) = ctx
        .send(post(
            "/api/user/security/auth?authclient=static",
            None,
            json!({ "code": "abc" }),
        )?)
        .await?;

    assert_eq!(status, StatusCode::FOUND);
    let location = headers[header::LOCATION].to_str()?;
    assert!(location.starts_with("http://127.0.0.1:7070/user/registration/connect?code="));
    assert_eq!(body["redirect"], location);
    Ok(())
}

#[tokio::test]
async fn social_auth_rejects_unknown_clients_and_missing_codes() -> TestResult {
    let ctx = TestContext::new();

    let (status, _, _) = ctx
        .send(post("/api/user/security/auth?authclient=nope", None, json!({ "code": "abc" }))?)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = ctx
        .send(post("/api/user/security/auth", None, json!({ "code": "abc" }))?)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = ctx
        .send(post("/api/user/security/auth?authclient=static", None, json!({}))?)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn social_auth_with_registration_disabled_conflicts() -> TestResult {
    let ctx = TestContext::with_config(AuthConfig {
        enable_registration: false,
        ..AuthConfig::default()
    });

    let (status, _, body) = ctx
        .send(post("/api/user/security/auth?authclient=static", None, json!({ "code": "abc" }))?)
        .await?;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Registration on this website is disabled");
    Ok(())
}

#[tokio::test]
async fn profile_settings_redirect_after_save() -> TestResult {
    let ctx = TestContext::new();
    let alice = ctx.user("alice").await?;
    let token = ctx.token(&alice).await?;

    let (status, headers, body) = ctx
        .send(post(
            "/api/user/settings/profile",
            Some(&token),
            json!({ "name": "Alice", "website": "https://alice.example.com" }),
        )?)
        .await?;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[header::LOCATION], "/api/user/settings/profile");
    assert_eq!(body["messages"][0], "Your profile has been updated");

    let (_, _, body) = ctx
        .send(get(&format!("/api/user/profile/{}", alice.id), None)?)
        .await?;
    assert_eq!(body["name"], "Alice");

    let (status, _, body) = ctx
        .send(post("/api/user/settings/profile", Some(&token), json!({ "website": "not a url" }))?)
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body[0]["field"], "website");
    Ok(())
}

#[tokio::test]
async fn email_change_is_confirmed_through_the_link() -> TestResult {
    let ctx = TestContext::new();
    let alice = ctx.user("alice").await?;
    let token = ctx.token(&alice).await?;

    let (status, headers, _) = ctx
        .send(post(
            "/api/user/settings/account",
            Some(&token),
            json!({ "email": "alice@new.example.com", "username": "alice", "current_password": PASSWORD }),
        )?)
        .await?;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[header::LOCATION], "/api/user/settings/account");

    let code = ctx
        .directory
        .email_tokens_for(alice.id)
        .await
        .first()
        .map(|token| token.code.clone())
        .ok_or_else(|| anyhow::anyhow!("no confirmation token issued"))?;

    let (status, _, body) = ctx
        .send(post(&format!("/api/user/settings/confirm/{}/{code}", alice.id), None, Value::Null)?)
        .await?;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(body["outcome"], "changed");
    assert_eq!(body["messages"][0], "Your email address has been changed");
    Ok(())
}

#[tokio::test]
async fn account_settings_need_the_current_password() -> TestResult {
    let ctx = TestContext::new();
    let alice = ctx.user("alice").await?;
    let token = ctx.token(&alice).await?;

    let (status, _, body) = ctx
        .send(post(
            "/api/user/settings/account",
            Some(&token),
            json!({ "email": "alice@example.com", "username": "alice2", "current_password": "nope" }),
        )?)
        .await?;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body[0]["field"], "current_password");
    assert_eq!(body[0]["message"], "Current password is not valid");
    Ok(())
}

#[tokio::test]
async fn disconnect_of_missing_account_is_not_found() -> TestResult {
    let ctx = TestContext::new();
    let alice = ctx.user("alice").await?;
    let token = ctx.token(&alice).await?;

    let (status, _, body) = ctx
        .send(post("/api/user/settings/disconnect/77", Some(&token), Value::Null)?)
        .await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Account not found");
    Ok(())
}

#[tokio::test]
async fn health_reports_registered_clients() -> TestResult {
    let ctx = TestContext::new();

    let (status, _, body) = ctx.send(get("/health", None)?).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["auth_clients"], json!(["static"]));
    Ok(())
}
