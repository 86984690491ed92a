//! Login, logout and social-network authentication endpoints

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, Method, Uri},
    routing::any,
    Router,
};
use tracing::info;
use usergate_users::{urls, LoginOutcome};

use crate::dispatch::RequestMeta;
use crate::error::{GatewayError, GatewayResult};
use crate::rest::models::{
    AuthCallbackRequest, AuthQuery, ErrorResponse, FieldErrorResponse, LoginRequest,
    RedirectResponse, TokenResponse,
};
use crate::rest::response::{parse_payload, ActionResponse};
use crate::state::GatewayState;

/// Create security routes
pub fn create_security_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/security/login", any(login))
        .route("/security/logout", any(logout))
        .route("/security/auth", any(auth))
}

#[utoipa::path(
    post,
    path = "/api/user/security/login",
    tag = "Security",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access token, `true` when already logged in, or the blank form", body = TokenResponse),
        (status = 422, description = "Validation failed", body = [FieldErrorResponse]),
        (status = 405, description = "Method not allowed", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    headers: HeaderMap,
    uri: Uri,
    body: Bytes,
) -> GatewayResult<ActionResponse> {
    let request = RequestMeta {
        method: &method,
        headers: &headers,
        uri: &uri,
    };
    let mut identity = state.controllers.security.guard("login", request, &state).await?;
    let payload: LoginRequest = parse_payload(&headers, &body)?;

    match state.security.login(&mut identity, &payload.into()).await? {
        LoginOutcome::AlreadyAuthenticated => ActionResponse::ok(true),
        LoginOutcome::Token(token) => ActionResponse::ok(TokenResponse::from(token)),
        LoginOutcome::Rejected(form) => ActionResponse::form(&form, &form.errors),
    }
}

#[utoipa::path(
    post,
    path = "/api/user/security/logout",
    tag = "Security",
    responses(
        (status = 200, description = "Whether the access token was cleared", body = bool),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 409, description = "Session could not be terminated", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn logout(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    headers: HeaderMap,
    uri: Uri,
) -> GatewayResult<ActionResponse> {
    let request = RequestMeta {
        method: &method,
        headers: &headers,
        uri: &uri,
    };
    let mut identity = state.controllers.security.guard("logout", request, &state).await?;

    let cleared = state.security.logout(&mut identity).await?;
    ActionResponse::ok(cleared)
}

#[utoipa::path(
    post,
    path = "/api/user/security/auth",
    tag = "Security",
    params(AuthQuery),
    request_body = AuthCallbackRequest,
    responses(
        (status = 302, description = "Logged in, connected, or sent to finish registration", body = RedirectResponse),
        (status = 404, description = "Unknown auth client", body = ErrorResponse),
        (status = 409, description = "Registration disabled or account blocked", body = ErrorResponse)
    )
)]
pub async fn auth(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    headers: HeaderMap,
    uri: Uri,
    body: Bytes,
) -> GatewayResult<ActionResponse> {
    let request = RequestMeta {
        method: &method,
        headers: &headers,
        uri: &uri,
    };
    let mut identity = state.controllers.security.guard("auth", request, &state).await?;

    let Query(query) = Query::<AuthQuery>::try_from_uri(&uri)
        .map_err(|rejection| GatewayError::BadRequest(rejection.body_text()))?;
    let client_id = query
        .authclient
        .ok_or_else(|| GatewayError::NotFound("Page not found.".to_string()))?;
    let client = state
        .clients
        .get(&client_id)
        .ok_or_else(|| GatewayError::NotFound(format!("Unknown auth client: {client_id}")))?;

    let payload: AuthCallbackRequest = parse_payload(&headers, &body)?;
    let code = payload
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| GatewayError::BadRequest("code is required".to_string()))?;
    let redirect_uri = payload.redirect_uri.unwrap_or_else(|| {
        format!(
            "{}{}/security/auth?authclient={client_id}",
            state.config.public_url.trim_end_matches('/'),
            urls::BASE
        )
    });

    let remote = client.fetch_identity(&code, &redirect_uri).await?;
    info!(client = %client_id, remote_id = %remote.id, "social handshake completed");

    let location = state
        .security
        .auth_success(&mut identity, remote)
        .await?
        .unwrap_or_else(|| identity.return_url(&state.config.return_url));
    Ok(ActionResponse::redirect(location))
}
