//! Request authentication and tracing.

use std::collections::HashMap;

use axum::{
    extract::Query,
    http::{header, HeaderMap, Uri},
};
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{debug, Level};
use usergate_config::AuthMethod;
use usergate_users::Identity;

use crate::error::{GatewayError, GatewayResult};
use crate::state::GatewayState;

/// Query parameter read by [`AuthMethod::Query`].
pub const ACCESS_TOKEN_PARAM: &str = "access-token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Missing or invalid credentials answer 401.
    Required,
    /// Credentials are used when valid and ignored otherwise.
    Optional,
}

/// Extracts the token of an `Authorization: Bearer` header.
///
/// `Ok(None)` when the header is absent.
pub fn bearer_token(headers: &HeaderMap) -> GatewayResult<Option<String>> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| GatewayError::invalid_credentials())?;

    let mut parts = value.split_whitespace();
    let scheme = parts.next().unwrap_or("");
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Ok(None);
    }

    match parts.next() {
        Some(token) if !token.is_empty() => Ok(Some(token.to_string())),
        _ => Err(GatewayError::invalid_credentials()),
    }
}

/// Extracts `?access-token=`.
pub fn query_token(uri: &Uri) -> Option<String> {
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    params
        .get(ACCESS_TOKEN_PARAM)
        .filter(|token| !token.is_empty())
        .cloned()
}

/// Builds the request identity from the configured credential methods,
/// tried in order.
pub async fn authenticate(
    state: &GatewayState,
    headers: &HeaderMap,
    uri: &Uri,
    mode: AuthMode,
) -> GatewayResult<Identity> {
    let mut presented = false;

    for method in &state.config.auth_methods {
        let token = match method {
            AuthMethod::Bearer => bearer_token(headers),
            AuthMethod::Query => Ok(query_token(uri)),
        };
        let token = match token {
            Ok(Some(token)) => token,
            Ok(None) => continue,
            Err(err) if mode == AuthMode::Required => return Err(err),
            Err(_) => {
                presented = true;
                continue;
            }
        };
        presented = true;

        let found = state
            .repositories
            .finder
            .find_user_by_access_token(&token)
            .await
            .map_err(|err| GatewayError::Internal(err.to_string()))?;

        match found {
            Some((user, access)) if !user.is_blocked() => {
                let active = state
                    .repositories
                    .sessions
                    .is_active(&user, access.session.as_deref())
                    .await
                    .map_err(|err| GatewayError::Internal(err.to_string()))?;
                if !active {
                    debug!(user_id = user.id, ?method, "token of a closed session");
                    continue;
                }
                return Ok(Identity::from_token(
                    state.repositories.sessions.clone(),
                    user,
                    token,
                )
                .with_session(access.session)
                .with_return_url(state.config.return_url.clone()));
            }
            Some((user, _)) => debug!(user_id = user.id, ?method, "token of a blocked user"),
            None => debug!(?method, "unknown or expired access token"),
        }
    }

    match mode {
        AuthMode::Required => Err(GatewayError::invalid_credentials()),
        AuthMode::Optional => {
            if presented {
                debug!("ignoring invalid credentials on an optional action");
            }
            Ok(state.guest())
        }
    }
}

/// Create tracing middleware
pub fn create_trace_middleware() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO))
}
