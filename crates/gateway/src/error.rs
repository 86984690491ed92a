//! Error types for the gateway layer

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use usergate_auth::ClientError;
use usergate_users::AuthError;

/// Gateway error types
#[derive(Error, Debug)]
pub enum GatewayError {
    /// `OPTIONS` request: not a failure, answered with the allowed verbs.
    #[error("allowed methods: {allow}")]
    Preflight { allow: String },

    #[error("Method Not Allowed. This URL can only handle the following request methods: {allow}.")]
    MethodNotAllowed { allow: String },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Auth provider error: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Preflight { .. } => StatusCode::OK,
            GatewayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Conflict(_) => StatusCode::CONFLICT,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn invalid_credentials() -> Self {
        GatewayError::Unauthorized("Your request was made with invalid credentials.".to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let allow = match &self {
            GatewayError::Preflight { allow } | GatewayError::MethodNotAllowed { allow } => {
                HeaderValue::from_str(allow).ok()
            }
            _ => None,
        };

        let mut response = match self {
            GatewayError::Preflight { .. } => status.into_response(),
            other => {
                if status.is_server_error() {
                    error!(error = %other, "request failed");
                }
                let error_response = json!({
                    "error": status.as_str(),
                    "message": other.to_string(),
                });
                (status, Json(error_response)).into_response()
            }
        };

        if let Some(allow) = allow {
            response.headers_mut().insert(header::ALLOW, allow);
        }
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"api\""),
            );
        }
        response
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<AuthError> for GatewayError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Conflict(message) => GatewayError::Conflict(message),
            AuthError::NotFound(message) => GatewayError::NotFound(message),
            AuthError::Forbidden(message) => GatewayError::Forbidden(message),
            AuthError::Event(event) => GatewayError::Internal(event.source.message().to_string()),
            AuthError::Store(err) => GatewayError::Internal(err.to_string()),
            err @ (AuthError::PasswordHash(_) | AuthError::Internal(_)) => {
                GatewayError::Internal(err.to_string())
            }
        }
    }
}

impl From<ClientError> for GatewayError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::NotConfigured(client) => {
                GatewayError::NotFound(format!("Unknown auth client: {client}"))
            }
            ClientError::CodeRejected(message) => GatewayError::BadRequest(message),
            ClientError::Provider(err) => GatewayError::Upstream(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(error: serde_json::Error) -> Self {
        GatewayError::BadRequest(format!("malformed JSON body: {error}"))
    }
}
