//! Action responses and request payload parsing.

use axum::{
    body::Bytes,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use usergate_users::{FieldError, FieldErrors};

use crate::error::{GatewayError, GatewayResult};

/// What an action answers with.
#[derive(Debug)]
pub enum ActionResponse {
    Data(StatusCode, Value),
    /// 302 with a `Location` header and `{"redirect": url, ...}` body.
    Redirect { location: String, extra: Map<String, Value> },
    /// 422 with `[{field, message}]`.
    Invalid(Vec<FieldError>),
}

impl ActionResponse {
    pub fn ok(data: impl Serialize) -> GatewayResult<Self> {
        Ok(ActionResponse::Data(StatusCode::OK, serde_json::to_value(data)?))
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        ActionResponse::Redirect {
            location: location.into(),
            extra: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Serialize) -> GatewayResult<Self> {
        if let ActionResponse::Redirect { extra, .. } = &mut self {
            extra.insert(key.to_string(), serde_json::to_value(value)?);
        }
        Ok(self)
    }

    /// A form handed back by a flow: its attributes when nothing failed,
    /// the validation errors otherwise.
    pub fn form(form: impl Serialize, errors: &FieldErrors) -> GatewayResult<Self> {
        if errors.is_empty() {
            Self::ok(form)
        } else {
            Ok(ActionResponse::Invalid(errors.to_list()))
        }
    }
}

impl IntoResponse for ActionResponse {
    fn into_response(self) -> Response {
        match self {
            ActionResponse::Data(status, value) => (status, Json(value)).into_response(),
            ActionResponse::Redirect {
                location,
                mut extra,
            } => {
                let Ok(header_value) = HeaderValue::from_str(&location) else {
                    return GatewayError::Internal(format!("invalid redirect target {location}"))
                        .into_response();
                };
                extra.insert("redirect".to_string(), Value::String(location));
                let mut response = (StatusCode::FOUND, Json(Value::Object(extra))).into_response();
                response.headers_mut().insert(header::LOCATION, header_value);
                response
            }
            ActionResponse::Invalid(errors) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(errors)).into_response()
            }
        }
    }
}

/// Reads a JSON body; an empty body yields the default payload.
pub fn parse_payload<T: DeserializeOwned + Default>(headers: &HeaderMap, body: &Bytes) -> GatewayResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/json");
    if !content_type.starts_with("application/json") {
        return Err(GatewayError::BadRequest(format!(
            "unsupported content type {content_type}"
        )));
    }

    Ok(serde_json::from_slice(body)?)
}
