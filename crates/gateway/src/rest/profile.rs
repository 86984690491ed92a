//! Public profile pages

use std::sync::Arc;

use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::{HeaderMap, Method, Uri},
    routing::any,
    Router,
};

use crate::dispatch::RequestMeta;
use crate::error::{GatewayError, GatewayResult};
use crate::rest::models::{ErrorResponse, ProfileResponse, RedirectResponse};
use crate::rest::response::ActionResponse;
use crate::state::GatewayState;

/// Create profile routes
pub fn create_profile_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/profile", any(index))
        .route("/profile/:id", any(show))
}

#[utoipa::path(
    get,
    path = "/api/user/profile",
    tag = "Profile",
    responses(
        (status = 302, description = "Redirect to the caller's own profile", body = RedirectResponse),
        (status = 403, description = "Login required", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn index(
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
    let identity = state.controllers.profile.guard("index", request, &state).await?;

    let location = state.profiles.index(&identity)?;
    Ok(ActionResponse::redirect(location))
}

#[utoipa::path(
    get,
    path = "/api/user/profile/{id}",
    tag = "Profile",
    params(
        ("id" = i64, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "Public profile", body = ProfileResponse),
        (status = 404, description = "No such profile", body = ErrorResponse)
    )
)]
pub async fn show(
    State(state): State<Arc<GatewayState>>,
    id: Result<Path<i64>, PathRejection>,
    method: Method,
    headers: HeaderMap,
    uri: Uri,
) -> GatewayResult<ActionResponse> {
    let request = RequestMeta {
        method: &method,
        headers: &headers,
        uri: &uri,
    };
    state.controllers.profile.guard("show", request, &state).await?;
    let Path(id) = id.map_err(|rejection| GatewayError::BadRequest(rejection.body_text()))?;

    let profile = state.profiles.show(id).await?;
    ActionResponse::ok(ProfileResponse::from(profile))
}
