//! Settings of the logged-in user: profile, account, email confirmation
//! and connected social networks.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, Path, State},
    http::{HeaderMap, Method, Uri},
    routing::any,
    Router,
};
use usergate_users::{urls, UpdateOutcome};

use crate::dispatch::RequestMeta;
use crate::error::{GatewayError, GatewayResult};
use crate::rest::models::{
    AccountRequest, AccountResponse, ClientResponse, ErrorResponse, FieldErrorResponse,
    NetworksResponse, ProfileRequest, ProfileResponse, RedirectResponse,
};
use crate::rest::response::{parse_payload, ActionResponse};
use crate::state::GatewayState;

/// Create settings routes
pub fn create_settings_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/settings/profile", any(profile))
        .route("/settings/account", any(account))
        .route("/settings/confirm/:id/:code", any(confirm))
        .route("/settings/networks", any(networks))
        .route("/settings/disconnect/:id", any(disconnect))
}

#[utoipa::path(
    post,
    path = "/api/user/settings/profile",
    tag = "Settings",
    request_body = ProfileRequest,
    responses(
        (status = 200, description = "Current profile when nothing was submitted", body = ProfileResponse),
        (status = 302, description = "Profile saved", body = RedirectResponse),
        (status = 422, description = "Validation failed", body = [FieldErrorResponse]),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn profile(
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
    let identity = state.controllers.settings.guard("profile", request, &state).await?;
    let payload: ProfileRequest = parse_payload(&headers, &body)?;

    match state.settings.update_profile(&identity, &payload.into()).await? {
        UpdateOutcome::Saved { messages } => {
            ActionResponse::redirect(urls::PROFILE_SETTINGS).with("messages", messages)
        }
        UpdateOutcome::Rejected(form) => ActionResponse::form(&form, &form.errors),
    }
}

#[utoipa::path(
    post,
    path = "/api/user/settings/account",
    tag = "Settings",
    request_body = AccountRequest,
    responses(
        (status = 200, description = "Current account settings when nothing was submitted"),
        (status = 302, description = "Account saved", body = RedirectResponse),
        (status = 422, description = "Validation failed", body = [FieldErrorResponse]),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn account(
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
    let identity = state.controllers.settings.guard("account", request, &state).await?;
    let payload: AccountRequest = parse_payload(&headers, &body)?;

    match state.settings.update_account(&identity, &payload.into()).await? {
        UpdateOutcome::Saved { messages } => {
            ActionResponse::redirect(urls::ACCOUNT_SETTINGS).with("messages", messages)
        }
        UpdateOutcome::Rejected(form) => ActionResponse::form(&form, &form.errors),
    }
}

#[utoipa::path(
    post,
    path = "/api/user/settings/confirm/{id}/{code}",
    tag = "Settings",
    params(
        ("id" = i64, Path, description = "User id"),
        ("code" = String, Path, description = "Confirmation code from the email")
    ),
    responses(
        (status = 302, description = "Redirect to account settings with the outcome", body = RedirectResponse),
        (status = 404, description = "Unknown user or email changes need no confirmation", body = ErrorResponse)
    )
)]
pub async fn confirm(
    State(state): State<Arc<GatewayState>>,
    params: Result<Path<(i64, String)>, PathRejection>,
    method: Method,
    headers: HeaderMap,
    uri: Uri,
) -> GatewayResult<ActionResponse> {
    let request = RequestMeta {
        method: &method,
        headers: &headers,
        uri: &uri,
    };
    state.controllers.settings.guard("confirm", request, &state).await?;
    let Path((id, code)) = params.map_err(path_error)?;

    let (outcome, location) = state.settings.confirm(id, &code).await?;
    ActionResponse::redirect(location)
        .with("outcome", outcome)?
        .with("messages", [outcome.message()])
}

#[utoipa::path(
    get,
    path = "/api/user/settings/networks",
    tag = "Settings",
    responses(
        (status = 200, description = "Connected accounts and available clients", body = NetworksResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn networks(
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
    let identity = state.controllers.settings.guard("networks", request, &state).await?;

    let accounts = state.settings.networks(&identity).await?;
    let clients = state
        .clients
        .ids()
        .into_iter()
        .filter_map(|id| state.clients.get(&id))
        .map(|client| ClientResponse {
            id: client.id().to_string(),
            title: client.title().to_string(),
        })
        .collect();

    ActionResponse::ok(NetworksResponse {
        accounts: accounts.into_iter().map(AccountResponse::from).collect(),
        clients,
    })
}

#[utoipa::path(
    post,
    path = "/api/user/settings/disconnect/{id}",
    tag = "Settings",
    params(
        ("id" = i64, Path, description = "Connected account id")
    ),
    responses(
        (status = 302, description = "Account removed", body = RedirectResponse),
        (status = 403, description = "Account belongs to someone else", body = ErrorResponse),
        (status = 404, description = "No such account", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn disconnect(
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
    let identity = state.controllers.settings.guard("disconnect", request, &state).await?;
    let Path(id) = id.map_err(path_error)?;

    let location = state.settings.disconnect(&identity, id).await?;
    Ok(ActionResponse::redirect(location))
}

/// Malformed path parameters, reported once the action's checks have passed.
fn path_error(rejection: PathRejection) -> GatewayError {
    GatewayError::BadRequest(rejection.body_text())
}
