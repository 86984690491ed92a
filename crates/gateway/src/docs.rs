use utoipa::openapi::security::{ApiKey, ApiKeyValue, Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::middleware::ACCESS_TOKEN_PARAM;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::rest::health::health_check,
        crate::rest::security::login,
        crate::rest::security::logout,
        crate::rest::security::auth,
        crate::rest::profile::index,
        crate::rest::profile::show,
        crate::rest::settings::profile,
        crate::rest::settings::account,
        crate::rest::settings::confirm,
        crate::rest::settings::networks,
        crate::rest::settings::disconnect,
    ),
    components(
        schemas(
            crate::rest::health::HealthResponse,
            crate::rest::models::ErrorResponse,
            crate::rest::models::FieldErrorResponse,
            crate::rest::models::RedirectResponse,
            crate::rest::models::LoginRequest,
            crate::rest::models::TokenResponse,
            crate::rest::models::AuthCallbackRequest,
            crate::rest::models::ProfileResponse,
            crate::rest::models::ProfileRequest,
            crate::rest::models::AccountRequest,
            crate::rest::models::AccountResponse,
            crate::rest::models::ClientResponse,
            crate::rest::models::NetworksResponse,
        )
    ),
    tags(
        (name = "Health", description = "Service health checks"),
        (name = "Security", description = "Login, logout and social-network authentication"),
        (name = "Profile", description = "Public user profiles"),
        (name = "Settings", description = "Profile, account and connected networks of the logged-in user")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        let schemes = &mut components.security_schemes;

        schemes.insert(
            "bearer".to_string(),
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
        schemes.insert(
            "query".to_string(),
            SecurityScheme::ApiKey(ApiKey::Query(ApiKeyValue::new(ACCESS_TOKEN_PARAM))),
        );
    }
}
