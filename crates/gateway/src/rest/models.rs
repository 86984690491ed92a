//! Request and response bodies of the REST surface.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use usergate_users::{AccessToken, Account, LoginData, Profile, ProfileData, SettingsData};

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FieldErrorResponse {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RedirectResponse {
    pub redirect: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub login: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "rememberMe")]
    pub remember_me: Option<bool>,
}

impl From<LoginRequest> for LoginData {
    fn from(request: LoginRequest) -> Self {
        LoginData {
            login: request.login,
            password: request.password,
            remember_me: request.remember_me,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl From<AccessToken> for TokenResponse {
    fn from(token: AccessToken) -> Self {
        Self {
            token: token.code,
            created_at: token.created_at.to_rfc3339(),
            expires_at: token.expires_at.map(|at| at.to_rfc3339()),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AuthQuery {
    /// Id of the social-network client, e.g. `github`
    pub authclient: Option<String>,
}

/// Result of the provider handshake, relayed by the client application.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AuthCallbackRequest {
    pub code: Option<String>,
    /// Defaults to this endpoint's public URL.
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user_id: i64,
    pub name: Option<String>,
    pub public_email: Option<String>,
    pub gravatar_email: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub bio: Option<String>,
    pub timezone: Option<String>,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            user_id: profile.user_id,
            name: profile.name,
            public_email: profile.public_email,
            gravatar_email: profile.gravatar_email,
            location: profile.location,
            website: profile.website,
            bio: profile.bio,
            timezone: profile.timezone,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProfileRequest {
    pub name: Option<String>,
    pub public_email: Option<String>,
    pub gravatar_email: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub bio: Option<String>,
    pub timezone: Option<String>,
}

impl From<ProfileRequest> for ProfileData {
    fn from(request: ProfileRequest) -> Self {
        ProfileData {
            name: request.name,
            public_email: request.public_email,
            gravatar_email: request.gravatar_email,
            location: request.location,
            website: request.website,
            bio: request.bio,
            timezone: request.timezone,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AccountRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub new_password: Option<String>,
    pub current_password: Option<String>,
}

impl From<AccountRequest> for SettingsData {
    fn from(request: AccountRequest) -> Self {
        SettingsData {
            email: request.email,
            username: request.username,
            new_password: request.new_password,
            current_password: request.current_password,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountResponse {
    pub id: i64,
    pub provider: String,
    pub client_id: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub created_at: String,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            provider: account.provider,
            client_id: account.client_id,
            username: account.username,
            email: account.email,
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClientResponse {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NetworksResponse {
    pub accounts: Vec<AccountResponse>,
    /// Clients that can be connected.
    pub clients: Vec<ClientResponse>,
}
