use anyhow::Context;
use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, RedirectUrl, TokenResponse, TokenUrl,
};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::debug;
use usergate_config::GithubAuthConfig;

use crate::{AuthClient, ClientError, ClientIdentity};

const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GITHUB_USER_API: &str = "https://api.github.com/user";

#[derive(Clone)]
pub struct GithubClient {
    client: BasicClient,
    http: reqwest::Client,
}

impl GithubClient {
    pub fn from_config(config: &GithubAuthConfig) -> Result<Option<Self>, ClientError> {
        let (Some(client_id), Some(client_secret)) =
            (config.client_id.clone(), config.client_secret.clone())
        else {
            return Ok(None);
        };
        Self::new(client_id, client_secret).map(Some)
    }

    pub fn new(client_id: String, client_secret: String) -> Result<Self, ClientError> {
        let auth_url = AuthUrl::new(GITHUB_AUTHORIZE_URL.to_string())
            .context("invalid github auth url")?;
        let token_url =
            TokenUrl::new(GITHUB_TOKEN_URL.to_string()).context("invalid github token url")?;

        let client = BasicClient::new(
            ClientId::new(client_id),
            Some(ClientSecret::new(client_secret)),
            auth_url,
            Some(token_url),
        )
        .set_auth_type(oauth2::AuthType::RequestBody);

        let http = reqwest::Client::builder()
            .user_agent("usergate")
            .build()
            .context("failed to build github http client")?;

        Ok(Self { client, http })
    }
}

#[async_trait]
impl AuthClient for GithubClient {
    fn id(&self) -> &str {
        "github"
    }

    fn title(&self) -> &str {
        "GitHub"
    }

    async fn fetch_identity(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ClientIdentity, ClientError> {
        let redirect = RedirectUrl::new(redirect_uri.to_owned())
            .context("invalid redirect uri for github oauth")?;

        let token_response = self
            .client
            .clone()
            .set_redirect_uri(redirect)
            .exchange_code(AuthorizationCode::new(code.to_owned()))
            .request_async(async_http_client)
            .await
            .map_err(|error| ClientError::CodeRejected(error.to_string()))?;

        let access_token = token_response.access_token().secret();

        let attributes: serde_json::Value = self
            .http
            .get(GITHUB_USER_API)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .context("failed to call github user api")?
            .error_for_status()
            .context("github user api returned error")?
            .json()
            .await
            .context("failed to decode github user response")?;

        let user = GithubUserResponse::deserialize(&attributes)
            .context("unexpected github user payload")?;

        debug!(login = %user.login, id = user.id, "fetched github user profile");

        Ok(ClientIdentity {
            provider: self.id().to_owned(),
            id: user.id.to_string(),
            email: user.email,
            username: Some(user.login),
            attributes,
        })
    }
}

#[derive(Deserialize)]
struct GithubUserResponse {
    id: i64,
    login: String,
    email: Option<String>,
}
