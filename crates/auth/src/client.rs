use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use usergate_config::AuthConfig;

use crate::GithubClient;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("auth client is not configured: {0}")]
    NotConfigured(String),
    #[error("authorization code rejected: {0}")]
    CodeRejected(String),
    #[error("provider error: {0}")]
    Provider(#[from] anyhow::Error),
}

/// What a provider tells us about the remote user once the handshake succeeded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientIdentity {
    /// Client id, e.g. `github`.
    pub provider: String,
    /// The user's id at the provider.
    pub id: String,
    pub email: Option<String>,
    pub username: Option<String>,
    pub attributes: serde_json::Value,
}

impl ClientIdentity {
    pub fn new(provider: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            id: id.into(),
            email: None,
            username: None,
            attributes: serde_json::Value::Null,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Identifier used in `?authclient=`.
    fn id(&self) -> &str;

    fn title(&self) -> &str;

    async fn fetch_identity(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ClientIdentity, ClientError>;
}

/// Registered clients keyed by id.
#[derive(Clone, Default)]
pub struct AuthClientCollection {
    clients: BTreeMap<String, Arc<dyn AuthClient>>,
}

impl AuthClientCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every client that has credentials in the configuration.
    pub fn from_config(config: &AuthConfig) -> Result<Self, ClientError> {
        let mut collection = Self::new();
        if let Some(github) = GithubClient::from_config(&config.github)? {
            collection.insert(Arc::new(github));
        }
        Ok(collection)
    }

    pub fn with_client(mut self, client: Arc<dyn AuthClient>) -> Self {
        self.insert(client);
        self
    }

    pub fn insert(&mut self, client: Arc<dyn AuthClient>) {
        self.clients.insert(client.id().to_owned(), client);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn AuthClient>> {
        self.clients.get(id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

/// Client that answers every code with a fixed identity. Used by the dev
/// seed and by tests; `code` values listed in `rejected` fail the exchange.
pub struct StaticClient {
    id: String,
    identity: ClientIdentity,
    rejected: Vec<String>,
}

impl StaticClient {
    pub fn new(identity: ClientIdentity) -> Self {
        Self {
            id: identity.provider.clone(),
            identity,
            rejected: Vec::new(),
        }
    }

    pub fn rejecting(mut self, code: impl Into<String>) -> Self {
        self.rejected.push(code.into());
        self
    }
}

#[async_trait]
impl AuthClient for StaticClient {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.id
    }

    async fn fetch_identity(
        &self,
        code: &str,
        _redirect_uri: &str,
    ) -> Result<ClientIdentity, ClientError> {
        if self.rejected.iter().any(|rejected| rejected == code) {
            return Err(ClientError::CodeRejected(code.to_owned()));
        }
        Ok(self.identity.clone())
    }
}
