use chrono::{DateTime, Utc};
use serde::Serialize;
use usergate_auth::ClientIdentity;

/// A social-network account, optionally linked to a local user.
///
/// `(provider, client_id)` is unique across a store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub id: i64,
    pub provider: String,
    pub client_id: String,
    pub user_id: Option<i64>,
    /// Code embedded in the connect URL of an unlinked account.
    #[serde(skip_serializing)]
    pub code: String,
    pub email: Option<String>,
    pub username: Option<String>,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Unsaved account built from a provider identity.
    pub fn from_client(client: &ClientIdentity, code: impl Into<String>) -> Self {
        Self {
            id: 0,
            provider: client.provider.clone(),
            client_id: client.id.clone(),
            user_id: None,
            code: code.into(),
            email: client.email.clone(),
            username: client.username.clone(),
            data: client.attributes.clone(),
            created_at: Utc::now(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.user_id.is_some()
    }

    /// Where an unlinked account finishes registration.
    pub fn connect_url(&self, base: &str) -> String {
        format!(
            "{}/user/registration/connect?code={}",
            base.trim_end_matches('/'),
            self.code
        )
    }
}
