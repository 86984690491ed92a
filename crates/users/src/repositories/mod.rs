//! Collaborator stores used by the flows.
//!
//! The flows only see these traits; [`MemoryDirectory`] is the in-process
//! implementation and [`StatelessSessions`] / [`MemorySessions`] are the two
//! session stores selected by `enable_session`.

mod memory;
mod sessions;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use usergate_auth::ClientIdentity;

use crate::entities::{AccessToken, Account, Profile, Token, TokenKind, User};
use crate::types::StoreResult;

pub use memory::MemoryDirectory;
pub use sessions::{MemorySessions, StatelessSessions};

#[async_trait]
pub trait Finder: Send + Sync {
    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Email lookup when `login` looks like an address, username otherwise.
    async fn find_user_by_login(&self, login: &str) -> StoreResult<Option<User>> {
        if login.contains('@') {
            if let Some(user) = self.find_user_by_email(login).await? {
                return Ok(Some(user));
            }
        }
        self.find_user_by_username(login).await
    }

    /// Resolves a live access token. Expired tokens are removed and not returned.
    async fn find_user_by_access_token(&self, code: &str) -> StoreResult<Option<(User, AccessToken)>>;

    async fn find_account_by_client(&self, client: &ClientIdentity) -> StoreResult<Option<Account>>;

    async fn find_account_by_id(&self, id: i64) -> StoreResult<Option<Account>>;

    async fn find_accounts_by_user(&self, user_id: i64) -> StoreResult<Vec<Account>>;

    async fn find_profile_by_id(&self, user_id: i64) -> StoreResult<Option<Profile>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Replaces the stored user with the same id.
    async fn save_user(&self, user: &User) -> StoreResult<()>;

    async fn save_profile(&self, profile: &Profile) -> StoreResult<()>;

    /// `ttl_seconds == 0` issues a token that never expires. `session` ties
    /// the token to the session opened by the same login.
    async fn generate_access_token(
        &self,
        user: &User,
        ttl_seconds: u64,
        session: Option<&str>,
    ) -> StoreResult<AccessToken>;

    /// `true` when the token existed and belonged to `user`.
    async fn clear_current_access_token(&self, user: &User, code: &str) -> StoreResult<bool>;

    async fn create_email_token(&self, user: &User, kind: TokenKind) -> StoreResult<Token>;

    async fn find_email_token(&self, user_id: i64, code: &str) -> StoreResult<Option<Token>>;

    async fn delete_email_token(&self, token: &Token) -> StoreResult<()>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Stores a new unlinked account for `client`.
    async fn create_from_client(&self, client: &ClientIdentity) -> StoreResult<Account>;

    /// Links `client` to `user`, creating the account when missing. An
    /// account already linked elsewhere is only relinked with `overwrite`.
    async fn connect_to_user(
        &self,
        client: &ClientIdentity,
        user: &User,
        overwrite: bool,
    ) -> StoreResult<bool>;

    async fn delete(&self, account: &Account) -> StoreResult<()>;
}

/// One session per login, so a user signed in on several devices holds
/// several sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the new session id, or `None` when the store refuses the
    /// login. `remember_for` of zero keeps the session until it is closed.
    async fn open(&self, user: &User, remember_for: Duration) -> StoreResult<Option<String>>;

    /// `false` once the session was closed or its `remember_for` ran out.
    async fn is_active(&self, user: &User, session: Option<&str>) -> StoreResult<bool>;

    /// Closes only `session`. `true` when it was open and belonged to `user`.
    async fn close(&self, user: &User, session: Option<&str>) -> StoreResult<bool>;
}

/// The set of stores handed to the flows.
#[derive(Clone)]
pub struct Repositories {
    pub finder: Arc<dyn Finder>,
    pub users: Arc<dyn UserStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub sessions: Arc<dyn SessionStore>,
}

impl Repositories {
    pub fn in_memory(directory: Arc<MemoryDirectory>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            finder: directory.clone(),
            users: directory.clone(),
            accounts: directory,
            sessions,
        }
    }

    /// Picks the session store the way `enable_session` asks for.
    pub fn for_directory(directory: Arc<MemoryDirectory>, enable_session: bool) -> Self {
        let sessions: Arc<dyn SessionStore> = if enable_session {
            Arc::new(MemorySessions::new())
        } else {
            Arc::new(StatelessSessions)
        };
        Self::in_memory(directory, sessions)
    }
}
