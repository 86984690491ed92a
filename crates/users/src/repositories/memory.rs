use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use usergate_auth::{generate_token, new_code, ClientIdentity};

use crate::entities::token::expiry_after;
use crate::entities::{AccessToken, Account, NewUser, Profile, Token, TokenKind, User};
use crate::repositories::{AccountStore, Finder, UserStore};
use crate::types::{StoreError, StoreResult};

/// In-process directory of users, profiles, accounts and tokens.
///
/// Each table sits behind its own lock and no operation holds two of them
/// at once.
#[derive(Debug)]
pub struct MemoryDirectory {
    users: RwLock<HashMap<i64, User>>,
    profiles: RwLock<HashMap<i64, Profile>>,
    accounts: RwLock<HashMap<i64, Account>>,
    access_tokens: RwLock<HashMap<String, AccessToken>>,
    email_tokens: RwLock<Vec<Token>>,
    next_user_id: AtomicI64,
    next_account_id: AtomicI64,
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            profiles: RwLock::new(HashMap::new()),
            accounts: RwLock::new(HashMap::new()),
            access_tokens: RwLock::new(HashMap::new()),
            email_tokens: RwLock::new(Vec::new()),
            next_user_id: AtomicI64::new(1),
            next_account_id: AtomicI64::new(1),
        }
    }
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a user together with an empty profile.
    pub async fn insert_user(&self, new_user: NewUser) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == new_user.username) {
            return Err(StoreError::Duplicate(format!("username {}", new_user.username)));
        }
        if users.values().any(|u| u.email == new_user.email) {
            return Err(StoreError::Duplicate(format!("email {}", new_user.email)));
        }

        let id = self.next_user_id.fetch_add(1, Ordering::SeqCst);
        let user = new_user.into_user(id, Utc::now());
        users.insert(id, user.clone());
        drop(users);

        self.profiles.write().await.insert(id, Profile::for_user(id));
        Ok(user)
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn access_token_count(&self, user_id: i64) -> usize {
        self.access_tokens
            .read()
            .await
            .values()
            .filter(|token| token.user_id == user_id)
            .count()
    }

    pub async fn email_tokens_for(&self, user_id: i64) -> Vec<Token> {
        self.email_tokens
            .read()
            .await
            .iter()
            .filter(|token| token.user_id == user_id)
            .cloned()
            .collect()
    }

    fn next_account_id(&self) -> i64 {
        self.next_account_id.fetch_add(1, Ordering::SeqCst)
    }
}

fn same_client(account: &Account, client: &ClientIdentity) -> bool {
    account.provider == client.provider && account.client_id == client.id
}

#[async_trait]
impl Finder for MemoryDirectory {
    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_access_token(&self, code: &str) -> StoreResult<Option<(User, AccessToken)>> {
        let token = match self.access_tokens.read().await.get(code) {
            Some(token) => token.clone(),
            None => return Ok(None),
        };

        if token.is_expired(Utc::now()) {
            debug!(user_id = token.user_id, "removing expired access token");
            self.access_tokens.write().await.remove(code);
            return Ok(None);
        }

        let user = self.users.read().await.get(&token.user_id).cloned();
        Ok(user.map(|user| (user, token)))
    }

    async fn find_account_by_client(&self, client: &ClientIdentity) -> StoreResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| same_client(a, client)).cloned())
    }

    async fn find_account_by_id(&self, id: i64) -> StoreResult<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_accounts_by_user(&self, user_id: i64) -> StoreResult<Vec<Account>> {
        let accounts = self.accounts.read().await;
        let mut linked: Vec<Account> = accounts
            .values()
            .filter(|a| a.user_id == Some(user_id))
            .cloned()
            .collect();
        linked.sort_by_key(|a| a.id);
        Ok(linked)
    }

    async fn find_profile_by_id(&self, user_id: i64) -> StoreResult<Option<Profile>> {
        Ok(self.profiles.read().await.get(&user_id).cloned())
    }
}

#[async_trait]
impl UserStore for MemoryDirectory {
    async fn save_user(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(StoreError::Duplicate(format!("username {}", user.username)));
        }

        let Some(stored) = users.get_mut(&user.id) else {
            return Err(StoreError::Missing(format!("user {}", user.id)));
        };
        *stored = User {
            updated_at: Utc::now(),
            ..user.clone()
        };
        Ok(())
    }

    async fn save_profile(&self, profile: &Profile) -> StoreResult<()> {
        if !self.users.read().await.contains_key(&profile.user_id) {
            return Err(StoreError::Missing(format!("user {}", profile.user_id)));
        }
        self.profiles
            .write()
            .await
            .insert(profile.user_id, profile.clone());
        Ok(())
    }

    async fn generate_access_token(
        &self,
        user: &User,
        ttl_seconds: u64,
        session: Option<&str>,
    ) -> StoreResult<AccessToken> {
        let now = Utc::now();
        let token = AccessToken {
            user_id: user.id,
            code: generate_token(),
            created_at: now,
            expires_at: expiry_after(now, ttl_seconds),
            session: session.map(str::to_owned),
        };
        self.access_tokens
            .write()
            .await
            .insert(token.code.clone(), token.clone());
        Ok(token)
    }

    async fn clear_current_access_token(&self, user: &User, code: &str) -> StoreResult<bool> {
        let mut tokens = self.access_tokens.write().await;
        match tokens.get(code) {
            Some(token) if token.user_id == user.id => {
                tokens.remove(code);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn create_email_token(&self, user: &User, kind: TokenKind) -> StoreResult<Token> {
        let token = Token {
            user_id: user.id,
            code: new_code(),
            kind,
            created_at: Utc::now(),
        };
        let mut tokens = self.email_tokens.write().await;
        tokens.retain(|t| !(t.user_id == user.id && t.kind == kind));
        tokens.push(token.clone());
        Ok(token)
    }

    async fn find_email_token(&self, user_id: i64, code: &str) -> StoreResult<Option<Token>> {
        let tokens = self.email_tokens.read().await;
        Ok(tokens
            .iter()
            .find(|t| t.user_id == user_id && t.code == code)
            .cloned())
    }

    async fn delete_email_token(&self, token: &Token) -> StoreResult<()> {
        self.email_tokens
            .write()
            .await
            .retain(|t| !(t.user_id == token.user_id && t.code == token.code));
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryDirectory {
    async fn create_from_client(&self, client: &ClientIdentity) -> StoreResult<Account> {
        let mut accounts = self.accounts.write().await;
        if accounts.values().any(|a| same_client(a, client)) {
            return Err(StoreError::Duplicate(format!(
                "account {}/{}",
                client.provider, client.id
            )));
        }

        let mut account = Account::from_client(client, new_code());
        account.id = self.next_account_id();
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn connect_to_user(
        &self,
        client: &ClientIdentity,
        user: &User,
        overwrite: bool,
    ) -> StoreResult<bool> {
        let mut accounts = self.accounts.write().await;

        if let Some(account) = accounts.values_mut().find(|a| same_client(a, client)) {
            return match account.user_id {
                Some(owner) if owner != user.id && !overwrite => Ok(false),
                _ => {
                    account.user_id = Some(user.id);
                    Ok(true)
                }
            };
        }

        let mut account = Account::from_client(client, new_code());
        account.id = self.next_account_id();
        account.user_id = Some(user.id);
        accounts.insert(account.id, account);
        Ok(true)
    }

    async fn delete(&self, account: &Account) -> StoreResult<()> {
        match self.accounts.write().await.remove(&account.id) {
            Some(_) => Ok(()),
            None => Err(StoreError::Missing(format!("account {}", account.id))),
        }
    }
}
