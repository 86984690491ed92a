#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;
use usergate_auth::{hash_password, ClientIdentity};
use usergate_config::AuthConfig;
use usergate_users::{
    Account, AccountStore, EventBus, EventName, Identity, MemoryDirectory, NewUser, ProfileService,
    Repositories, SecurityService, SessionStore, SettingsService, StatelessSessions, StoreResult,
    User, UserStore,
};

pub type TestResult<T = ()> = anyhow::Result<T>;

pub const PASSWORD: &str = "correct horse";

pub struct TestContext {
    pub directory: Arc<MemoryDirectory>,
    pub repositories: Repositories,
    pub security: SecurityService,
    pub settings: SettingsService,
    pub profiles: ProfileService,
    fired: Arc<Mutex<Vec<EventName>>>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::build(AuthConfig::default(), Arc::new(StatelessSessions), |_| {})
    }

    pub fn with_config(config: AuthConfig) -> Self {
        Self::build(config, Arc::new(StatelessSessions), |_| {})
    }

    /// `extra` registers handlers after the recorder.
    pub fn build(
        config: AuthConfig,
        sessions: Arc<dyn SessionStore>,
        extra: impl FnOnce(&mut EventBus),
    ) -> Self {
        Self::build_with(
            config,
            |directory| Repositories::in_memory(directory, sessions),
            extra,
        )
    }

    /// `repositories` wires the stores over the fresh directory.
    pub fn build_with(
        config: AuthConfig,
        repositories: impl FnOnce(Arc<MemoryDirectory>) -> Repositories,
        extra: impl FnOnce(&mut EventBus),
    ) -> Self {
        let directory = Arc::new(MemoryDirectory::new());
        let repositories = repositories(directory.clone());

        let fired = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        let recorder = fired.clone();
        bus.on_all(move |event, _| {
            recorder.lock().unwrap().push(event);
            Ok(())
        });
        extra(&mut bus);
        let events = Arc::new(bus);

        Self {
            security: SecurityService::new(repositories.clone(), events.clone(), config.clone()),
            settings: SettingsService::new(repositories.clone(), events, config),
            profiles: ProfileService::new(repositories.clone()),
            directory,
            repositories,
            fired,
        }
    }

    pub async fn user(&self, username: &str) -> TestResult<User> {
        let hash = hash_password(PASSWORD).map_err(|err| anyhow::anyhow!(err.to_string()))?;
        let user = self
            .directory
            .insert_user(NewUser::new(username, format!("{username}@example.com")).with_password_hash(hash))
            .await?;
        Ok(user)
    }

    pub async fn insert(&self, new_user: NewUser) -> TestResult<User> {
        Ok(self.directory.insert_user(new_user).await?)
    }

    pub fn guest(&self) -> Identity {
        Identity::anonymous(self.repositories.sessions.clone())
    }

    /// Identity of `user` holding a freshly issued access token.
    pub async fn signed_in(&self, user: &User) -> TestResult<Identity> {
        let token = self.directory.generate_access_token(user, 0, None).await?;
        Ok(Identity::from_token(
            self.repositories.sessions.clone(),
            user.clone(),
            token.code,
        ))
    }

    pub fn fired(&self) -> Vec<EventName> {
        self.fired.lock().unwrap().clone()
    }

    pub fn reset_events(&self) {
        self.fired.lock().unwrap().clear();
    }
}

/// Session store that refuses every login.
pub struct RefusingSessions;

#[async_trait]
impl SessionStore for RefusingSessions {
    async fn open(&self, _user: &User, _remember_for: Duration) -> StoreResult<Option<String>> {
        Ok(None)
    }

    async fn is_active(&self, _user: &User, _session: Option<&str>) -> StoreResult<bool> {
        Ok(false)
    }

    async fn close(&self, _user: &User, _session: Option<&str>) -> StoreResult<bool> {
        Ok(false)
    }
}

/// Account store whose links never persist.
pub struct RefusingAccounts(pub Arc<MemoryDirectory>);

#[async_trait]
impl AccountStore for RefusingAccounts {
    async fn create_from_client(&self, client: &ClientIdentity) -> StoreResult<Account> {
        self.0.create_from_client(client).await
    }

    async fn connect_to_user(
        &self,
        _client: &ClientIdentity,
        _user: &User,
        _overwrite: bool,
    ) -> StoreResult<bool> {
        Ok(false)
    }

    async fn delete(&self, account: &Account) -> StoreResult<()> {
        self.0.delete(account).await
    }
}
