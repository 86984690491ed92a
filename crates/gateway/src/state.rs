//! Shared application state for the gateway

use std::sync::Arc;

use usergate_auth::AuthClientCollection;
use usergate_config::AuthConfig;
use usergate_users::{
    EventBus, Identity, ProfileService, Repositories, SecurityService, SettingsService,
};

use crate::dispatch::Controllers;

/// Shared application state containing all services
#[derive(Clone)]
pub struct GatewayState {
    pub repositories: Repositories,
    pub security: SecurityService,
    pub settings: SettingsService,
    pub profiles: ProfileService,
    /// Social-network clients reachable through `?authclient=`
    pub clients: AuthClientCollection,
    pub config: Arc<AuthConfig>,
    pub controllers: Arc<Controllers>,
}

impl GatewayState {
    pub fn new(
        repositories: Repositories,
        events: Arc<EventBus>,
        clients: AuthClientCollection,
        config: AuthConfig,
    ) -> Self {
        Self {
            security: SecurityService::new(repositories.clone(), events.clone(), config.clone()),
            settings: SettingsService::new(repositories.clone(), events, config.clone()),
            profiles: ProfileService::new(repositories.clone()),
            repositories,
            clients,
            config: Arc::new(config),
            controllers: Arc::new(Controllers::default()),
        }
    }

    pub fn guest(&self) -> Identity {
        Identity::anonymous(self.repositories.sessions.clone())
            .with_return_url(self.config.return_url.clone())
    }
}
