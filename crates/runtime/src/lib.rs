use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use tracing::info;
use usergate_auth::AuthClientCollection;
use usergate_config::AppConfig;
use usergate_gateway::GatewayState;
use usergate_users::{EventBus, MemoryDirectory, Repositories};

pub mod seed;

pub mod telemetry {
    use anyhow::Result;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Logs every lifecycle event with the kind of object it carries.
pub fn register_audit(events: &mut EventBus) {
    events.on_all(|event, context| {
        info!(
            target: "usergate::audit",
            %event,
            subject = context.subject().kind(),
            client = context.client().map(|client| client.provider.as_str()),
            "user event"
        );
        Ok(())
    });
}

#[derive(Clone)]
pub struct BackendServices {
    pub config: AppConfig,
    pub directory: Arc<MemoryDirectory>,
    pub repositories: Repositories,
    pub events: Arc<EventBus>,
    pub clients: AuthClientCollection,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig, seed: Option<&Path>) -> Result<Self> {
        let directory = Arc::new(MemoryDirectory::new());
        if let Some(path) = seed {
            let file = seed::load_seed(path)?;
            let users = seed::apply_seed(&directory, file)
                .await
                .context("failed to seed user directory")?;
            info!(count = users.len(), path = %path.display(), "user directory seeded");
        }

        let repositories =
            Repositories::for_directory(directory.clone(), config.auth.enable_session);

        let mut events = EventBus::new();
        register_audit(&mut events);

        let clients = AuthClientCollection::from_config(&config.auth)
            .context("failed to configure auth clients")?;
        if clients.is_empty() {
            info!("no social-network clients configured");
        } else {
            info!(clients = ?clients.ids(), "auth clients ready");
        }

        Ok(Self {
            config: config.clone(),
            directory,
            repositories,
            events: Arc::new(events),
            clients,
        })
    }

    pub fn gateway_state(&self) -> GatewayState {
        GatewayState::new(
            self.repositories.clone(),
            self.events.clone(),
            self.clients.clone(),
            self.config.auth.clone(),
        )
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
