use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "usergate.toml",
    "config/usergate.toml",
    "crates/config/usergate.toml",
    "../usergate.toml",
    "../config/usergate.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7070,
        }
    }
}

/// How an email change requested from the account settings is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmailChangeStrategy {
    /// The new address is written immediately.
    Insecure,
    /// The new address must be confirmed from its own mailbox.
    #[default]
    Default,
    /// Both the old and the new address must confirm the change.
    Secure,
}

/// Credential lookup methods tried, in order, by the request authenticator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// `Authorization: Bearer <token>`
    Bearer,
    /// `?access-token=<token>`
    Query,
}

/// Options of the user module.
///
/// ```
/// use usergate_config::{AuthConfig, EmailChangeStrategy};
///
/// let auth = AuthConfig::default();
/// assert!(auth.enable_registration);
/// assert!(!auth.enable_unconfirmed_login);
/// assert_eq!(auth.remember_for_seconds, 1_209_600);
/// assert_eq!(auth.email_change_strategy, EmailChangeStrategy::Default);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enable_registration: bool,
    pub enable_unconfirmed_login: bool,
    pub enable_session: bool,
    pub remember_for_seconds: u64,
    pub access_token_ttl_seconds: u64,
    pub confirm_within_seconds: u64,
    pub email_change_strategy: EmailChangeStrategy,
    pub auth_methods: Vec<AuthMethod>,
    /// Absolute base used for links handed to other sites (account connect URL).
    pub public_url: String,
    /// Where a freshly authenticated user is sent when no return URL was given.
    pub return_url: String,
    pub github: GithubAuthConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enable_registration: true,
            enable_unconfirmed_login: false,
            enable_session: false,
            remember_for_seconds: 1_209_600,
            access_token_ttl_seconds: 1_209_600,
            confirm_within_seconds: 86_400,
            email_change_strategy: EmailChangeStrategy::Default,
            auth_methods: vec![AuthMethod::Bearer],
            public_url: "http://127.0.0.1:7070".to_string(),
            return_url: "/".to_string(),
            github: GithubAuthConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GithubAuthConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use usergate_config::load;
///
/// std::env::remove_var("USERGATE_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())?
        .set_default("http.port", i64::from(defaults.http.port))?
        .set_default("auth.public_url", defaults.auth.public_url.clone())?
        .set_default("auth.return_url", defaults.auth.return_url.clone())?;

    let environment_overrides = config::Environment::with_prefix("USERGATE").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("USERGATE_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via USERGATE_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    clamp_seconds(&mut config.auth.remember_for_seconds);
    clamp_seconds(&mut config.auth.access_token_ttl_seconds);
    clamp_seconds(&mut config.auth.confirm_within_seconds);

    if config.auth.auth_methods.is_empty() {
        config.auth.auth_methods = vec![AuthMethod::Bearer];
    }

    debug!(?config, "loaded usergate configuration");
    Ok(config)
}

// Durations are handed to chrono as i64 seconds.
fn clamp_seconds(value: &mut u64) {
    if *value > i64::MAX as u64 {
        *value = i64::MAX as u64;
    }
}
