//! Login, logout and social-network authentication.

use std::sync::Arc;

use chrono::Duration;
use tracing::{info, warn};
use usergate_auth::{verify_password, ClientIdentity};
use usergate_config::AuthConfig;

use crate::entities::token::duration_from_secs;
use crate::entities::{AccessToken, LoginData, LoginForm, User};
use crate::repositories::Repositories;
use crate::services::{EventBus, Identity};
use crate::types::{AuthError, AuthResult, EventContext, EventName, EventSubject};
use crate::urls;

#[derive(Debug)]
pub enum LoginOutcome {
    /// The caller was already logged in; nothing happened.
    AlreadyAuthenticated,
    Token(AccessToken),
    /// Not loaded or not valid; `errors` is empty when nothing was submitted.
    Rejected(LoginForm),
}

#[derive(Clone)]
pub struct SecurityService {
    repositories: Repositories,
    events: Arc<EventBus>,
    config: AuthConfig,
}

fn subject_mismatch(expected: &str) -> AuthError {
    AuthError::Internal(format!("event context no longer holds a {expected}"))
}

impl SecurityService {
    pub fn new(repositories: Repositories, events: Arc<EventBus>, config: AuthConfig) -> Self {
        Self {
            repositories,
            events,
            config,
        }
    }

    pub async fn login(&self, identity: &mut Identity, data: &LoginData) -> AuthResult<LoginOutcome> {
        if !identity.is_anonymous() {
            return Ok(LoginOutcome::AlreadyAuthenticated);
        }

        let mut context = EventContext::login(LoginForm::default());
        self.events.trigger(EventName::BeforeLogin, &mut context)?;
        identity.begin_authentication();

        let logged_in = {
            let form = context
                .login_form_mut()
                .ok_or_else(|| subject_mismatch("login form"))?;
            form.load(data) && self.submit_login(identity, form).await?
        };

        if !logged_in {
            identity.abandon_authentication();
            return match context.into_subject() {
                EventSubject::Login(form) => {
                    if !form.errors.is_empty() {
                        warn!(login = %form.login, "login rejected");
                    }
                    Ok(LoginOutcome::Rejected(form))
                }
                _ => Err(subject_mismatch("login form")),
            };
        }

        self.events.trigger(EventName::AfterLogin, &mut context)?;

        let user = identity
            .current_user()
            .cloned()
            .ok_or_else(|| AuthError::Internal("login succeeded without a user".into()))?;
        let token = self
            .repositories
            .users
            .generate_access_token(&user, self.config.access_token_ttl_seconds, identity.session())
            .await?;
        Ok(LoginOutcome::Token(token))
    }

    /// Validates the form and logs the resolved user in.
    async fn submit_login(&self, identity: &mut Identity, form: &mut LoginForm) -> AuthResult<bool> {
        if !self.validate_login(form).await? {
            return Ok(false);
        }
        let Some(user) = form.user.clone() else {
            return Ok(false);
        };
        let remember_for = if form.remember_me {
            duration_from_secs(self.config.remember_for_seconds)
        } else {
            Duration::zero()
        };
        Ok(identity.login(user, remember_for).await?)
    }

    async fn validate_login(&self, form: &mut LoginForm) -> AuthResult<bool> {
        if form.login.is_empty() {
            form.errors.add("login", "Login cannot be blank.");
        }
        if form.password.is_empty() {
            form.errors.add("password", "Password cannot be blank.");
        }
        if !form.errors.is_empty() {
            return Ok(false);
        }

        let user = self.repositories.finder.find_user_by_login(&form.login).await?;
        let Some(user) = user.filter(|user| password_matches(user, &form.password)) else {
            form.errors.add("password", "Invalid login or password");
            return Ok(false);
        };

        if !self.config.enable_unconfirmed_login && !user.is_confirmed() {
            form.errors.add("login", "You need to confirm your email address");
        }
        if user.is_blocked() {
            form.errors.add("login", "Your account has been blocked");
        }
        if !form.errors.is_empty() {
            return Ok(false);
        }

        form.user = Some(user);
        Ok(true)
    }

    /// Ends the caller's session and clears the access token it used.
    ///
    /// Returns whether a token was cleared.
    pub async fn logout(&self, identity: &mut Identity) -> AuthResult<bool> {
        let user = identity
            .current_user()
            .cloned()
            .ok_or_else(|| AuthError::Forbidden("Login required".into()))?;
        let access_token = identity.access_token().map(str::to_owned);

        let mut context = EventContext::user(user.clone());
        self.events.trigger(EventName::BeforeLogout, &mut context)?;

        if !identity.logout().await? {
            warn!(user_id = user.id, "session store refused to close the session");
            return Err(AuthError::Conflict("Unable to log out".into()));
        }

        self.events.trigger(EventName::AfterLogout, &mut context)?;

        match access_token {
            Some(code) => Ok(self
                .repositories
                .users
                .clear_current_access_token(&user, &code)
                .await?),
            None => Ok(false),
        }
    }

    /// Successful social handshake: authenticate a guest, or connect the
    /// account to the logged-in user. Returns the redirect, if any.
    pub async fn auth_success(
        &self,
        identity: &mut Identity,
        client: ClientIdentity,
    ) -> AuthResult<Option<String>> {
        if identity.is_anonymous() {
            self.authenticate(identity, client).await
        } else {
            self.connect(identity, client).await
        }
    }

    pub async fn authenticate(
        &self,
        identity: &mut Identity,
        client: ClientIdentity,
    ) -> AuthResult<Option<String>> {
        let finder = &self.repositories.finder;
        let existing = finder.find_account_by_client(&client).await?;
        let linked_user = match existing.as_ref().and_then(|account| account.user_id) {
            Some(user_id) => finder.find_user_by_id(user_id).await?,
            None => None,
        };

        if !self.config.enable_registration && linked_user.is_none() {
            warn!(provider = %client.provider, "social sign-up refused, registration disabled");
            return Err(AuthError::Conflict(
                "Registration on this website is disabled".into(),
            ));
        }

        let account = match existing {
            Some(account) => account,
            None => {
                self.repositories
                    .accounts
                    .create_from_client(&client)
                    .await?
            }
        };

        let mut context = EventContext::account(account, linked_user).with_client(client);
        self.events
            .trigger(EventName::BeforeAuthenticate, &mut context)?;
        identity.begin_authentication();

        let (account, user) = context
            .account_mut()
            .map(|(account, user)| (account.clone(), user.clone()))
            .ok_or_else(|| subject_mismatch("account"))?;

        match user {
            Some(user) if user.is_blocked() => {
                warn!(user_id = user.id, "blocked user tried to authenticate");
                identity.mark_blocked();
                return Err(AuthError::Conflict("Your account has been blocked.".into()));
            }
            Some(user) => {
                let remember_for = duration_from_secs(self.config.remember_for_seconds);
                identity.login(user, remember_for).await?;
                context.redirect = Some(identity.return_url(&self.config.return_url));
            }
            None => {
                identity.abandon_authentication();
                context.redirect = Some(account.connect_url(&self.config.public_url));
            }
        }

        self.events
            .trigger(EventName::AfterAuthenticate, &mut context)?;
        Ok(context.redirect)
    }

    pub async fn connect(
        &self,
        identity: &mut Identity,
        client: ClientIdentity,
    ) -> AuthResult<Option<String>> {
        let user = identity
            .current_user()
            .cloned()
            .ok_or_else(|| AuthError::Forbidden("Login required".into()))?;

        let pending = crate::entities::Account::from_client(&client, String::new());
        let mut context = EventContext::account(pending, Some(user.clone())).with_client(client.clone());
        self.events.trigger(EventName::BeforeConnect, &mut context)?;

        if self
            .repositories
            .accounts
            .connect_to_user(&client, &user, true)
            .await?
        {
            info!(user_id = user.id, provider = %client.provider, "account connected");
            self.events.trigger(EventName::AfterConnect, &mut context)?;
            context.redirect = Some(urls::NETWORKS.to_string());
        }

        Ok(context.redirect)
    }
}

fn password_matches(user: &User, password: &str) -> bool {
    user.password_hash
        .as_deref()
        .is_some_and(|hash| verify_password(password, hash))
}
