//! Per-request identity of the caller.

use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tracing::info;

use crate::entities::User;
use crate::repositories::SessionStore;
use crate::types::StoreResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    Anonymous,
    Authenticating,
    Authenticated,
    Blocked,
    LoggedOut,
}

/// Who is making the current request.
///
/// Built once per request by the authenticator and threaded through every
/// flow. Every state except `Authenticated` counts as anonymous, so a blocked
/// user is treated as a guest.
#[derive(Clone)]
pub struct Identity {
    sessions: Arc<dyn SessionStore>,
    state: AuthState,
    user: Option<User>,
    access_token: Option<String>,
    session: Option<String>,
    return_url: Option<String>,
}

impl Identity {
    pub fn anonymous(sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            sessions,
            state: AuthState::Anonymous,
            user: None,
            access_token: None,
            session: None,
            return_url: None,
        }
    }

    /// Identity resolved from a presented access token.
    pub fn from_token(sessions: Arc<dyn SessionStore>, user: User, access_token: String) -> Self {
        if user.is_blocked() {
            return Self {
                state: AuthState::Blocked,
                ..Self::anonymous(sessions)
            };
        }
        Self {
            sessions,
            state: AuthState::Authenticated,
            user: Some(user),
            access_token: Some(access_token),
            session: None,
            return_url: None,
        }
    }

    /// Session the presented token was issued with.
    pub fn with_session(mut self, session: Option<String>) -> Self {
        self.session = session;
        self
    }

    pub fn with_return_url(mut self, url: impl Into<String>) -> Self {
        self.return_url = Some(url.into());
        self
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn is_anonymous(&self) -> bool {
        self.state != AuthState::Authenticated
    }

    pub fn current_user(&self) -> Option<&User> {
        match self.state {
            AuthState::Authenticated => self.user.as_ref(),
            _ => None,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.current_user().map(|user| user.id)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    pub fn return_url(&self, default: &str) -> String {
        self.return_url
            .clone()
            .unwrap_or_else(|| default.to_string())
    }

    pub fn begin_authentication(&mut self) {
        if self.is_anonymous() {
            self.state = AuthState::Authenticating;
        }
    }

    /// Back to anonymous after an attempt that did not log anyone in.
    pub fn abandon_authentication(&mut self) {
        if self.state == AuthState::Authenticating {
            self.state = AuthState::Anonymous;
        }
    }

    pub fn mark_blocked(&mut self) {
        self.user = None;
        self.access_token = None;
        self.session = None;
        self.state = AuthState::Blocked;
    }

    /// Opens a session for `user`. Blocked users are refused.
    pub async fn login(&mut self, user: User, remember_for: Duration) -> StoreResult<bool> {
        if user.is_blocked() {
            self.mark_blocked();
            return Ok(false);
        }
        let Some(session) = self.sessions.open(&user, remember_for).await? else {
            self.abandon_authentication();
            return Ok(false);
        };

        info!(user_id = user.id, username = %user.username, "user logged in");
        self.session = Some(session);
        self.user = Some(user);
        self.state = AuthState::Authenticated;
        Ok(true)
    }

    /// Terminates this identity's session only. A guest logs out trivially.
    pub async fn logout(&mut self) -> StoreResult<bool> {
        let Some(user) = self.current_user() else {
            return Ok(true);
        };
        if !self.sessions.close(user, self.session.as_deref()).await? {
            return Ok(false);
        }

        info!(user_id = user.id, "user logged out");
        self.user = None;
        self.access_token = None;
        self.session = None;
        self.state = AuthState::LoggedOut;
        Ok(true)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("state", &self.state)
            .field("user_id", &self.user.as_ref().map(|u| u.id))
            .field("return_url", &self.return_url)
            .finish_non_exhaustive()
    }
}
