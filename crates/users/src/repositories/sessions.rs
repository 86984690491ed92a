use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use usergate_auth::new_code;

use crate::entities::User;
use crate::repositories::SessionStore;
use crate::types::StoreResult;

/// No server-side session: every request re-authenticates with its token.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatelessSessions;

#[async_trait]
impl SessionStore for StatelessSessions {
    async fn open(&self, _user: &User, _remember_for: Duration) -> StoreResult<Option<String>> {
        Ok(Some(new_code()))
    }

    async fn is_active(&self, _user: &User, _session: Option<&str>) -> StoreResult<bool> {
        Ok(true)
    }

    async fn close(&self, _user: &User, _session: Option<&str>) -> StoreResult<bool> {
        Ok(true)
    }
}

#[derive(Debug, Clone)]
struct Session {
    user_id: i64,
    /// `None` lasts until closed.
    until: Option<DateTime<Utc>>,
}

impl Session {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.until.map_or(true, |until| until > now)
    }
}

/// Session table keyed by session id. Blocked users cannot open a session.
#[derive(Debug, Default)]
pub struct MemorySessions {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live sessions held by `user_id`.
    pub async fn open_count(&self, user_id: i64) -> usize {
        let now = Utc::now();
        self.sessions
            .read()
            .await
            .values()
            .filter(|session| session.user_id == user_id && session.is_live(now))
            .count()
    }
}

#[async_trait]
impl SessionStore for MemorySessions {
    async fn open(&self, user: &User, remember_for: Duration) -> StoreResult<Option<String>> {
        if user.is_blocked() {
            return Ok(None);
        }
        let until = if remember_for > Duration::zero() {
            Utc::now().checked_add_signed(remember_for)
        } else {
            None
        };
        let id = new_code();
        self.sessions.write().await.insert(
            id.clone(),
            Session {
                user_id: user.id,
                until,
            },
        );
        Ok(Some(id))
    }

    async fn is_active(&self, user: &User, session: Option<&str>) -> StoreResult<bool> {
        let Some(id) = session else {
            return Ok(false);
        };
        let live = match self.sessions.read().await.get(id) {
            Some(found) if found.user_id == user.id => found.is_live(Utc::now()),
            _ => return Ok(false),
        };
        if !live {
            debug!(user_id = user.id, "removing expired session");
            self.sessions.write().await.remove(id);
        }
        Ok(live)
    }

    async fn close(&self, user: &User, session: Option<&str>) -> StoreResult<bool> {
        let Some(id) = session else {
            return Ok(false);
        };
        let mut sessions = self.sessions.write().await;
        match sessions.get(id) {
            Some(found) if found.user_id == user.id => {
                sessions.remove(id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
