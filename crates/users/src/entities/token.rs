//! Access tokens handed out on login and single-use email tokens.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessToken {
    #[serde(skip_serializing)]
    pub user_id: i64,
    #[serde(rename = "token")]
    pub code: String,
    pub created_at: DateTime<Utc>,
    /// `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// Session opened by the login that issued this token.
    #[serde(skip_serializing)]
    pub session: Option<String>,
}

impl AccessToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    ConfirmNewEmail,
    ConfirmOldEmail,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub user_id: i64,
    pub code: String,
    pub kind: TokenKind,
    pub created_at: DateTime<Utc>,
}

impl Token {
    pub fn is_expired(&self, valid_for: Duration, now: DateTime<Utc>) -> bool {
        match self.created_at.checked_add_signed(valid_for) {
            Some(deadline) => deadline < now,
            None => false,
        }
    }
}

/// `now + seconds`, or `None` when the result is not representable or
/// `seconds` is zero.
pub fn expiry_after(now: DateTime<Utc>, seconds: u64) -> Option<DateTime<Utc>> {
    if seconds == 0 {
        return None;
    }
    let delta = Duration::try_seconds(i64::try_from(seconds).ok()?)?;
    now.checked_add_signed(delta)
}

/// Seconds as a duration, saturating at the largest value chrono accepts.
pub fn duration_from_secs(seconds: u64) -> Duration {
    i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}
