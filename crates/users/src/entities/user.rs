//! User entity and the data used to create one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The old address confirmed a secure email change.
pub const OLD_EMAIL_CONFIRMED: u8 = 0b01;
/// The new address confirmed a secure email change.
pub const NEW_EMAIL_CONFIRMED: u8 = 0b10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub unconfirmed_email: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub blocked_at: Option<DateTime<Utc>>,
    /// Progress of a secure email change, see [`OLD_EMAIL_CONFIRMED`].
    #[serde(skip_serializing, default)]
    pub flags: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_blocked(&self) -> bool {
        self.blocked_at.is_some()
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }

    pub fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag == flag
    }
}

/// Data for inserting a user directly into a store (seeding, tests).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    /// Already hashed password.
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(default = "default_true")]
    pub confirmed: bool,
    #[serde(default)]
    pub blocked: bool,
}

fn default_true() -> bool {
    true
}

impl NewUser {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password_hash: None,
            confirmed: true,
            blocked: false,
        }
    }

    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    pub fn unconfirmed(mut self) -> Self {
        self.confirmed = false;
        self
    }

    pub fn blocked(mut self) -> Self {
        self.blocked = true;
        self
    }

    pub fn into_user(self, id: i64, now: DateTime<Utc>) -> User {
        User {
            id,
            username: self.username,
            email: self.email,
            unconfirmed_email: None,
            password_hash: self.password_hash,
            confirmed_at: self.confirmed.then_some(now),
            blocked_at: self.blocked.then_some(now),
            flags: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
