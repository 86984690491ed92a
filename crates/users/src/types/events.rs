//! Lifecycle events fired by the user flows.

use std::fmt;

use thiserror::Error;
use usergate_auth::ClientIdentity;

use crate::entities::{Account, LoginForm, ProfileForm, SettingsForm, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventName {
    BeforeLogin,
    AfterLogin,
    BeforeLogout,
    AfterLogout,
    BeforeAuthenticate,
    AfterAuthenticate,
    BeforeConnect,
    AfterConnect,
    BeforeProfileUpdate,
    AfterProfileUpdate,
    BeforeAccountUpdate,
    AfterAccountUpdate,
    BeforeConfirm,
    AfterConfirm,
    BeforeDisconnect,
    AfterDisconnect,
}

impl EventName {
    pub const ALL: [EventName; 16] = [
        EventName::BeforeLogin,
        EventName::AfterLogin,
        EventName::BeforeLogout,
        EventName::AfterLogout,
        EventName::BeforeAuthenticate,
        EventName::AfterAuthenticate,
        EventName::BeforeConnect,
        EventName::AfterConnect,
        EventName::BeforeProfileUpdate,
        EventName::AfterProfileUpdate,
        EventName::BeforeAccountUpdate,
        EventName::AfterAccountUpdate,
        EventName::BeforeConfirm,
        EventName::AfterConfirm,
        EventName::BeforeDisconnect,
        EventName::AfterDisconnect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::BeforeLogin => "beforeLogin",
            EventName::AfterLogin => "afterLogin",
            EventName::BeforeLogout => "beforeLogout",
            EventName::AfterLogout => "afterLogout",
            EventName::BeforeAuthenticate => "beforeAuthenticate",
            EventName::AfterAuthenticate => "afterAuthenticate",
            EventName::BeforeConnect => "beforeConnect",
            EventName::AfterConnect => "afterConnect",
            EventName::BeforeProfileUpdate => "beforeProfileUpdate",
            EventName::AfterProfileUpdate => "afterProfileUpdate",
            EventName::BeforeAccountUpdate => "beforeAccountUpdate",
            EventName::AfterAccountUpdate => "afterAccountUpdate",
            EventName::BeforeConfirm => "beforeConfirm",
            EventName::AfterConfirm => "afterConfirm",
            EventName::BeforeDisconnect => "beforeDisconnect",
            EventName::AfterDisconnect => "afterDisconnect",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a handler returns to abort the remaining chain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// A handler failure, tagged with the event it happened in.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{event} handler failed: {source}")]
pub struct EventError {
    pub event: EventName,
    #[source]
    pub source: HandlerError,
}

impl EventError {
    pub fn new(event: EventName, source: HandlerError) -> Self {
        Self { event, source }
    }
}

/// The object an event is about.
#[derive(Debug, Clone)]
pub enum EventSubject {
    Login(LoginForm),
    Settings(SettingsForm),
    User(User),
    Profile(ProfileForm),
    Account {
        account: Account,
        user: Option<User>,
    },
}

impl EventSubject {
    pub fn kind(&self) -> &'static str {
        match self {
            EventSubject::Login(_) => "login_form",
            EventSubject::Settings(_) => "settings_form",
            EventSubject::User(_) => "user",
            EventSubject::Profile(_) => "profile",
            EventSubject::Account { .. } => "account",
        }
    }
}

/// Mutable context passed to every handler of one trigger.
///
/// Handlers may change the subject and the redirect, but not swap the
/// subject for one of another kind.
#[derive(Debug, Clone)]
pub struct EventContext {
    subject: EventSubject,
    client: Option<ClientIdentity>,
    pub redirect: Option<String>,
}

impl EventContext {
    pub fn new(subject: EventSubject) -> Self {
        Self {
            subject,
            client: None,
            redirect: None,
        }
    }

    pub fn login(form: LoginForm) -> Self {
        Self::new(EventSubject::Login(form))
    }

    pub fn settings(form: SettingsForm) -> Self {
        Self::new(EventSubject::Settings(form))
    }

    pub fn user(user: User) -> Self {
        Self::new(EventSubject::User(user))
    }

    pub fn profile(form: ProfileForm) -> Self {
        Self::new(EventSubject::Profile(form))
    }

    pub fn account(account: Account, user: Option<User>) -> Self {
        Self::new(EventSubject::Account { account, user })
    }

    pub fn with_client(mut self, client: ClientIdentity) -> Self {
        self.client = Some(client);
        self
    }

    pub fn subject(&self) -> &EventSubject {
        &self.subject
    }

    pub fn client(&self) -> Option<&ClientIdentity> {
        self.client.as_ref()
    }

    pub fn login_form_mut(&mut self) -> Option<&mut LoginForm> {
        match &mut self.subject {
            EventSubject::Login(form) => Some(form),
            _ => None,
        }
    }

    pub fn settings_form_mut(&mut self) -> Option<&mut SettingsForm> {
        match &mut self.subject {
            EventSubject::Settings(form) => Some(form),
            _ => None,
        }
    }

    pub fn profile_form_mut(&mut self) -> Option<&mut ProfileForm> {
        match &mut self.subject {
            EventSubject::Profile(form) => Some(form),
            _ => None,
        }
    }

    pub fn user_mut(&mut self) -> Option<&mut User> {
        match &mut self.subject {
            EventSubject::User(user) => Some(user),
            _ => None,
        }
    }

    pub fn account_mut(&mut self) -> Option<(&mut Account, &mut Option<User>)> {
        match &mut self.subject {
            EventSubject::Account { account, user } => Some((account, user)),
            _ => None,
        }
    }

    pub fn into_subject(self) -> EventSubject {
        self.subject
    }
}
