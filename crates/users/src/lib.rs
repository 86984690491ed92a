//! # Usergate Users Crate
//!
//! User management flows: login and logout, social-network authentication
//! and account linking, profile and account settings.
//!
//! ## Architecture
//!
//! - **Entities**: domain models and request forms (User, Account, LoginForm, ...)
//! - **Services**: the flows, the event bus and the per-request identity
//! - **Repositories**: collaborator store traits and their in-memory implementation
//! - **Types**: errors and event types
//! - **Utils**: attribute validators
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use usergate_config::AuthConfig;
//! use usergate_users::{EventBus, MemoryDirectory, Repositories, SecurityService};
//!
//! let repositories = Repositories::for_directory(Arc::new(MemoryDirectory::new()), false);
//! let security = SecurityService::new(repositories, Arc::new(EventBus::new()), AuthConfig::default());
//! # let _ = security;
//! ```

pub mod entities;
pub mod repositories;
pub mod services;
pub mod types;
pub mod urls;
pub mod utils;

pub use entities::{
    AccessToken, Account, FieldError, FieldErrors, LoginData, LoginForm, NewUser, Profile,
    ProfileData, ProfileForm, SettingsData, SettingsForm, Token, TokenKind, User,
};
pub use repositories::{
    AccountStore, Finder, MemoryDirectory, MemorySessions, Repositories, SessionStore,
    StatelessSessions, UserStore,
};
pub use services::{
    AuthState, EmailChangeOutcome, EventBus, Identity, LoginOutcome, ProfileService,
    SecurityService, SettingsService, UpdateOutcome,
};
pub use types::{
    AuthError, AuthResult, EventContext, EventError, EventName, EventSubject, HandlerError,
    StoreError, StoreResult,
};
