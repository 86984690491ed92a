//! Business logic of the user module.
//!
//! - [`EventBus`]: ordered handler lists per event name
//! - [`Identity`]: who is calling, threaded through every flow
//! - [`SecurityService`]: login, logout, social authenticate and connect
//! - [`SettingsService`]: profile and account settings, email confirmation,
//!   connected networks
//! - [`ProfileService`]: public profile pages

pub mod event_bus;
pub mod identity;
pub mod profile;
pub mod security;
pub mod settings;

pub use event_bus::{EventBus, EventHandler};
pub use identity::{AuthState, Identity};
pub use profile::ProfileService;
pub use security::{LoginOutcome, SecurityService};
pub use settings::{EmailChangeOutcome, SettingsService, UpdateOutcome};
