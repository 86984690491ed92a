//! Shared error and event types.

pub mod errors;
pub mod events;

pub use errors::{AuthError, AuthResult, StoreError, StoreResult};
pub use events::{EventContext, EventError, EventName, EventSubject, HandlerError};
