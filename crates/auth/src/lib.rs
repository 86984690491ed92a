//! Social-network clients and credential helpers.
//!
//! The flows in `usergate-users` only ever see a [`ClientIdentity`]: the
//! provider handshake happens here, behind the [`AuthClient`] trait.

mod client;
mod credentials;
mod github;

pub use client::{AuthClient, AuthClientCollection, ClientError, ClientIdentity, StaticClient};
pub use credentials::{generate_token, hash_password, new_code, verify_password};
pub use github::GithubClient;
