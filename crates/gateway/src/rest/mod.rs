//! REST API endpoints for the gateway

pub mod health;
pub mod models;
pub mod profile;
pub mod response;
pub mod security;
pub mod settings;

use axum::{routing::get, Router};
use std::sync::Arc;
use usergate_users::urls;

use crate::state::GatewayState;

/// Create all REST API routes
pub fn create_rest_routes() -> Router<Arc<GatewayState>> {
    let user = Router::new()
        // Login, logout and social authentication
        .merge(security::create_security_routes())
        // Public profiles
        .merge(profile::create_profile_routes())
        // Settings of the logged-in user
        .merge(settings::create_settings_routes());

    Router::new()
        .route("/health", get(health::health_check))
        .nest(urls::BASE, user)
}

pub use models::*;
pub use response::ActionResponse;
