//! # Usergate Gateway Crate
//!
//! HTTP surface of the user module: login, logout and social-network
//! authentication, public profiles and the settings of the logged-in user.
//!
//! ## Architecture
//!
//! - **REST**: one handler per controller action, documented with OpenAPI
//! - **Dispatch**: verb filter, authenticator and access policy per action
//! - **State**: shared services and registered auth clients
//! - **Middleware**: token authentication and request tracing
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use usergate_auth::AuthClientCollection;
//! use usergate_config::AuthConfig;
//! use usergate_gateway::{create_router, GatewayState};
//! use usergate_users::{EventBus, MemoryDirectory, Repositories};
//!
//! # async fn run() -> std::io::Result<()> {
//! let repositories = Repositories::for_directory(Arc::new(MemoryDirectory::new()), false);
//! let state = GatewayState::new(
//!     repositories,
//!     Arc::new(EventBus::new()),
//!     AuthClientCollection::new(),
//!     AuthConfig::default(),
//! );
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:7070").await?;
//! axum::serve(listener, app).await
//! # }
//! ```

pub mod access;
pub mod dispatch;
pub mod docs;
pub mod error;
pub mod middleware;
pub mod rest;
pub mod state;

// Re-export main types for convenience
pub use access::{AccessPolicy, AccessRule, Decision, Role};
pub use dispatch::{ActionSpec, Controller, Controllers};
pub use error::{GatewayError, GatewayResult};
pub use state::GatewayState;

use axum::{
    http::{header, Method},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Create the main application router with all routes
pub fn create_router(state: GatewayState) -> Router {
    let arc_state = Arc::new(state);
    #[allow(unused_mut)]
    let mut router = Router::new()
        .merge(rest::create_rest_routes().with_state(arc_state))
        // Tokens travel in a header or the query string, so no credentials
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
                .allow_headers(Any)
                .expose_headers([header::LOCATION, header::ALLOW]),
        )
        .layer(middleware::create_trace_middleware());

    // Add Swagger UI if in debug mode
    #[cfg(debug_assertions)]
    {
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        router = router.merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
        );
    }

    router
}
