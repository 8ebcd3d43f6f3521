//! Scrap Link marketplace backend
//!
//! Sellers list scrap, recyclers request pickups, sellers schedule and
//! complete them. Persistence, email and price prediction are external
//! collaborators behind traits so the whole flow runs against in-memory
//! stand-ins in tests.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod external;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod session;

pub use config::Config;

use external::PriceOracle;
use gateway::PersistenceGateway;
use services::NotificationOutbox;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn PersistenceGateway>,
    pub config: Arc<Config>,
    pub outbox: NotificationOutbox,
    pub price_oracle: Arc<dyn PriceOracle>,
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Scrap Link Marketplace API v1.0"
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
