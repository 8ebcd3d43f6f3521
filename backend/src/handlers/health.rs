//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::services::ListingService;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
    pub price_oracle: String,
}

/// Health check endpoint handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.gateway.ping().await {
        Ok(()) => "connected".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "database health check failed");
            "disconnected".to_string()
        }
    };

    let listings = ListingService::new(state.gateway.clone(), state.price_oracle.clone());
    let price_oracle = if listings.oracle_healthy().await {
        "available"
    } else {
        "unavailable"
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        price_oracle: price_oracle.to_string(),
    })
}
