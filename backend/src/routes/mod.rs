//! Route definitions for the Scrap Link API

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::{handlers, middleware::session_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/listings", listing_routes())
        .nest("/pickup-requests", pickup_routes())
        .nest("/transactions", transaction_routes())
        .nest("/admin", admin_routes())
        .route_layer(middleware::from_fn_with_state(state, session_middleware))
        // Health check (no session needed)
        .route("/health", get(handlers::health_check))
}

/// Admin sign-in and session routes
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/login", post(handlers::admin_login))
        .route("/session", get(handlers::get_session))
        .route("/sign-out", post(handlers::sign_out))
}

/// Listing routes
fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_listing))
        .route("/nearby", get(handlers::nearby_listings))
        .route("/categories", get(handlers::listing_categories))
        .route("/mine", get(handlers::my_listings))
        .route("/price-estimate", post(handlers::price_estimate))
        .route("/price-estimate/batch", post(handlers::price_estimate_batch))
        .route("/:scrap_id", get(handlers::get_listing))
}

/// Pickup request lifecycle routes
fn pickup_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_pickup_request))
        .route("/incoming", get(handlers::seller_pickup_requests))
        .route("/mine", get(handlers::recycler_pickup_requests))
        .route("/:request_id/accept", post(handlers::accept_pickup_request))
        .route("/:request_id/reject", post(handlers::reject_pickup_request))
        .route("/:request_id/complete", post(handlers::complete_pickup_request))
        .route("/:request_id/resend", post(handlers::resend_pickup_notification))
}

/// Transaction routes
fn transaction_routes() -> Router<AppState> {
    Router::new().route("/mine", get(handlers::my_transactions))
}

/// Admin moderation routes
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::admin_list_users))
        .route(
            "/users/:user_id",
            patch(handlers::admin_update_user_role).delete(handlers::admin_delete_user),
        )
        .route("/listings", get(handlers::admin_list_listings))
        .route(
            "/listings/:scrap_id",
            patch(handlers::admin_update_listing_status).delete(handlers::admin_delete_listing),
        )
        .route(
            "/listings/:scrap_id/flags",
            post(handlers::admin_flag_listing).get(handlers::admin_listing_flags),
        )
        .route("/pickup-requests", get(handlers::admin_list_pickup_requests))
        .route(
            "/pickup-requests/:request_id",
            patch(handlers::admin_update_pickup_status),
        )
        .route(
            "/pickup-requests/:request_id/flags",
            post(handlers::admin_flag_pickup_request).get(handlers::admin_pickup_request_flags),
        )
        .route("/transactions", get(handlers::admin_list_transactions))
        .route(
            "/transactions/:transaction_id",
            patch(handlers::admin_update_transaction_status),
        )
}
