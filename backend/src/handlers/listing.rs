//! Scrap listing HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared::{DiscoveredListing, DiscoveryQuery, ScrapListing};

use crate::error::AppResult;
use crate::external::PricePrediction;
use crate::middleware::CurrentSession;
use crate::services::listing::{CategoriesResponse, CreateListingInput, PriceEstimateInput};
use crate::services::ListingService;
use crate::AppState;

fn listing_service(state: &AppState) -> ListingService {
    ListingService::new(state.gateway.clone(), state.price_oracle.clone())
}

/// Post a new listing
pub async fn create_listing(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(input): Json<CreateListingInput>,
) -> AppResult<(StatusCode, Json<ScrapListing>)> {
    let listing = listing_service(&state).create_listing(&session, input).await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

/// Available listings around the viewer, filtered and sorted
pub async fn nearby_listings(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(query): Query<DiscoveryQuery>,
) -> AppResult<Json<Vec<DiscoveredListing>>> {
    Ok(Json(listing_service(&state).nearby(&session, &query).await?))
}

pub async fn listing_categories(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> AppResult<Json<CategoriesResponse>> {
    Ok(Json(listing_service(&state).categories(&session).await?))
}

/// The caller's own listings
pub async fn my_listings(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> AppResult<Json<Vec<ScrapListing>>> {
    Ok(Json(listing_service(&state).mine(&session).await?))
}

pub async fn get_listing(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(scrap_id): Path<Uuid>,
) -> AppResult<Json<ScrapListing>> {
    Ok(Json(listing_service(&state).get(&session, scrap_id).await?))
}

pub async fn price_estimate(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(input): Json<PriceEstimateInput>,
) -> AppResult<Json<PricePrediction>> {
    Ok(Json(listing_service(&state).price_estimate(&session, input).await?))
}

pub async fn price_estimate_batch(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(inputs): Json<Vec<PriceEstimateInput>>,
) -> AppResult<Json<Vec<PricePrediction>>> {
    Ok(Json(
        listing_service(&state)
            .price_estimate_batch(&session, inputs)
            .await?,
    ))
}
