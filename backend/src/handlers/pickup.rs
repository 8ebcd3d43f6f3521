//! Pickup request HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared::{PickupRequest, RecyclerRequestView, SellerRequestView, Transaction};

use crate::error::AppResult;
use crate::middleware::CurrentSession;
use crate::services::pickup::{
    AcceptPickupInput, AcceptedPickup, CompletePickupInput, CreatePickupRequestInput,
    RecyclerRequestQuery,
};
use crate::services::PickupService;
use crate::AppState;

fn pickup_service(state: &AppState) -> PickupService {
    PickupService::new(state.gateway.clone(), state.outbox.clone())
}

/// Recycler requests pickup of a listing
pub async fn create_pickup_request(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(input): Json<CreatePickupRequestInput>,
) -> AppResult<(StatusCode, Json<PickupRequest>)> {
    let request = pickup_service(&state).create(&session, input).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Requests on the caller's listings
pub async fn seller_pickup_requests(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> AppResult<Json<Vec<SellerRequestView>>> {
    Ok(Json(pickup_service(&state).list_for_seller(&session).await?))
}

/// The caller's own requests, optionally filtered by status
pub async fn recycler_pickup_requests(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(query): Query<RecyclerRequestQuery>,
) -> AppResult<Json<Vec<RecyclerRequestView>>> {
    Ok(Json(
        pickup_service(&state)
            .list_for_recycler(&session, query.status)
            .await?,
    ))
}

pub async fn accept_pickup_request(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(request_id): Path<Uuid>,
    Json(input): Json<AcceptPickupInput>,
) -> AppResult<Json<AcceptedPickup>> {
    Ok(Json(
        pickup_service(&state)
            .accept(&session, request_id, input)
            .await?,
    ))
}

pub async fn reject_pickup_request(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(request_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    pickup_service(&state).reject(&session, request_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn complete_pickup_request(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(request_id): Path<Uuid>,
    Json(input): Json<CompletePickupInput>,
) -> AppResult<(StatusCode, Json<Transaction>)> {
    let transaction = pickup_service(&state)
        .complete(&session, request_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// Send the slot confirmation email again
pub async fn resend_pickup_notification(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(request_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    pickup_service(&state).resend(&session, request_id).await?;
    Ok(StatusCode::ACCEPTED)
}
