//! Admin moderation HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared::{FlagTarget, ModerationFlag, PickupRequest, ScrapListing, Transaction, UserProfile};

use crate::error::AppResult;
use crate::middleware::CurrentSession;
use crate::services::admin::{
    FlagInput, UpdateListingStatusInput, UpdatePickupStatusInput, UpdateRoleInput,
    UpdateTransactionStatusInput,
};
use crate::services::AdminService;
use crate::AppState;

fn admin_service(state: &AppState) -> AdminService {
    AdminService::new(state.gateway.clone(), state.outbox.clone())
}

pub async fn admin_list_users(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> AppResult<Json<Vec<UserProfile>>> {
    Ok(Json(admin_service(&state).list_users(&session).await?))
}

pub async fn admin_update_user_role(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdateRoleInput>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(
        admin_service(&state)
            .update_user_role(&session, user_id, input)
            .await?,
    ))
}

pub async fn admin_delete_user(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(user_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    admin_service(&state).delete_user(&session, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn admin_list_listings(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> AppResult<Json<Vec<ScrapListing>>> {
    Ok(Json(admin_service(&state).list_listings(&session).await?))
}

pub async fn admin_update_listing_status(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(scrap_id): Path<Uuid>,
    Json(input): Json<UpdateListingStatusInput>,
) -> AppResult<Json<ScrapListing>> {
    Ok(Json(
        admin_service(&state)
            .update_listing_status(&session, scrap_id, input)
            .await?,
    ))
}

pub async fn admin_delete_listing(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(scrap_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    admin_service(&state).delete_listing(&session, scrap_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn admin_list_pickup_requests(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> AppResult<Json<Vec<PickupRequest>>> {
    Ok(Json(admin_service(&state).list_pickup_requests(&session).await?))
}

pub async fn admin_update_pickup_status(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(request_id): Path<Uuid>,
    Json(input): Json<UpdatePickupStatusInput>,
) -> AppResult<Json<PickupRequest>> {
    Ok(Json(
        admin_service(&state)
            .update_pickup_status(&session, request_id, input)
            .await?,
    ))
}

pub async fn admin_flag_listing(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(scrap_id): Path<Uuid>,
    Json(input): Json<FlagInput>,
) -> AppResult<(StatusCode, Json<ModerationFlag>)> {
    let flag = admin_service(&state)
        .flag_listing(&session, scrap_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(flag)))
}

pub async fn admin_listing_flags(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(scrap_id): Path<Uuid>,
) -> AppResult<Json<Vec<ModerationFlag>>> {
    Ok(Json(
        admin_service(&state)
            .list_flags(&session, FlagTarget::Listing, scrap_id)
            .await?,
    ))
}

pub async fn admin_flag_pickup_request(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(request_id): Path<Uuid>,
    Json(input): Json<FlagInput>,
) -> AppResult<(StatusCode, Json<ModerationFlag>)> {
    let flag = admin_service(&state)
        .flag_pickup_request(&session, request_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(flag)))
}

pub async fn admin_pickup_request_flags(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<Vec<ModerationFlag>>> {
    Ok(Json(
        admin_service(&state)
            .list_flags(&session, FlagTarget::PickupRequest, request_id)
            .await?,
    ))
}

pub async fn admin_list_transactions(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> AppResult<Json<Vec<Transaction>>> {
    Ok(Json(admin_service(&state).list_transactions(&session).await?))
}

pub async fn admin_update_transaction_status(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(transaction_id): Path<Uuid>,
    Json(input): Json<UpdateTransactionStatusInput>,
) -> AppResult<Json<Transaction>> {
    Ok(Json(
        admin_service(&state)
            .update_transaction_status(&session, transaction_id, input)
            .await?,
    ))
}
