//! Transaction HTTP handlers

use axum::{extract::State, Json};

use shared::Transaction;

use crate::error::AppResult;
use crate::middleware::CurrentSession;
use crate::services::TransactionService;
use crate::AppState;

pub async fn my_transactions(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> AppResult<Json<Vec<Transaction>>> {
    let service = TransactionService::new(state.gateway.clone());
    Ok(Json(service.mine(&session).await?))
}
