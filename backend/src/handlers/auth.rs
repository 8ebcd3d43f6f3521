//! Authentication handlers

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::CurrentSession;
use crate::services::auth::{AdminLoginInput, AdminToken};
use crate::services::AuthService;
use crate::session::SessionSnapshot;
use crate::AppState;

/// Admin login endpoint handler
pub async fn admin_login(
    State(state): State<AppState>,
    Json(body): Json<AdminLoginInput>,
) -> AppResult<Json<AdminToken>> {
    let auth_service = AuthService::new(state.gateway.clone(), &state.config);
    Ok(Json(auth_service.admin_login(body).await?))
}

/// Who the caller is, as far as this request is concerned
pub async fn get_session(CurrentSession(session): CurrentSession) -> Json<SessionSnapshot> {
    Json(session.snapshot())
}

/// Sign-out hook; tokens are stateless, so the client discards its token
pub async fn sign_out(CurrentSession(mut session): CurrentSession) -> Json<SessionSnapshot> {
    if let Some(user) = session.current_user() {
        tracing::info!(user_id = %user.user_id, "user signed out");
    } else if let Some(admin) = session.current_admin() {
        tracing::info!(admin_id = %admin.admin_id, "admin signed out");
    }
    session.sign_out();
    Json(session.snapshot())
}
