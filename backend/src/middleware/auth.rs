//! Authentication middleware
//!
//! Verifies the bearer token (if any), resolves it to an identity and stores
//! the resulting session context in the request extensions.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::{AppError, AppResult};
use crate::services::AuthService;
use crate::session::SessionContext;
use crate::AppState;

fn bearer_token(headers: &HeaderMap) -> AppResult<Option<&str>> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".to_string()))?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim())),
        _ => Err(AppError::Unauthorized(
            "Missing or invalid Authorization header".to_string(),
        )),
    }
}

/// Build the session for this request. No token means an anonymous session;
/// a bad token is rejected outright.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut session = SessionContext::loading();

    let identity = match bearer_token(request.headers()) {
        Ok(None) => None,
        Ok(Some(token)) => {
            let auth = AuthService::new(state.gateway.clone(), &state.config);
            let resolved = match auth.verify_token(token) {
                Ok(claims) => auth.resolve_identity(&claims).await,
                Err(e) => Err(e),
            };
            match resolved {
                Ok(identity) => identity,
                Err(e) => return e.into_response(),
            }
        }
        Err(e) => return e.into_response(),
    };

    session.init(identity);
    request.extensions_mut().insert(session);

    next.run(request).await
}

/// Extractor for the request's session context
/// Use this in handlers to pass the session to services
#[derive(Clone, Debug)]
pub struct CurrentSession(pub SessionContext);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Without the middleware the identity was never resolved
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .map(CurrentSession)
            .ok_or(AppError::SessionLoading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Ok(None)));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).unwrap(), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert!(matches!(bearer_token(&headers), Err(AppError::Unauthorized(_))));
    }
}
