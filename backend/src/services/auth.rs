//! Token verification and admin sign-in
//!
//! End-user tokens are issued by the hosted auth provider and only verified
//! here. Admin tokens are issued by `admin_login` after a bcrypt check against
//! the `admins` collection.

use std::sync::Arc;

use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::{validate_email, AdminIdentity, Identity};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::gateway::PersistenceGateway;

/// Role claim carried by admin tokens
pub const ADMIN_ROLE: &str = "admin";

/// Role claim carried by end-user tokens from the auth provider
pub const USER_ROLE: &str = "authenticated";

#[derive(Clone)]
pub struct AuthService {
    gateway: Arc<dyn PersistenceGateway>,
    jwt_secret: String,
    admin_token_expiry: i64,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub admin: AdminIdentity,
}

impl AuthService {
    pub fn new(gateway: Arc<dyn PersistenceGateway>, config: &Config) -> Self {
        Self {
            gateway,
            jwt_secret: config.auth.jwt_secret.clone(),
            admin_token_expiry: config.auth.admin_token_expiry,
        }
    }

    /// Check admin credentials and issue an admin token
    pub async fn admin_login(&self, input: AdminLoginInput) -> AppResult<AdminToken> {
        let email = input.email.trim();
        validate_email(email).map_err(|msg| AppError::validation("email", msg))?;

        let account = self
            .gateway
            .find_admin_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let valid = verify(&input.password, &account.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            tracing::warn!(email = %email, "admin sign-in rejected");
            return Err(AppError::InvalidCredentials);
        }

        let admin = AdminIdentity {
            admin_id: account.admin_id,
            email: account.email,
        };
        let access_token =
            self.issue_token(&admin.admin_id.to_string(), ADMIN_ROLE, Some(&admin.email))?;

        tracing::info!(admin_id = %admin.admin_id, "admin signed in");
        Ok(AdminToken {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.admin_token_expiry,
            admin,
        })
    }

    /// Sign a token; also used by tests to stand in for the auth provider
    pub fn issue_token(&self, subject: &str, role: &str, email: Option<&str>) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            role: role.to_string(),
            email: email.map(str::to_string),
            exp: (now + Duration::seconds(self.admin_token_expiry)).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::default();
        // Provider tokens carry an `aud` we do not check
        validation.validate_aud = false;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
    }

    /// Resolve verified claims to the identity they name.
    /// `None` when the user has no profile (yet).
    pub async fn resolve_identity(&self, claims: &Claims) -> AppResult<Option<Identity>> {
        let subject = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid subject in token".to_string()))?;

        if claims.role == ADMIN_ROLE {
            return Ok(Some(Identity::Admin(AdminIdentity {
                admin_id: subject,
                email: claims.email.clone().unwrap_or_default(),
            })));
        }

        let profile = self.gateway.get_user(subject).await?;
        if profile.is_none() {
            tracing::debug!(user_id = %subject, "token has no matching profile");
        }
        Ok(profile.map(Identity::User))
    }
}
