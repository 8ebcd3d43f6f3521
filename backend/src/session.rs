//! Session context: who is acting, and whether that is known yet
//!
//! A session starts `Loading`, is resolved once by `init`, and afterwards only
//! changes through `on_identity_change` or `sign_out`. Services take the
//! session explicitly and refuse to touch the gateway until it is resolved.

use serde::Serialize;

use shared::{AdminIdentity, Identity, UserProfile, UserRole};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Loading,
    Anonymous,
    User(UserProfile),
    Admin(AdminIdentity),
}

/// Read-only view reported to clients
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub current_user: Option<UserProfile>,
    pub current_admin: Option<AdminIdentity>,
    pub loading: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    state: SessionState,
}

impl SessionContext {
    /// A session whose identity has not been resolved yet
    pub fn loading() -> Self {
        Self::default()
    }

    /// Resolve the session from the identity found (or not) for the caller.
    /// Has no effect once the session is resolved.
    pub fn init(&mut self, identity: Option<Identity>) {
        if self.is_loading() {
            self.state = Self::state_for(identity);
        }
    }

    /// Replace the identity, e.g. after the auth provider reports a new sign-in
    pub fn on_identity_change(&mut self, identity: Option<Identity>) {
        self.state = Self::state_for(identity);
    }

    pub fn sign_out(&mut self) {
        self.state = SessionState::Anonymous;
    }

    fn state_for(identity: Option<Identity>) -> SessionState {
        match identity {
            Some(Identity::User(profile)) => SessionState::User(profile),
            Some(Identity::Admin(admin)) => SessionState::Admin(admin),
            None => SessionState::Anonymous,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, SessionState::Loading)
    }

    pub fn current_user(&self) -> Option<&UserProfile> {
        match &self.state {
            SessionState::User(profile) => Some(profile),
            _ => None,
        }
    }

    pub fn current_admin(&self) -> Option<&AdminIdentity> {
        match &self.state {
            SessionState::Admin(admin) => Some(admin),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_user: self.current_user().cloned(),
            current_admin: self.current_admin().cloned(),
            loading: self.is_loading(),
        }
    }

    // ========================================================================
    // Guards
    // ========================================================================

    /// The signed-in end user
    pub fn require_user(&self) -> AppResult<&UserProfile> {
        match &self.state {
            SessionState::Loading => Err(AppError::SessionLoading),
            SessionState::User(profile) => Ok(profile),
            _ => Err(AppError::Unauthorized("Sign in required".to_string())),
        }
    }

    /// The signed-in end user, who must hold `role`
    pub fn require_role(&self, role: UserRole) -> AppResult<&UserProfile> {
        let profile = self.require_user()?;
        if profile.role != role {
            return Err(AppError::Forbidden(format!("Only a {} can do this", role)));
        }
        Ok(profile)
    }

    pub fn require_admin(&self) -> AppResult<&AdminIdentity> {
        match &self.state {
            SessionState::Loading => Err(AppError::SessionLoading),
            SessionState::Admin(admin) => Ok(admin),
            SessionState::User(_) => Err(AppError::Forbidden("Admin access required".to_string())),
            SessionState::Anonymous => Err(AppError::Unauthorized("Admin sign-in required".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn recycler() -> UserProfile {
        UserProfile {
            user_id: Uuid::new_v4(),
            name: "Rita".to_string(),
            email: "rita@example.com".to_string(),
            phone: None,
            role: UserRole::Recycler,
            latitude: None,
            longitude: None,
            registered_at: Utc::now(),
        }
    }

    #[test]
    fn test_loading_session_blocks_everything() {
        let session = SessionContext::loading();
        assert!(session.is_loading());
        assert!(matches!(session.require_user(), Err(AppError::SessionLoading)));
        assert!(matches!(session.require_admin(), Err(AppError::SessionLoading)));
    }

    #[test]
    fn test_init_only_resolves_once() {
        let mut session = SessionContext::loading();
        session.init(Some(Identity::User(recycler())));
        assert!(session.current_user().is_some());

        session.init(None);
        assert!(session.current_user().is_some());
    }

    #[test]
    fn test_identity_change_and_sign_out() {
        let mut session = SessionContext::loading();
        session.init(None);
        assert!(matches!(session.require_user(), Err(AppError::Unauthorized(_))));

        session.on_identity_change(Some(Identity::Admin(AdminIdentity {
            admin_id: Uuid::new_v4(),
            email: "admin@example.com".to_string(),
        })));
        assert!(session.require_admin().is_ok());
        assert!(matches!(session.require_user(), Err(AppError::Unauthorized(_))));

        session.sign_out();
        let snapshot = session.snapshot();
        assert!(snapshot.current_admin.is_none());
        assert!(!snapshot.loading);
    }

    #[test]
    fn test_role_guard() {
        let mut session = SessionContext::loading();
        session.init(Some(Identity::User(recycler())));
        assert!(session.require_role(UserRole::Recycler).is_ok());
        assert!(matches!(session.require_role(UserRole::Seller), Err(AppError::Forbidden(_))));
        assert!(matches!(session.require_admin(), Err(AppError::Forbidden(_))));
    }
}
