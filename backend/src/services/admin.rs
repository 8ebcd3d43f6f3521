//! Admin moderation of users, listings, pickup requests and transactions
//!
//! Every operation requires an admin session. Listing and pickup statuses may
//! only move forward; pickup overrides reuse the seller's conditional writes.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use shared::{
    validate_flag_reason, FlagTarget, ListingStatus, ModerationFlag, NewFlag, PickupRequest,
    PickupStatus, ScrapListing, Transaction, TransactionStatus, UserProfile, UserRole,
};

use crate::error::{AppError, AppResult};
use crate::gateway::PersistenceGateway;
use crate::services::notification::NotificationOutbox;
use crate::services::PickupService;
use crate::session::SessionContext;

#[derive(Clone)]
pub struct AdminService {
    gateway: Arc<dyn PersistenceGateway>,
    pickups: PickupService,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleInput {
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct UpdateListingStatusInput {
    pub status: ListingStatus,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePickupStatusInput {
    pub status: PickupStatus,
    /// Slot to confirm when accepting; defaults to the first proposed slot
    #[serde(default)]
    pub pickup_slot: Option<String>,
    /// Required when completing
    #[serde(default)]
    pub final_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct FlagInput {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTransactionStatusInput {
    pub status: TransactionStatus,
}

impl AdminService {
    pub fn new(gateway: Arc<dyn PersistenceGateway>, outbox: NotificationOutbox) -> Self {
        Self {
            pickups: PickupService::new(gateway.clone(), outbox),
            gateway,
        }
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn list_users(&self, session: &SessionContext) -> AppResult<Vec<UserProfile>> {
        session.require_admin()?;
        Ok(self.gateway.list_users().await?)
    }

    pub async fn update_user_role(
        &self,
        session: &SessionContext,
        user_id: Uuid,
        input: UpdateRoleInput,
    ) -> AppResult<UserProfile> {
        let admin = session.require_admin()?;
        let user = self.gateway.update_user_role(user_id, input.role).await?;
        tracing::info!(admin_id = %admin.admin_id, %user_id, role = %input.role.as_str(), "user role changed");
        Ok(user)
    }

    pub async fn delete_user(&self, session: &SessionContext, user_id: Uuid) -> AppResult<()> {
        let admin = session.require_admin()?;
        self.gateway.delete_user(user_id).await?;
        tracing::info!(admin_id = %admin.admin_id, %user_id, "user deleted");
        Ok(())
    }

    // ========================================================================
    // Listings
    // ========================================================================

    pub async fn list_listings(&self, session: &SessionContext) -> AppResult<Vec<ScrapListing>> {
        session.require_admin()?;
        Ok(self.gateway.list_all_listings().await?)
    }

    pub async fn update_listing_status(
        &self,
        session: &SessionContext,
        scrap_id: Uuid,
        input: UpdateListingStatusInput,
    ) -> AppResult<ScrapListing> {
        let admin = session.require_admin()?;
        let listing = self
            .gateway
            .get_listing(scrap_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Scrap listing".to_string()))?;

        if !listing.status.can_transition_to(input.status) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot move listing from {} to {}",
                listing.status, input.status
            )));
        }

        let updated = self.gateway.update_listing_status(scrap_id, input.status).await?;
        tracing::info!(admin_id = %admin.admin_id, %scrap_id, status = updated.status.as_str(), "listing status changed");
        Ok(updated)
    }

    pub async fn delete_listing(&self, session: &SessionContext, scrap_id: Uuid) -> AppResult<()> {
        let admin = session.require_admin()?;
        self.gateway.delete_listing(scrap_id).await?;
        tracing::info!(admin_id = %admin.admin_id, %scrap_id, "listing deleted");
        Ok(())
    }

    // ========================================================================
    // Pickup requests
    // ========================================================================

    pub async fn list_pickup_requests(&self, session: &SessionContext) -> AppResult<Vec<PickupRequest>> {
        session.require_admin()?;
        Ok(self.gateway.list_all_pickup_requests().await?)
    }

    pub async fn update_pickup_status(
        &self,
        session: &SessionContext,
        request_id: Uuid,
        input: UpdatePickupStatusInput,
    ) -> AppResult<PickupRequest> {
        let admin = session.require_admin()?;
        let updated = self
            .pickups
            .override_status(
                request_id,
                input.status,
                input.pickup_slot.as_deref(),
                input.final_price,
            )
            .await?;
        tracing::info!(admin_id = %admin.admin_id, %request_id, status = updated.pickup_status.as_str(), "pickup status changed");
        Ok(updated)
    }

    // ========================================================================
    // Flags
    // ========================================================================

    pub async fn flag_listing(
        &self,
        session: &SessionContext,
        scrap_id: Uuid,
        input: FlagInput,
    ) -> AppResult<ModerationFlag> {
        session.require_admin()?;
        if self.gateway.get_listing(scrap_id).await?.is_none() {
            return Err(AppError::NotFound("Scrap listing".to_string()));
        }
        self.raise_flag(session, FlagTarget::Listing, scrap_id, &input.reason)
            .await
    }

    pub async fn flag_pickup_request(
        &self,
        session: &SessionContext,
        request_id: Uuid,
        input: FlagInput,
    ) -> AppResult<ModerationFlag> {
        session.require_admin()?;
        if self.gateway.get_pickup_request(request_id).await?.is_none() {
            return Err(AppError::NotFound("Pickup request".to_string()));
        }
        self.raise_flag(session, FlagTarget::PickupRequest, request_id, &input.reason)
            .await
    }

    /// Flags on one listing or request, newest first
    pub async fn list_flags(
        &self,
        session: &SessionContext,
        target: FlagTarget,
        target_id: Uuid,
    ) -> AppResult<Vec<ModerationFlag>> {
        session.require_admin()?;
        Ok(self.gateway.list_flags(target, target_id).await?)
    }

    async fn raise_flag(
        &self,
        session: &SessionContext,
        target: FlagTarget,
        target_id: Uuid,
        reason: &str,
    ) -> AppResult<ModerationFlag> {
        let admin = session.require_admin()?;
        let reason = validate_flag_reason(reason).map_err(|msg| AppError::validation("reason", msg))?;

        let flag = self
            .gateway
            .insert_flag(NewFlag {
                target,
                target_id,
                reason: reason.to_string(),
                flagged_by: Some(admin.admin_id),
            })
            .await?;
        tracing::info!(admin_id = %admin.admin_id, target = target.as_str(), %target_id, "content flagged");
        Ok(flag)
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    pub async fn list_transactions(&self, session: &SessionContext) -> AppResult<Vec<Transaction>> {
        session.require_admin()?;
        Ok(self.gateway.list_all_transactions().await?)
    }

    pub async fn update_transaction_status(
        &self,
        session: &SessionContext,
        transaction_id: Uuid,
        input: UpdateTransactionStatusInput,
    ) -> AppResult<Transaction> {
        let admin = session.require_admin()?;
        let updated = self
            .gateway
            .update_transaction_status(transaction_id, input.status)
            .await?;
        tracing::info!(admin_id = %admin.admin_id, %transaction_id, status = updated.status.as_str(), "transaction status changed");
        Ok(updated)
    }
}
