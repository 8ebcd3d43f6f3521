//! Pickup request lifecycle: create, accept, reject, complete, resend
//!
//! States move `pending -> accepted -> completed`; rejecting deletes the request.
//! Emails are queued on the outbox after the write they describe and never
//! affect the outcome of the transition.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::{
    normalize_proposed_slots, validate_chosen_slot, validate_final_price, CompletePickup,
    ContactInfo, ListingStatus, NewPickupRequest, PickupRequest, PickupStatus,
    RecyclerRequestView, ScrapListing, SellerRequestView, StatusFilter, Transaction, UserProfile,
    UserRole,
};

use crate::error::{AppError, AppResult};
use crate::gateway::PersistenceGateway;
use crate::services::notification::{
    new_request_email, request_confirmation_email, slot_confirmed_email, EmailKind,
    NotificationOutbox, OutboundEmail,
};
use crate::session::SessionContext;

/// Pickup request service
#[derive(Clone)]
pub struct PickupService {
    gateway: Arc<dyn PersistenceGateway>,
    outbox: NotificationOutbox,
}

#[derive(Debug, Deserialize)]
pub struct CreatePickupRequestInput {
    pub scrap_id: Uuid,
    #[serde(default)]
    pub proposed_slots: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AcceptPickupInput {
    #[serde(default)]
    pub pickup_slot: String,
}

/// An accepted request and whether its slot confirmation made it onto the outbox
#[derive(Debug, Serialize)]
pub struct AcceptedPickup {
    #[serde(flatten)]
    pub request: PickupRequest,
    /// `false` when the recycler could not be reached; the seller may resend later
    pub notification_queued: bool,
}

#[derive(Debug, Deserialize)]
pub struct CompletePickupInput {
    pub final_price: Decimal,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecyclerRequestQuery {
    #[serde(default)]
    pub status: StatusFilter,
}

impl PickupService {
    pub fn new(gateway: Arc<dyn PersistenceGateway>, outbox: NotificationOutbox) -> Self {
        Self { gateway, outbox }
    }

    /// Recycler asks to collect a listing
    pub async fn create(
        &self,
        session: &SessionContext,
        input: CreatePickupRequestInput,
    ) -> AppResult<PickupRequest> {
        let recycler = session.require_role(UserRole::Recycler)?;
        let proposed_slots = normalize_proposed_slots(&input.proposed_slots)
            .map_err(|msg| AppError::validation("proposed_slots", msg))?;

        let listing = self.load_listing(input.scrap_id).await?;
        if listing.user_id == recycler.user_id {
            return Err(AppError::Forbidden(
                "You cannot request pickup of your own listing".to_string(),
            ));
        }
        if listing.status != ListingStatus::Available {
            return Err(AppError::conflict(
                "scrap_listing",
                format!("Listing is {} and no longer takes requests", listing.status),
            ));
        }

        let request = self
            .gateway
            .insert_pickup_request(NewPickupRequest {
                scrap_id: listing.scrap_id,
                recycler_id: recycler.user_id,
                proposed_slots,
            })
            .await?;

        tracing::info!(
            request_id = %request.request_id,
            scrap_id = %listing.scrap_id,
            recycler_id = %recycler.user_id,
            "pickup request created"
        );

        match self.contact_of(listing.user_id, "seller").await {
            Some(seller) => {
                self.outbox.enqueue(OutboundEmail {
                    kind: EmailKind::NewPickupRequest,
                    request_id: request.request_id,
                    params: new_request_email(
                        &seller,
                        &recycler.name,
                        &listing.scrap_type,
                        &request.proposed_slots,
                    ),
                });
            }
            None => tracing::warn!(
                request_id = %request.request_id,
                "seller contact unavailable, new request email skipped"
            ),
        }

        self.outbox.enqueue(OutboundEmail {
            kind: EmailKind::RequestConfirmation,
            request_id: request.request_id,
            params: request_confirmation_email(
                &recycler.contact(),
                &listing.scrap_type,
                &request.proposed_slots,
            ),
        });

        Ok(request)
    }

    /// Seller accepts a pending request for the chosen slot
    pub async fn accept(
        &self,
        session: &SessionContext,
        request_id: Uuid,
        input: AcceptPickupInput,
    ) -> AppResult<AcceptedPickup> {
        let seller = session.require_user()?;
        let slot = validate_chosen_slot(&input.pickup_slot)
            .map_err(|msg| AppError::validation("pickup_slot", msg))?;

        let (request, listing) = self.load_owned(seller, request_id).await?;
        self.commit_accept(&request, &listing, slot, Some(&seller.name)).await
    }

    /// Seller declines a pending request; the request is deleted
    pub async fn reject(&self, session: &SessionContext, request_id: Uuid) -> AppResult<()> {
        let seller = session.require_user()?;
        let (request, _) = self.load_owned(seller, request_id).await?;
        if request.pickup_status != PickupStatus::Pending {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot reject a request that is {}",
                request.pickup_status
            )));
        }

        self.gateway.delete_pickup_request(request_id).await?;
        tracing::info!(%request_id, "pickup request rejected");
        Ok(())
    }

    /// Seller records the collection and the agreed price
    pub async fn complete(
        &self,
        session: &SessionContext,
        request_id: Uuid,
        input: CompletePickupInput,
    ) -> AppResult<Transaction> {
        let seller = session.require_user()?;
        validate_final_price(input.final_price)
            .map_err(|msg| AppError::validation("final_price", msg))?;

        let (request, listing) = self.load_owned(seller, request_id).await?;
        self.commit_complete(&request, &listing, input.final_price).await
    }

    /// Move a request forward on an admin's behalf. Goes through the same
    /// conditional writes as the seller so the listing follows the request.
    pub async fn override_status(
        &self,
        request_id: Uuid,
        status: PickupStatus,
        pickup_slot: Option<&str>,
        final_price: Option<Decimal>,
    ) -> AppResult<PickupRequest> {
        let request = self.load_request(request_id).await?;
        let refused = || {
            AppError::InvalidStateTransition(format!(
                "Cannot move pickup request from {} to {}",
                request.pickup_status, status
            ))
        };
        if !request.pickup_status.can_transition_to(status) {
            return Err(refused());
        }
        let listing = self.load_listing(request.scrap_id).await?;

        match status {
            PickupStatus::Accepted => {
                let slot = pickup_slot
                    .or_else(|| request.proposed_slots.first().map(String::as_str))
                    .unwrap_or_default();
                let slot = validate_chosen_slot(slot)
                    .map_err(|msg| AppError::validation("pickup_slot", msg))?;
                let seller_name = self
                    .contact_of(listing.user_id, "seller")
                    .await
                    .and_then(|contact| contact.name);
                let accepted = self
                    .commit_accept(&request, &listing, slot, seller_name.as_deref())
                    .await?;
                Ok(accepted.request)
            }
            PickupStatus::Completed => {
                let final_price = final_price.ok_or_else(|| {
                    AppError::validation("final_price", "A final price is required to complete a pickup")
                })?;
                validate_final_price(final_price)
                    .map_err(|msg| AppError::validation("final_price", msg))?;
                self.commit_complete(&request, &listing, final_price).await?;
                self.load_request(request_id).await
            }
            PickupStatus::Pending => Err(refused()),
        }
    }

    /// Queue the slot-confirmed email again; nothing else changes
    pub async fn resend(&self, session: &SessionContext, request_id: Uuid) -> AppResult<()> {
        let seller = session.require_user()?;
        let (request, listing) = self.load_owned(seller, request_id).await?;
        if request.confirmed_slot().is_none() {
            return Err(AppError::InvalidStateTransition(
                "No pickup slot has been confirmed for this request".to_string(),
            ));
        }

        if !self
            .queue_slot_confirmation(Some(&seller.name), &request, &listing)
            .await
        {
            return Err(AppError::NotFound("Recycler contact".to_string()));
        }
        tracing::info!(%request_id, "slot confirmation re-queued");
        Ok(())
    }

    /// Requests on the seller's listings, newest first
    pub async fn list_for_seller(&self, session: &SessionContext) -> AppResult<Vec<SellerRequestView>> {
        let seller = session.require_user()?;
        let rows = self.gateway.list_requests_for_seller(seller.user_id).await?;

        let recyclers = self
            .contacts_for(rows.iter().map(|(r, _)| r.recycler_id), "recycler")
            .await;

        Ok(rows
            .into_iter()
            .map(|(request, listing)| SellerRequestView {
                status_label: request.pickup_status.label(),
                recycler: recyclers.get(&request.recycler_id).cloned().flatten(),
                request,
                scrap_listing: listing,
            })
            .collect())
    }

    /// The recycler's own requests, newest first
    pub async fn list_for_recycler(
        &self,
        session: &SessionContext,
        filter: StatusFilter,
    ) -> AppResult<Vec<RecyclerRequestView>> {
        let recycler = session.require_user()?;
        let rows: Vec<_> = self
            .gateway
            .list_requests_for_recycler(recycler.user_id)
            .await?
            .into_iter()
            .filter(|(request, _)| filter.matches(request.pickup_status))
            .collect();

        let sellers = self
            .contacts_for(rows.iter().map(|(_, l)| l.user_id), "seller")
            .await;

        Ok(rows
            .into_iter()
            .map(|(request, listing)| RecyclerRequestView {
                status_label: request.pickup_status.label(),
                seller: sellers.get(&listing.user_id).cloned().flatten(),
                request,
                scrap_listing: listing,
            })
            .collect())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn load_listing(&self, scrap_id: Uuid) -> AppResult<ScrapListing> {
        self.gateway
            .get_listing(scrap_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Scrap listing".to_string()))
    }

    async fn load_request(&self, request_id: Uuid) -> AppResult<PickupRequest> {
        self.gateway
            .get_pickup_request(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Pickup request".to_string()))
    }

    /// Load a request and its listing, checking the listing belongs to `seller`
    async fn load_owned(
        &self,
        seller: &UserProfile,
        request_id: Uuid,
    ) -> AppResult<(PickupRequest, ScrapListing)> {
        let request = self.load_request(request_id).await?;
        let listing = self.load_listing(request.scrap_id).await?;

        if listing.user_id != seller.user_id {
            return Err(AppError::Forbidden(
                "Only the listing owner can manage its pickup requests".to_string(),
            ));
        }
        Ok((request, listing))
    }

    /// Best-effort contact lookup; failures are logged and yield `None`
    async fn contact_of(&self, user_id: Uuid, party: &'static str) -> Option<ContactInfo> {
        match self.gateway.get_user(user_id).await {
            Ok(Some(profile)) => Some(profile.contact()),
            Ok(None) => {
                tracing::warn!(%user_id, party, "contact not found");
                None
            }
            Err(e) => {
                tracing::warn!(%user_id, party, error = %e, "contact lookup failed");
                None
            }
        }
    }

    async fn contacts_for(
        &self,
        user_ids: impl Iterator<Item = Uuid>,
        party: &'static str,
    ) -> HashMap<Uuid, Option<ContactInfo>> {
        let mut contacts = HashMap::new();
        for user_id in user_ids {
            if !contacts.contains_key(&user_id) {
                let contact = self.contact_of(user_id, party).await;
                contacts.insert(user_id, contact);
            }
        }
        contacts
    }

    /// Conditional accept, then queue the slot confirmation
    async fn commit_accept(
        &self,
        request: &PickupRequest,
        listing: &ScrapListing,
        slot: &str,
        seller_name: Option<&str>,
    ) -> AppResult<AcceptedPickup> {
        if !request.pickup_status.can_transition_to(PickupStatus::Accepted) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot accept a request that is {}",
                request.pickup_status
            )));
        }

        let accepted = self
            .gateway
            .accept_pickup_request(request.request_id, slot)
            .await?;

        tracing::info!(
            request_id = %request.request_id,
            scrap_id = %listing.scrap_id,
            pickup_slot = %slot,
            "pickup request accepted"
        );

        let notification_queued = self
            .queue_slot_confirmation(seller_name, &accepted, listing)
            .await;
        if !notification_queued {
            tracing::warn!(
                request_id = %request.request_id,
                "accepted without a queued slot confirmation"
            );
        }
        Ok(AcceptedPickup {
            request: accepted,
            notification_queued,
        })
    }

    /// Atomic completion: request, listing and transaction in one write
    async fn commit_complete(
        &self,
        request: &PickupRequest,
        listing: &ScrapListing,
        final_price: Decimal,
    ) -> AppResult<Transaction> {
        if !request.pickup_status.can_transition_to(PickupStatus::Completed) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot complete a request that is {}",
                request.pickup_status
            )));
        }

        let transaction = self
            .gateway
            .complete_pickup(CompletePickup {
                request_id: request.request_id,
                scrap_id: listing.scrap_id,
                seller_id: listing.user_id,
                recycler_id: request.recycler_id,
                final_price,
            })
            .await?;

        tracing::info!(
            request_id = %request.request_id,
            transaction_id = %transaction.transaction_id,
            final_price = %transaction.final_price,
            "pickup completed"
        );

        Ok(transaction)
    }

    /// Queue the slot-confirmed email; `false` when the recycler cannot be reached
    async fn queue_slot_confirmation(
        &self,
        seller_name: Option<&str>,
        request: &PickupRequest,
        listing: &ScrapListing,
    ) -> bool {
        let Some(slot) = request.confirmed_slot() else {
            return false;
        };
        let Some(recycler) = self.contact_of(request.recycler_id, "recycler").await else {
            tracing::warn!(
                request_id = %request.request_id,
                "recycler contact unavailable, slot confirmation not sent"
            );
            return false;
        };

        self.outbox.enqueue(OutboundEmail {
            kind: EmailKind::SlotConfirmed,
            request_id: request.request_id,
            params: slot_confirmed_email(
                &recycler,
                seller_name,
                &listing.scrap_type,
                listing.weight,
                slot,
            ),
        })
    }
}
