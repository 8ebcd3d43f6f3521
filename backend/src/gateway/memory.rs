//! In-memory gateway implementation, used by tests and the `memory` backend

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use shared::{
    CompletePickup, FlagTarget, ListingStatus, ModerationFlag, NewFlag, NewListing,
    NewPickupRequest, PickupRequest, PickupStatus, ScrapListing, Transaction, TransactionStatus,
    UserProfile, UserRole, PENDING_SLOT_SENTINEL,
};

use super::{AdminAccount, GatewayError, GatewayResult, PersistenceGateway, RequestWithListing};

#[derive(Default)]
struct Collections {
    users: HashMap<Uuid, UserProfile>,
    admins: HashMap<String, AdminAccount>,
    /// Insertion order is kept so newest-first ties resolve deterministically
    listings: Vec<ScrapListing>,
    requests: Vec<PickupRequest>,
    transactions: Vec<Transaction>,
    flags: Vec<ModerationFlag>,
}

/// In-memory store holding every collection behind a single lock
#[derive(Default)]
pub struct InMemoryGateway {
    data: RwLock<Collections>,
    fail_user_lookups: AtomicBool,
    fail_transaction_inserts: AtomicBool,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user profile (profiles are created by the auth provider in production)
    pub fn seed_user(&self, profile: UserProfile) -> GatewayResult<()> {
        self.write()?.users.insert(profile.user_id, profile);
        Ok(())
    }

    pub fn seed_admin(&self, admin: AdminAccount) -> GatewayResult<()> {
        self.write()?.admins.insert(admin.email.to_lowercase(), admin);
        Ok(())
    }

    /// Make `get_user` fail (for testing best-effort joins)
    pub fn set_fail_user_lookups(&self, fail: bool) {
        self.fail_user_lookups.store(fail, Ordering::SeqCst);
    }

    /// Make the transaction insert inside `complete_pickup` fail (for testing atomicity)
    pub fn set_fail_transaction_inserts(&self, fail: bool) {
        self.fail_transaction_inserts.store(fail, Ordering::SeqCst);
    }

    fn read(&self) -> GatewayResult<RwLockReadGuard<'_, Collections>> {
        self.data
            .read()
            .map_err(|_| GatewayError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> GatewayResult<RwLockWriteGuard<'_, Collections>> {
        self.data
            .write()
            .map_err(|_| GatewayError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

impl Collections {
    fn listing(&self, scrap_id: Uuid) -> Option<&ScrapListing> {
        self.listings.iter().find(|l| l.scrap_id == scrap_id)
    }

    fn listing_mut(&mut self, scrap_id: Uuid) -> Option<&mut ScrapListing> {
        self.listings.iter_mut().find(|l| l.scrap_id == scrap_id)
    }

    fn request_mut(&mut self, request_id: Uuid) -> Option<&mut PickupRequest> {
        self.requests.iter_mut().find(|r| r.request_id == request_id)
    }

    fn joined_newest_first<F>(&self, keep: F) -> Vec<RequestWithListing>
    where
        F: Fn(&PickupRequest, &ScrapListing) -> bool,
    {
        let mut rows: Vec<RequestWithListing> = self
            .requests
            .iter()
            .rev()
            .filter_map(|r| self.listing(r.scrap_id).map(|l| (r.clone(), l.clone())))
            .filter(|(r, l)| keep(r, l))
            .collect();
        rows.sort_by(|a, b| b.0.request_date.cmp(&a.0.request_date));
        rows
    }
}

fn newest_listings_first(mut listings: Vec<ScrapListing>) -> Vec<ScrapListing> {
    listings.reverse();
    listings.sort_by(|a, b| b.posted_date.cmp(&a.posted_date));
    listings
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn ping(&self) -> GatewayResult<()> {
        self.read().map(|_| ())
    }

    async fn get_user(&self, user_id: Uuid) -> GatewayResult<Option<UserProfile>> {
        if self.fail_user_lookups.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("users lookup failed".to_string()));
        }
        Ok(self.read()?.users.get(&user_id).cloned())
    }

    async fn list_users(&self) -> GatewayResult<Vec<UserProfile>> {
        let mut users: Vec<UserProfile> = self.read()?.users.values().cloned().collect();
        users.sort_by(|a, b| b.registered_at.cmp(&a.registered_at));
        Ok(users)
    }

    async fn update_user_role(&self, user_id: Uuid, role: UserRole) -> GatewayResult<UserProfile> {
        let mut data = self.write()?;
        let user = data.users.get_mut(&user_id).ok_or(GatewayError::NotFound("User"))?;
        user.role = role;
        Ok(user.clone())
    }

    async fn delete_user(&self, user_id: Uuid) -> GatewayResult<()> {
        self.write()?
            .users
            .remove(&user_id)
            .map(|_| ())
            .ok_or(GatewayError::NotFound("User"))
    }

    async fn find_admin_by_email(&self, email: &str) -> GatewayResult<Option<AdminAccount>> {
        Ok(self.read()?.admins.get(&email.to_lowercase()).cloned())
    }

    async fn insert_listing(&self, listing: NewListing) -> GatewayResult<ScrapListing> {
        let record = ScrapListing {
            scrap_id: Uuid::new_v4(),
            user_id: listing.user_id,
            scrap_type: listing.scrap_type,
            sub_category: listing.sub_category,
            description: listing.description,
            weight: listing.weight,
            estimated_price: listing.estimated_price,
            posted_date: Utc::now(),
            status: ListingStatus::Available,
            latitude: listing.latitude,
            longitude: listing.longitude,
        };
        self.write()?.listings.push(record.clone());
        Ok(record)
    }

    async fn get_listing(&self, scrap_id: Uuid) -> GatewayResult<Option<ScrapListing>> {
        Ok(self.read()?.listing(scrap_id).cloned())
    }

    async fn list_available_listings(&self, viewer_id: Uuid) -> GatewayResult<Vec<ScrapListing>> {
        let listings = self
            .read()?
            .listings
            .iter()
            .filter(|l| l.status == ListingStatus::Available && l.user_id != viewer_id)
            .cloned()
            .collect();
        Ok(newest_listings_first(listings))
    }

    async fn list_listings_by_owner(&self, owner_id: Uuid) -> GatewayResult<Vec<ScrapListing>> {
        let listings = self
            .read()?
            .listings
            .iter()
            .filter(|l| l.user_id == owner_id)
            .cloned()
            .collect();
        Ok(newest_listings_first(listings))
    }

    async fn list_all_listings(&self) -> GatewayResult<Vec<ScrapListing>> {
        Ok(newest_listings_first(self.read()?.listings.clone()))
    }

    async fn update_listing_status(
        &self,
        scrap_id: Uuid,
        status: ListingStatus,
    ) -> GatewayResult<ScrapListing> {
        let mut data = self.write()?;
        let listing = data
            .listing_mut(scrap_id)
            .ok_or(GatewayError::NotFound("Scrap listing"))?;
        listing.status = status;
        Ok(listing.clone())
    }

    async fn delete_listing(&self, scrap_id: Uuid) -> GatewayResult<()> {
        let mut data = self.write()?;
        let before = data.listings.len();
        data.listings.retain(|l| l.scrap_id != scrap_id);
        if data.listings.len() == before {
            return Err(GatewayError::NotFound("Scrap listing"));
        }
        let removed: Vec<Uuid> = data
            .requests
            .iter()
            .filter(|r| r.scrap_id == scrap_id)
            .map(|r| r.request_id)
            .collect();
        data.requests.retain(|r| r.scrap_id != scrap_id);
        data.flags.retain(|f| match f.target {
            FlagTarget::Listing => f.target_id != scrap_id,
            FlagTarget::PickupRequest => !removed.contains(&f.target_id),
        });
        Ok(())
    }

    async fn insert_pickup_request(&self, request: NewPickupRequest) -> GatewayResult<PickupRequest> {
        let mut data = self.write()?;
        if data.listing(request.scrap_id).is_none() {
            return Err(GatewayError::NotFound("Scrap listing"));
        }
        let record = PickupRequest {
            request_id: Uuid::new_v4(),
            scrap_id: request.scrap_id,
            recycler_id: request.recycler_id,
            pickup_status: PickupStatus::Pending,
            request_date: Utc::now(),
            pickup_slot: Some(PENDING_SLOT_SENTINEL.to_string()),
            proposed_slots: request.proposed_slots,
            slot_notified: false,
        };
        data.requests.push(record.clone());
        Ok(record)
    }

    async fn get_pickup_request(&self, request_id: Uuid) -> GatewayResult<Option<PickupRequest>> {
        Ok(self
            .read()?
            .requests
            .iter()
            .find(|r| r.request_id == request_id)
            .cloned())
    }

    async fn list_requests_for_seller(&self, seller_id: Uuid) -> GatewayResult<Vec<RequestWithListing>> {
        Ok(self.read()?.joined_newest_first(|_, l| l.user_id == seller_id))
    }

    async fn list_requests_for_recycler(
        &self,
        recycler_id: Uuid,
    ) -> GatewayResult<Vec<RequestWithListing>> {
        Ok(self.read()?.joined_newest_first(|r, _| r.recycler_id == recycler_id))
    }

    async fn list_all_pickup_requests(&self) -> GatewayResult<Vec<PickupRequest>> {
        let mut requests: Vec<PickupRequest> = self.read()?.requests.iter().rev().cloned().collect();
        requests.sort_by(|a, b| b.request_date.cmp(&a.request_date));
        Ok(requests)
    }

    async fn accept_pickup_request(&self, request_id: Uuid, slot: &str) -> GatewayResult<PickupRequest> {
        let mut data = self.write()?;

        let (status, scrap_id) = data
            .requests
            .iter()
            .find(|r| r.request_id == request_id)
            .map(|r| (r.pickup_status, r.scrap_id))
            .ok_or(GatewayError::NotFound("Pickup request"))?;
        if status != PickupStatus::Pending {
            return Err(GatewayError::conflict("pickup_request", "Request is no longer pending"));
        }

        let listing = data
            .listing_mut(scrap_id)
            .ok_or(GatewayError::NotFound("Scrap listing"))?;
        if listing.status != ListingStatus::Available {
            return Err(GatewayError::conflict(
                "scrap_listing",
                "Listing already has an accepted pickup request",
            ));
        }
        listing.status = ListingStatus::Accepted;

        let request = data
            .request_mut(request_id)
            .ok_or(GatewayError::NotFound("Pickup request"))?;
        request.pickup_status = PickupStatus::Accepted;
        request.pickup_slot = Some(slot.to_string());
        Ok(request.clone())
    }

    async fn set_slot_notified(&self, request_id: Uuid, notified: bool) -> GatewayResult<()> {
        let mut data = self.write()?;
        let request = data
            .request_mut(request_id)
            .ok_or(GatewayError::NotFound("Pickup request"))?;
        request.slot_notified = notified;
        Ok(())
    }

    async fn delete_pickup_request(&self, request_id: Uuid) -> GatewayResult<()> {
        let mut data = self.write()?;
        let before = data.requests.len();
        data.requests.retain(|r| r.request_id != request_id);
        if data.requests.len() == before {
            return Err(GatewayError::NotFound("Pickup request"));
        }
        data.flags
            .retain(|f| !(f.target == FlagTarget::PickupRequest && f.target_id == request_id));
        Ok(())
    }

    async fn complete_pickup(&self, input: CompletePickup) -> GatewayResult<Transaction> {
        let mut data = self.write()?;

        // Validate every step before mutating anything
        let status = data
            .requests
            .iter()
            .find(|r| r.request_id == input.request_id)
            .map(|r| r.pickup_status)
            .ok_or(GatewayError::NotFound("Pickup request"))?;
        if status != PickupStatus::Accepted {
            return Err(GatewayError::conflict("pickup_request", "Request is not accepted"));
        }
        if data.listing(input.scrap_id).is_none() {
            return Err(GatewayError::NotFound("Scrap listing"));
        }
        if self.fail_transaction_inserts.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("transactions insert failed".to_string()));
        }

        if let Some(request) = data.request_mut(input.request_id) {
            request.pickup_status = PickupStatus::Completed;
        }
        if let Some(listing) = data.listing_mut(input.scrap_id) {
            listing.status = ListingStatus::Completed;
        }
        let transaction = Transaction {
            transaction_id: Uuid::new_v4(),
            seller_id: input.seller_id,
            recycler_id: input.recycler_id,
            scrap_id: input.scrap_id,
            final_price: input.final_price,
            status: TransactionStatus::Completed,
            created_at: Utc::now(),
        };
        data.transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn list_transactions_for_user(&self, user_id: Uuid) -> GatewayResult<Vec<Transaction>> {
        let mut transactions: Vec<Transaction> = self
            .read()?
            .transactions
            .iter()
            .rev()
            .filter(|t| t.seller_id == user_id || t.recycler_id == user_id)
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transactions)
    }

    async fn list_all_transactions(&self) -> GatewayResult<Vec<Transaction>> {
        let mut transactions: Vec<Transaction> = self.read()?.transactions.iter().rev().cloned().collect();
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transactions)
    }

    async fn update_transaction_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> GatewayResult<Transaction> {
        let mut data = self.write()?;
        let transaction = data
            .transactions
            .iter_mut()
            .find(|t| t.transaction_id == transaction_id)
            .ok_or(GatewayError::NotFound("Transaction"))?;
        transaction.status = status;
        Ok(transaction.clone())
    }

    async fn insert_flag(&self, flag: NewFlag) -> GatewayResult<ModerationFlag> {
        let mut data = self.write()?;
        let exists = match flag.target {
            FlagTarget::Listing => data.listing(flag.target_id).is_some(),
            FlagTarget::PickupRequest => data.requests.iter().any(|r| r.request_id == flag.target_id),
        };
        if !exists {
            return Err(GatewayError::NotFound(match flag.target {
                FlagTarget::Listing => "Scrap listing",
                FlagTarget::PickupRequest => "Pickup request",
            }));
        }

        let record = ModerationFlag {
            flag_id: Uuid::new_v4(),
            target: flag.target,
            target_id: flag.target_id,
            reason: flag.reason,
            flagged_by: flag.flagged_by,
            flagged_at: Utc::now(),
        };
        data.flags.push(record.clone());
        Ok(record)
    }

    async fn list_flags(
        &self,
        target: FlagTarget,
        target_id: Uuid,
    ) -> GatewayResult<Vec<ModerationFlag>> {
        let mut flags: Vec<ModerationFlag> = self
            .read()?
            .flags
            .iter()
            .rev()
            .filter(|f| f.target == target && f.target_id == target_id)
            .cloned()
            .collect();
        flags.sort_by(|a, b| b.flagged_at.cmp(&a.flagged_at));
        Ok(flags)
    }
}
