//! Persistence gateway: authenticated CRUD over the hosted store
//!
//! Collections: `users`, `admins`, `scrap_listings`, `pickup_requests`, `transactions`,
//! plus the admin flag collections `listing_flags` and `pickup_flags`.
//! There is no local cache; every call goes to the store.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryGateway;
pub use postgres::PgGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared::{
    CompletePickup, FlagTarget, ListingStatus, ModerationFlag, NewFlag, NewListing,
    NewPickupRequest, PickupRequest, ScrapListing, Transaction, TransactionStatus, UserProfile,
    UserRole,
};

/// Errors reported by the persistence gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict on {resource}: {message}")]
    Conflict { resource: String, message: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record in {collection}: {detail}")]
    Corrupt {
        collection: &'static str,
        detail: String,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    pub fn conflict(resource: &str, message: impl Into<String>) -> Self {
        GatewayError::Conflict {
            resource: resource.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Admin credentials row; admins live outside the `users` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminAccount {
    pub admin_id: Uuid,
    pub email: String,
    pub password_hash: String,
}

/// A pickup request joined with the listing it references
pub type RequestWithListing = (PickupRequest, ScrapListing);

/// The remote store as seen by the services
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Liveness check
    async fn ping(&self) -> GatewayResult<()>;

    // ------------------------------------------------------------------
    // users / admins
    // ------------------------------------------------------------------

    async fn get_user(&self, user_id: Uuid) -> GatewayResult<Option<UserProfile>>;

    async fn list_users(&self) -> GatewayResult<Vec<UserProfile>>;

    async fn update_user_role(&self, user_id: Uuid, role: UserRole) -> GatewayResult<UserProfile>;

    async fn delete_user(&self, user_id: Uuid) -> GatewayResult<()>;

    async fn find_admin_by_email(&self, email: &str) -> GatewayResult<Option<AdminAccount>>;

    // ------------------------------------------------------------------
    // scrap_listings
    // ------------------------------------------------------------------

    async fn insert_listing(&self, listing: NewListing) -> GatewayResult<ScrapListing>;

    async fn get_listing(&self, scrap_id: Uuid) -> GatewayResult<Option<ScrapListing>>;

    /// Available listings not owned by `viewer_id`, newest first
    async fn list_available_listings(&self, viewer_id: Uuid) -> GatewayResult<Vec<ScrapListing>>;

    async fn list_listings_by_owner(&self, owner_id: Uuid) -> GatewayResult<Vec<ScrapListing>>;

    async fn list_all_listings(&self) -> GatewayResult<Vec<ScrapListing>>;

    async fn update_listing_status(
        &self,
        scrap_id: Uuid,
        status: ListingStatus,
    ) -> GatewayResult<ScrapListing>;

    async fn delete_listing(&self, scrap_id: Uuid) -> GatewayResult<()>;

    // ------------------------------------------------------------------
    // pickup_requests
    // ------------------------------------------------------------------

    /// Insert a `pending` request with the sentinel slot
    async fn insert_pickup_request(&self, request: NewPickupRequest) -> GatewayResult<PickupRequest>;

    async fn get_pickup_request(&self, request_id: Uuid) -> GatewayResult<Option<PickupRequest>>;

    /// Requests on listings owned by `seller_id`, newest first
    async fn list_requests_for_seller(&self, seller_id: Uuid) -> GatewayResult<Vec<RequestWithListing>>;

    /// Requests created by `recycler_id`, newest first
    async fn list_requests_for_recycler(
        &self,
        recycler_id: Uuid,
    ) -> GatewayResult<Vec<RequestWithListing>>;

    async fn list_all_pickup_requests(&self) -> GatewayResult<Vec<PickupRequest>>;

    /// Conditionally accept: the request must still be `pending` and its listing
    /// `available`. Sets the slot and flips both in one step, otherwise `Conflict`.
    async fn accept_pickup_request(&self, request_id: Uuid, slot: &str) -> GatewayResult<PickupRequest>;

    async fn set_slot_notified(&self, request_id: Uuid, notified: bool) -> GatewayResult<()>;

    async fn delete_pickup_request(&self, request_id: Uuid) -> GatewayResult<()>;

    /// Atomically mark request and listing `completed` and insert the transaction
    async fn complete_pickup(&self, input: CompletePickup) -> GatewayResult<Transaction>;

    // ------------------------------------------------------------------
    // transactions
    // ------------------------------------------------------------------

    /// Transactions where the user is seller or recycler, newest first
    async fn list_transactions_for_user(&self, user_id: Uuid) -> GatewayResult<Vec<Transaction>>;

    async fn list_all_transactions(&self) -> GatewayResult<Vec<Transaction>>;

    async fn update_transaction_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> GatewayResult<Transaction>;

    // ------------------------------------------------------------------
    // listing_flags / pickup_flags
    // ------------------------------------------------------------------

    async fn insert_flag(&self, flag: NewFlag) -> GatewayResult<ModerationFlag>;

    /// Flags on one listing or request, newest first
    async fn list_flags(
        &self,
        target: FlagTarget,
        target_id: Uuid,
    ) -> GatewayResult<Vec<ModerationFlag>>;
}
