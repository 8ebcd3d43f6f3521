//! PostgreSQL gateway implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use shared::{
    decode_proposed_slots, encode_proposed_slots, CompletePickup, FlagTarget, ListingStatus,
    ModerationFlag, NewFlag, NewListing, NewPickupRequest, PickupRequest, PickupStatus,
    ScrapListing, Transaction, TransactionStatus, UserProfile, UserRole, PENDING_SLOT_SENTINEL,
};

use super::{AdminAccount, GatewayError, GatewayResult, PersistenceGateway, RequestWithListing};

/// Gateway backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgGateway {
    db: PgPool,
}

impl PgGateway {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    user_id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    role: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    registered_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserProfile {
    type Error = GatewayError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = UserRole::from_str(&row.role).ok_or_else(|| GatewayError::Corrupt {
            collection: "users",
            detail: format!("unknown role '{}'", row.role),
        })?;
        Ok(UserProfile {
            user_id: row.user_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            role,
            latitude: row.latitude,
            longitude: row.longitude,
            registered_at: row.registered_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AdminRow {
    admin_id: Uuid,
    email: String,
    password_hash: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ListingRow {
    scrap_id: Uuid,
    user_id: Uuid,
    scrap_type: String,
    sub_category: Option<String>,
    description: Option<String>,
    weight: Decimal,
    estimated_price: Decimal,
    posted_date: DateTime<Utc>,
    status: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl TryFrom<ListingRow> for ScrapListing {
    type Error = GatewayError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        let status = ListingStatus::from_str(&row.status).ok_or_else(|| GatewayError::Corrupt {
            collection: "scrap_listings",
            detail: format!("unknown status '{}'", row.status),
        })?;
        Ok(ScrapListing {
            scrap_id: row.scrap_id,
            user_id: row.user_id,
            scrap_type: row.scrap_type,
            sub_category: row.sub_category.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            weight: row.weight,
            estimated_price: row.estimated_price,
            posted_date: row.posted_date,
            status,
            latitude: row.latitude,
            longitude: row.longitude,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RequestRow {
    request_id: Uuid,
    scrap_id: Uuid,
    recycler_id: Uuid,
    pickup_status: String,
    request_date: DateTime<Utc>,
    pickup_slot: Option<String>,
    proposed_slots: Option<String>,
    slot_notified: bool,
}

impl TryFrom<RequestRow> for PickupRequest {
    type Error = GatewayError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let pickup_status =
            PickupStatus::from_str(&row.pickup_status).ok_or_else(|| GatewayError::Corrupt {
                collection: "pickup_requests",
                detail: format!("unknown status '{}'", row.pickup_status),
            })?;
        Ok(PickupRequest {
            request_id: row.request_id,
            scrap_id: row.scrap_id,
            recycler_id: row.recycler_id,
            pickup_status,
            request_date: row.request_date,
            pickup_slot: row.pickup_slot,
            proposed_slots: decode_proposed_slots(row.proposed_slots.as_deref()),
            slot_notified: row.slot_notified,
        })
    }
}

/// Request joined with its listing; listing columns are prefixed with `l_`
#[derive(Debug, sqlx::FromRow)]
struct JoinedRow {
    #[sqlx(flatten)]
    request: RequestRow,
    l_scrap_id: Uuid,
    l_user_id: Uuid,
    l_scrap_type: String,
    l_sub_category: Option<String>,
    l_description: Option<String>,
    l_weight: Decimal,
    l_estimated_price: Decimal,
    l_posted_date: DateTime<Utc>,
    l_status: String,
    l_latitude: Option<f64>,
    l_longitude: Option<f64>,
}

impl TryFrom<JoinedRow> for RequestWithListing {
    type Error = GatewayError;

    fn try_from(row: JoinedRow) -> Result<Self, Self::Error> {
        let listing = ListingRow {
            scrap_id: row.l_scrap_id,
            user_id: row.l_user_id,
            scrap_type: row.l_scrap_type,
            sub_category: row.l_sub_category,
            description: row.l_description,
            weight: row.l_weight,
            estimated_price: row.l_estimated_price,
            posted_date: row.l_posted_date,
            status: row.l_status,
            latitude: row.l_latitude,
            longitude: row.l_longitude,
        };
        Ok((row.request.try_into()?, listing.try_into()?))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    transaction_id: Uuid,
    seller_id: Uuid,
    recycler_id: Uuid,
    scrap_id: Uuid,
    final_price: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = GatewayError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let status = TransactionStatus::from_str(&row.status).ok_or_else(|| GatewayError::Corrupt {
            collection: "transactions",
            detail: format!("unknown status '{}'", row.status),
        })?;
        Ok(Transaction {
            transaction_id: row.transaction_id,
            seller_id: row.seller_id,
            recycler_id: row.recycler_id,
            scrap_id: row.scrap_id,
            final_price: row.final_price,
            status,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FlagRow {
    flag_id: Uuid,
    target_id: Uuid,
    reason: String,
    flagged_by: Option<Uuid>,
    flagged_at: DateTime<Utc>,
}

impl FlagRow {
    fn into_flag(self, target: FlagTarget) -> ModerationFlag {
        ModerationFlag {
            flag_id: self.flag_id,
            target,
            target_id: self.target_id,
            reason: self.reason,
            flagged_by: self.flagged_by,
            flagged_at: self.flagged_at,
        }
    }
}

/// Table and key column holding flags for `target`
fn flag_table(target: FlagTarget) -> (&'static str, &'static str) {
    match target {
        FlagTarget::Listing => ("listing_flags", "scrap_id"),
        FlagTarget::PickupRequest => ("pickup_flags", "request_id"),
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> GatewayResult<Vec<T>>
where
    T: TryFrom<R, Error = GatewayError>,
{
    rows.into_iter().map(T::try_from).collect()
}

const USER_COLUMNS: &str =
    "user_id, name, email, phone, role, latitude, longitude, registered_at";

const LISTING_COLUMNS: &str = "scrap_id, user_id, scrap_type, sub_category, description, \
     weight, estimated_price, posted_date, status, latitude, longitude";

const REQUEST_COLUMNS: &str = "request_id, scrap_id, recycler_id, pickup_status, request_date, \
     pickup_slot, proposed_slots, slot_notified";

const TRANSACTION_COLUMNS: &str =
    "transaction_id, seller_id, recycler_id, scrap_id, final_price, status, created_at";

const JOINED_SELECT: &str = r#"
    SELECT r.request_id, r.scrap_id, r.recycler_id, r.pickup_status, r.request_date,
           r.pickup_slot, r.proposed_slots, r.slot_notified,
           l.scrap_id AS l_scrap_id, l.user_id AS l_user_id, l.scrap_type AS l_scrap_type,
           l.sub_category AS l_sub_category, l.description AS l_description,
           l.weight AS l_weight, l.estimated_price AS l_estimated_price,
           l.posted_date AS l_posted_date, l.status AS l_status,
           l.latitude AS l_latitude, l.longitude AS l_longitude
    FROM pickup_requests r
    JOIN scrap_listings l ON l.scrap_id = r.scrap_id
"#;

#[async_trait]
impl PersistenceGateway for PgGateway {
    async fn ping(&self) -> GatewayResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    // ========================================================================
    // users / admins
    // ========================================================================

    async fn get_user(&self, user_id: Uuid) -> GatewayResult<Option<UserProfile>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE user_id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(UserProfile::try_from).transpose()
    }

    async fn list_users(&self) -> GatewayResult<Vec<UserProfile>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY registered_at DESC",
            USER_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        convert_all(rows)
    }

    async fn update_user_role(&self, user_id: Uuid, role: UserRole) -> GatewayResult<UserProfile> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET role = $2 WHERE user_id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(role.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or(GatewayError::NotFound("User"))?;

        row.try_into()
    }

    async fn delete_user(&self, user_id: Uuid) -> GatewayResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::NotFound("User"));
        }
        Ok(())
    }

    async fn find_admin_by_email(&self, email: &str) -> GatewayResult<Option<AdminAccount>> {
        let row = sqlx::query_as::<_, AdminRow>(
            "SELECT admin_id, email, password_hash FROM admins WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|r| AdminAccount {
            admin_id: r.admin_id,
            email: r.email,
            password_hash: r.password_hash,
        }))
    }

    // ========================================================================
    // scrap_listings
    // ========================================================================

    async fn insert_listing(&self, listing: NewListing) -> GatewayResult<ScrapListing> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            INSERT INTO scrap_listings
                (user_id, scrap_type, sub_category, description, weight, estimated_price,
                 status, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5, $6, 'available', $7, $8)
            RETURNING {}
            "#,
            LISTING_COLUMNS
        ))
        .bind(listing.user_id)
        .bind(&listing.scrap_type)
        .bind(&listing.sub_category)
        .bind(&listing.description)
        .bind(listing.weight)
        .bind(listing.estimated_price)
        .bind(listing.latitude)
        .bind(listing.longitude)
        .fetch_one(&self.db)
        .await?;

        row.try_into()
    }

    async fn get_listing(&self, scrap_id: Uuid) -> GatewayResult<Option<ScrapListing>> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {} FROM scrap_listings WHERE scrap_id = $1",
            LISTING_COLUMNS
        ))
        .bind(scrap_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(ScrapListing::try_from).transpose()
    }

    async fn list_available_listings(&self, viewer_id: Uuid) -> GatewayResult<Vec<ScrapListing>> {
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            SELECT {} FROM scrap_listings
            WHERE status = 'available' AND user_id <> $1
            ORDER BY posted_date DESC
            "#,
            LISTING_COLUMNS
        ))
        .bind(viewer_id)
        .fetch_all(&self.db)
        .await?;

        convert_all(rows)
    }

    async fn list_listings_by_owner(&self, owner_id: Uuid) -> GatewayResult<Vec<ScrapListing>> {
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {} FROM scrap_listings WHERE user_id = $1 ORDER BY posted_date DESC",
            LISTING_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        convert_all(rows)
    }

    async fn list_all_listings(&self) -> GatewayResult<Vec<ScrapListing>> {
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {} FROM scrap_listings ORDER BY posted_date DESC",
            LISTING_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        convert_all(rows)
    }

    async fn update_listing_status(
        &self,
        scrap_id: Uuid,
        status: ListingStatus,
    ) -> GatewayResult<ScrapListing> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "UPDATE scrap_listings SET status = $2 WHERE scrap_id = $1 RETURNING {}",
            LISTING_COLUMNS
        ))
        .bind(scrap_id)
        .bind(status.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or(GatewayError::NotFound("Scrap listing"))?;

        row.try_into()
    }

    async fn delete_listing(&self, scrap_id: Uuid) -> GatewayResult<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM pickup_requests WHERE scrap_id = $1")
            .bind(scrap_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM scrap_listings WHERE scrap_id = $1")
            .bind(scrap_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::NotFound("Scrap listing"));
        }

        tx.commit().await?;
        Ok(())
    }

    // ========================================================================
    // pickup_requests
    // ========================================================================

    async fn insert_pickup_request(&self, request: NewPickupRequest) -> GatewayResult<PickupRequest> {
        let row = sqlx::query_as::<_, RequestRow>(&format!(
            r#"
            INSERT INTO pickup_requests
                (scrap_id, recycler_id, pickup_status, pickup_slot, proposed_slots, slot_notified)
            VALUES ($1, $2, 'pending', $3, $4, FALSE)
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(request.scrap_id)
        .bind(request.recycler_id)
        .bind(PENDING_SLOT_SENTINEL)
        .bind(encode_proposed_slots(&request.proposed_slots))
        .fetch_one(&self.db)
        .await?;

        row.try_into()
    }

    async fn get_pickup_request(&self, request_id: Uuid) -> GatewayResult<Option<PickupRequest>> {
        let row = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {} FROM pickup_requests WHERE request_id = $1",
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(PickupRequest::try_from).transpose()
    }

    async fn list_requests_for_seller(&self, seller_id: Uuid) -> GatewayResult<Vec<RequestWithListing>> {
        let rows = sqlx::query_as::<_, JoinedRow>(&format!(
            "{} WHERE l.user_id = $1 ORDER BY r.request_date DESC",
            JOINED_SELECT
        ))
        .bind(seller_id)
        .fetch_all(&self.db)
        .await?;

        convert_all(rows)
    }

    async fn list_requests_for_recycler(
        &self,
        recycler_id: Uuid,
    ) -> GatewayResult<Vec<RequestWithListing>> {
        let rows = sqlx::query_as::<_, JoinedRow>(&format!(
            "{} WHERE r.recycler_id = $1 ORDER BY r.request_date DESC",
            JOINED_SELECT
        ))
        .bind(recycler_id)
        .fetch_all(&self.db)
        .await?;

        convert_all(rows)
    }

    async fn list_all_pickup_requests(&self) -> GatewayResult<Vec<PickupRequest>> {
        let rows = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {} FROM pickup_requests ORDER BY request_date DESC",
            REQUEST_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        convert_all(rows)
    }

    async fn accept_pickup_request(&self, request_id: Uuid, slot: &str) -> GatewayResult<PickupRequest> {
        let mut tx = self.db.begin().await?;

        let current = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT r.pickup_status, l.status
            FROM pickup_requests r
            JOIN scrap_listings l ON l.scrap_id = r.scrap_id
            WHERE r.request_id = $1
            FOR UPDATE
            "#,
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(GatewayError::NotFound("Pickup request"))?;

        if current.0 != PickupStatus::Pending.as_str() {
            return Err(GatewayError::conflict("pickup_request", "Request is no longer pending"));
        }
        if current.1 != ListingStatus::Available.as_str() {
            return Err(GatewayError::conflict(
                "scrap_listing",
                "Listing already has an accepted pickup request",
            ));
        }

        let row = sqlx::query_as::<_, RequestRow>(&format!(
            r#"
            UPDATE pickup_requests
            SET pickup_status = 'accepted', pickup_slot = $2
            WHERE request_id = $1
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .bind(slot)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE scrap_listings SET status = 'accepted' WHERE scrap_id = $1")
            .bind(row.scrap_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn set_slot_notified(&self, request_id: Uuid, notified: bool) -> GatewayResult<()> {
        let result = sqlx::query("UPDATE pickup_requests SET slot_notified = $2 WHERE request_id = $1")
            .bind(request_id)
            .bind(notified)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::NotFound("Pickup request"));
        }
        Ok(())
    }

    async fn delete_pickup_request(&self, request_id: Uuid) -> GatewayResult<()> {
        let result = sqlx::query("DELETE FROM pickup_requests WHERE request_id = $1")
            .bind(request_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::NotFound("Pickup request"));
        }
        Ok(())
    }

    async fn complete_pickup(&self, input: CompletePickup) -> GatewayResult<Transaction> {
        let mut tx = self.db.begin().await?;

        let status = sqlx::query_scalar::<_, String>(
            "SELECT pickup_status FROM pickup_requests WHERE request_id = $1 FOR UPDATE",
        )
        .bind(input.request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(GatewayError::NotFound("Pickup request"))?;

        if status != PickupStatus::Accepted.as_str() {
            return Err(GatewayError::conflict("pickup_request", "Request is not accepted"));
        }

        sqlx::query("UPDATE pickup_requests SET pickup_status = 'completed' WHERE request_id = $1")
            .bind(input.request_id)
            .execute(&mut *tx)
            .await?;

        let listing = sqlx::query("UPDATE scrap_listings SET status = 'completed' WHERE scrap_id = $1")
            .bind(input.scrap_id)
            .execute(&mut *tx)
            .await?;
        if listing.rows_affected() == 0 {
            return Err(GatewayError::NotFound("Scrap listing"));
        }

        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            INSERT INTO transactions (seller_id, recycler_id, scrap_id, final_price, status)
            VALUES ($1, $2, $3, $4, 'completed')
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(input.seller_id)
        .bind(input.recycler_id)
        .bind(input.scrap_id)
        .bind(input.final_price)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    // ========================================================================
    // transactions
    // ========================================================================

    async fn list_transactions_for_user(&self, user_id: Uuid) -> GatewayResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            SELECT {} FROM transactions
            WHERE seller_id = $1 OR recycler_id = $1
            ORDER BY created_at DESC
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        convert_all(rows)
    }

    async fn list_all_transactions(&self) -> GatewayResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM transactions ORDER BY created_at DESC",
            TRANSACTION_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        convert_all(rows)
    }

    async fn update_transaction_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> GatewayResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "UPDATE transactions SET status = $2 WHERE transaction_id = $1 RETURNING {}",
            TRANSACTION_COLUMNS
        ))
        .bind(transaction_id)
        .bind(status.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or(GatewayError::NotFound("Transaction"))?;

        row.try_into()
    }

    // ========================================================================
    // flags
    // ========================================================================

    async fn insert_flag(&self, flag: NewFlag) -> GatewayResult<ModerationFlag> {
        let (table, key) = flag_table(flag.target);
        let row = sqlx::query_as::<_, FlagRow>(&format!(
            r#"
            INSERT INTO {table} ({key}, reason, flagged_by)
            VALUES ($1, $2, $3)
            RETURNING flag_id, {key} AS target_id, reason, flagged_by, flagged_at
            "#,
            table = table,
            key = key
        ))
        .bind(flag.target_id)
        .bind(&flag.reason)
        .bind(flag.flagged_by)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into_flag(flag.target))
    }

    async fn list_flags(
        &self,
        target: FlagTarget,
        target_id: Uuid,
    ) -> GatewayResult<Vec<ModerationFlag>> {
        let (table, key) = flag_table(target);
        let rows = sqlx::query_as::<_, FlagRow>(&format!(
            r#"
            SELECT flag_id, {key} AS target_id, reason, flagged_by, flagged_at
            FROM {table}
            WHERE {key} = $1
            ORDER BY flagged_at DESC
            "#,
            table = table,
            key = key
        ))
        .bind(target_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(|row| row.into_flag(target)).collect())
    }
}
