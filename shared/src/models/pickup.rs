//! Pickup request models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::listing::ScrapListing;
use crate::types::ContactInfo;

/// Placeholder stored in `pickup_slot` until the seller picks one
pub const PENDING_SLOT_SENTINEL: &str = "pending seller selection";

/// A recycler's proposal to collect a specific listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PickupRequest {
    pub request_id: Uuid,
    pub scrap_id: Uuid,
    pub recycler_id: Uuid,
    pub pickup_status: PickupStatus,
    pub request_date: DateTime<Utc>,
    pub pickup_slot: Option<String>,
    /// Candidate slots in the order the recycler proposed them
    pub proposed_slots: Vec<String>,
    pub slot_notified: bool,
}

impl PickupRequest {
    /// The slot chosen by the seller, if any
    pub fn confirmed_slot(&self) -> Option<&str> {
        self.pickup_slot
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != PENDING_SLOT_SENTINEL)
    }
}

/// Pickup request status. Rejection deletes the request instead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PickupStatus {
    Pending,
    Accepted,
    Completed,
}

impl PickupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PickupStatus::Pending => "pending",
            PickupStatus::Accepted => "accepted",
            PickupStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PickupStatus::Pending),
            "accepted" => Some(PickupStatus::Accepted),
            "completed" => Some(PickupStatus::Completed),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: PickupStatus) -> bool {
        matches!(
            (self, next),
            (PickupStatus::Pending, PickupStatus::Accepted)
                | (PickupStatus::Accepted, PickupStatus::Completed)
        )
    }

    /// Badge text shown to both parties
    pub fn label(&self) -> &'static str {
        match self {
            PickupStatus::Pending => "Pending",
            PickupStatus::Accepted => "Accepted",
            PickupStatus::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for PickupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Status filter for the recycler's request list
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Accepted,
    Completed,
}

impl StatusFilter {
    pub fn matches(&self, status: PickupStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Pending => status == PickupStatus::Pending,
            StatusFilter::Accepted => status == PickupStatus::Accepted,
            StatusFilter::Completed => status == PickupStatus::Completed,
        }
    }
}

/// Fields required to insert a pickup request
#[derive(Debug, Clone)]
pub struct NewPickupRequest {
    pub scrap_id: Uuid,
    pub recycler_id: Uuid,
    pub proposed_slots: Vec<String>,
}

/// Request row as seen by the seller: listing plus the recycler's contact.
/// `recycler` is `None` when the contact lookup failed.
#[derive(Debug, Clone, Serialize)]
pub struct SellerRequestView {
    #[serde(flatten)]
    pub request: PickupRequest,
    pub status_label: &'static str,
    pub scrap_listing: ScrapListing,
    pub recycler: Option<ContactInfo>,
}

/// Request row as seen by the recycler: listing plus the seller's contact.
/// `seller` is `None` when the contact lookup failed.
#[derive(Debug, Clone, Serialize)]
pub struct RecyclerRequestView {
    #[serde(flatten)]
    pub request: PickupRequest,
    pub status_label: &'static str,
    pub scrap_listing: ScrapListing,
    pub seller: Option<ContactInfo>,
}

/// Serialize proposed slots the way they are stored in `pickup_requests`
pub fn encode_proposed_slots(slots: &[String]) -> String {
    serde_json::to_string(slots).unwrap_or_else(|_| "[]".to_string())
}

/// Parse stored proposed slots; a non-JSON value is kept as a single slot
pub fn decode_proposed_slots(raw: Option<&str>) -> Vec<String> {
    match raw.map(str::trim) {
        None | Some("") => Vec::new(),
        Some(text) => serde_json::from_str::<Vec<String>>(text)
            .unwrap_or_else(|_| vec![text.to_string()]),
    }
}
