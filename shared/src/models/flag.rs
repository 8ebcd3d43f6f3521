//! Moderation flags raised by admins on listings and pickup requests

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a flag points at
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FlagTarget {
    Listing,
    PickupRequest,
}

impl FlagTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagTarget::Listing => "listing",
            FlagTarget::PickupRequest => "pickup_request",
        }
    }
}

/// A reason an admin recorded against a listing or a pickup request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModerationFlag {
    pub flag_id: Uuid,
    pub target: FlagTarget,
    /// `scrap_id` or `request_id`, depending on `target`
    pub target_id: Uuid,
    pub reason: String,
    pub flagged_by: Option<Uuid>,
    pub flagged_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFlag {
    pub target: FlagTarget,
    pub target_id: Uuid,
    pub reason: String,
    pub flagged_by: Option<Uuid>,
}
