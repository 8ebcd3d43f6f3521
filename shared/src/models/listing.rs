//! Scrap listing models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::GeoPoint;

/// A seller's posted scrap material offer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrapListing {
    pub scrap_id: Uuid,
    pub user_id: Uuid,
    /// Comma-joined set of top-level materials (e.g., "metal, paper")
    pub scrap_type: String,
    pub sub_category: String,
    pub description: String,
    /// Weight in kg
    pub weight: Decimal,
    pub estimated_price: Decimal,
    pub posted_date: DateTime<Utc>,
    pub status: ListingStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl ScrapListing {
    /// Trimmed, non-empty elements of the comma-joined category set
    pub fn main_categories(&self) -> impl Iterator<Item = &str> {
        split_categories(&self.scrap_type)
    }

    pub fn has_main_category(&self, category: &str) -> bool {
        self.main_categories().any(|c| c == category)
    }

    pub fn location(&self) -> Option<GeoPoint> {
        GeoPoint::from_parts(self.latitude, self.longitude)
    }
}

/// Split a comma-joined category string into trimmed, non-empty parts
pub fn split_categories(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|c| !c.is_empty())
}

/// Listing status; only ever moves forward
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Available,
    Accepted,
    Completed,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Available => "available",
            ListingStatus::Accepted => "accepted",
            ListingStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "available" => Some(ListingStatus::Available),
            "accepted" => Some(ListingStatus::Accepted),
            "completed" => Some(ListingStatus::Completed),
            _ => None,
        }
    }

    /// `available -> accepted -> completed`, one step at a time
    pub fn can_transition_to(&self, next: ListingStatus) -> bool {
        matches!(
            (self, next),
            (ListingStatus::Available, ListingStatus::Accepted)
                | (ListingStatus::Accepted, ListingStatus::Completed)
        )
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingStatus::Available => write!(f, "Available"),
            ListingStatus::Accepted => write!(f, "Accepted"),
            ListingStatus::Completed => write!(f, "Completed"),
        }
    }
}

/// Fields required to insert a listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewListing {
    pub user_id: Uuid,
    pub scrap_type: String,
    pub sub_category: String,
    pub description: String,
    pub weight: Decimal,
    pub estimated_price: Decimal,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}
