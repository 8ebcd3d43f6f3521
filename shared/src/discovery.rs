//! Listing discovery: distance, category filtering and sorting over fetched listings
//!
//! Everything here is pure. The gateway query already excluded the viewer's own
//! listings and anything that is no longer available.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::{split_categories, ScrapListing};
use crate::types::GeoPoint;

/// Default search radius in kilometres
pub const DEFAULT_MAX_DISTANCE_KM: f64 = 500.0;

/// Sort order for discovered listings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Nearest first
    #[default]
    Distance,
    /// Highest estimated price first
    Price,
    /// Heaviest first
    Weight,
    /// Newest first
    Date,
}

/// Filter and sort parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryQuery {
    /// Inclusive upper bound
    pub max_distance_km: f64,
    pub main_category: Option<String>,
    pub sub_category: Option<String>,
    pub sort_by: SortBy,
}

impl Default for DiscoveryQuery {
    fn default() -> Self {
        Self {
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
            main_category: None,
            sub_category: None,
            sort_by: SortBy::Distance,
        }
    }
}

/// A listing annotated with its distance from the viewer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveredListing {
    #[serde(flatten)]
    pub listing: ScrapListing,
    /// `None` when either side lacks coordinates
    pub distance: Option<f64>,
}

impl DiscoveredListing {
    /// Distance used for filtering and sorting; unknown counts as infinitely far
    pub fn effective_distance(&self) -> f64 {
        self.distance.unwrap_or(f64::INFINITY)
    }
}

/// Distance from the viewer to a listing, if both have coordinates
pub fn listing_distance(viewer: Option<&GeoPoint>, listing: &ScrapListing) -> Option<f64> {
    let viewer = viewer?;
    let location = listing.location()?;
    Some(viewer.distance_km(&location))
}

/// Apply the discovery query to a fetched, unfiltered list of listings
pub fn discover(
    listings: &[ScrapListing],
    viewer: Option<&GeoPoint>,
    query: &DiscoveryQuery,
) -> Vec<DiscoveredListing> {
    let main_category = non_blank(query.main_category.as_deref());
    let sub_category = non_blank(query.sub_category.as_deref());

    let mut result: Vec<DiscoveredListing> = listings
        .iter()
        .map(|listing| DiscoveredListing {
            distance: listing_distance(viewer, listing),
            listing: listing.clone(),
        })
        .filter(|d| d.effective_distance() <= query.max_distance_km)
        .filter(|d| match main_category {
            Some(category) => d.listing.has_main_category(category),
            None => true,
        })
        .filter(|d| match sub_category {
            Some(sub) => d.listing.sub_category.trim() == sub,
            None => true,
        })
        .collect();

    // sort_by is stable, so ties keep fetch order
    result.sort_by(|a, b| compare(query.sort_by, a, b));
    result
}

fn compare(sort_by: SortBy, a: &DiscoveredListing, b: &DiscoveredListing) -> Ordering {
    match sort_by {
        SortBy::Distance => a
            .effective_distance()
            .partial_cmp(&b.effective_distance())
            .unwrap_or(Ordering::Equal),
        SortBy::Price => b.listing.estimated_price.cmp(&a.listing.estimated_price),
        SortBy::Weight => b.listing.weight.cmp(&a.listing.weight),
        SortBy::Date => b.listing.posted_date.cmp(&a.listing.posted_date),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Sorted unique main categories across listings
pub fn unique_main_categories(listings: &[ScrapListing]) -> Vec<String> {
    listings
        .iter()
        .flat_map(|l| split_categories(&l.scrap_type))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Sorted unique sub-categories across listings
pub fn unique_sub_categories(listings: &[ScrapListing]) -> Vec<String> {
    listings
        .iter()
        .map(|l| l.sub_category.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
