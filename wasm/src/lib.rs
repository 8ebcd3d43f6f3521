//! WebAssembly module for the Scrap Link marketplace
//!
//! Provides client-side computation for:
//! - Listing discovery (distance, category filters, sorting)
//! - Category facets for the filter dropdowns
//! - Pickup form validation before anything is sent

use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::discovery::*;
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("scraplink-wasm loaded"));
}

fn parse<T: serde::de::DeserializeOwned>(json: &str, what: &str) -> Result<T, JsValue> {
    serde_json::from_str(json).map_err(|e| JsValue::from_str(&format!("Invalid {} JSON: {}", what, e)))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Great-circle distance in kilometres
#[wasm_bindgen]
pub fn haversine_distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversine_km(&GeoPoint::new(lat1, lon1), &GeoPoint::new(lat2, lon2))
}

/// Filter and sort fetched listings around the viewer.
/// Takes listings and query as JSON, returns the discovered listings as JSON.
#[wasm_bindgen]
pub fn discover_listings(
    listings_json: &str,
    viewer_latitude: Option<f64>,
    viewer_longitude: Option<f64>,
    query_json: &str,
) -> Result<String, JsValue> {
    let listings: Vec<ScrapListing> = parse(listings_json, "listings")?;
    let query: DiscoveryQuery = if query_json.trim().is_empty() {
        DiscoveryQuery::default()
    } else {
        parse(query_json, "query")?
    };
    let viewer = GeoPoint::from_parts(viewer_latitude, viewer_longitude);

    to_json(&discover(&listings, viewer.as_ref(), &query))
}

/// Unique main and sub categories, as `{ main_categories, sub_categories }`
#[wasm_bindgen]
pub fn listing_categories(listings_json: &str) -> Result<String, JsValue> {
    let listings: Vec<ScrapListing> = parse(listings_json, "listings")?;
    to_json(&serde_json::json!({
        "main_categories": unique_main_categories(&listings),
        "sub_categories": unique_sub_categories(&listings),
    }))
}

/// Trim proposed slots and drop blanks; errors when none remain
#[wasm_bindgen]
pub fn validate_proposed_slots(slots_json: &str) -> Result<String, JsValue> {
    let slots: Vec<String> = parse(slots_json, "slots")?;
    let normalized = normalize_proposed_slots(&slots).map_err(JsValue::from_str)?;
    to_json(&normalized)
}

/// Whether the seller picked a usable slot
#[wasm_bindgen]
pub fn is_valid_pickup_slot(slot: &str) -> bool {
    validate_chosen_slot(slot).is_ok()
}

/// Whether a completion price is acceptable
#[wasm_bindgen]
pub fn is_valid_final_price(price: f64) -> bool {
    Decimal::try_from(price)
        .map(|p| validate_final_price(p).is_ok())
        .unwrap_or(false)
}

/// Badge text for a stored pickup status
#[wasm_bindgen]
pub fn pickup_status_label(status: &str) -> String {
    PickupStatus::from_str(status)
        .map(|s| s.label().to_string())
        .unwrap_or_else(|| status.to_string())
}
