//! Validation utilities for the Scrap Link marketplace

use rust_decimal::Decimal;
use validator::ValidationError;

use crate::models::PENDING_SLOT_SENTINEL;
use crate::types::GeoPoint;

// ============================================================================
// Pickup Request Validations
// ============================================================================

/// Trim proposed slots and drop blanks; at least one slot must remain
pub fn normalize_proposed_slots(slots: &[String]) -> Result<Vec<String>, &'static str> {
    let normalized: Vec<String> = slots
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if normalized.is_empty() {
        return Err("At least one pickup slot must be proposed");
    }
    Ok(normalized)
}

/// Validate the slot a seller picks when accepting a request
pub fn validate_chosen_slot(slot: &str) -> Result<&str, &'static str> {
    let trimmed = slot.trim();
    if trimmed.is_empty() {
        return Err("slot required");
    }
    if trimmed.eq_ignore_ascii_case(PENDING_SLOT_SENTINEL) {
        return Err("Choose one of the proposed pickup slots");
    }
    Ok(trimmed)
}

/// Validate the agreed price when completing a pickup
pub fn validate_final_price(price: Decimal) -> Result<(), &'static str> {
    if price <= Decimal::ZERO {
        return Err("Final price must be greater than zero");
    }
    Ok(())
}

// ============================================================================
// Listing Validations
// ============================================================================

/// Validate listing weight (kg, strictly positive)
pub fn validate_weight(weight: Decimal) -> Result<(), &'static str> {
    if weight <= Decimal::ZERO {
        return Err("Weight must be greater than zero");
    }
    Ok(())
}

/// Validate an estimated price (non-negative)
pub fn validate_estimated_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Estimated price cannot be negative");
    }
    Ok(())
}

/// Validate a coordinate pair is on the globe
pub fn validate_coordinates(point: &GeoPoint) -> Result<(), &'static str> {
    if !(-90.0..=90.0).contains(&point.latitude) {
        return Err("Latitude must be between -90 and 90");
    }
    if !(-180.0..=180.0).contains(&point.longitude) {
        return Err("Longitude must be between -180 and 180");
    }
    Ok(())
}

/// Latitude and longitude must be given together
pub fn coordinate_pair(
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<Option<GeoPoint>, &'static str> {
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => {
            let point = GeoPoint::new(latitude, longitude);
            validate_coordinates(&point)?;
            Ok(Some(point))
        }
        (None, None) => Ok(None),
        _ => Err("Latitude and longitude must be provided together"),
    }
}

/// Validate a comma-joined category set has at least one entry
pub fn validate_category_set(raw: &str) -> Result<(), &'static str> {
    if crate::models::split_categories(raw).next().is_none() {
        return Err("At least one category is required");
    }
    Ok(())
}

// ============================================================================
// Moderation Validations
// ============================================================================

/// Trim a flag reason; it must not be blank
pub fn validate_flag_reason(reason: &str) -> Result<&str, &'static str> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err("A reason is required to flag content");
    }
    Ok(trimmed)
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

// ============================================================================
// `validator` derive adapters
// ============================================================================

pub fn positive_decimal(value: &Decimal) -> Result<(), ValidationError> {
    validate_weight(*value).map_err(|msg| {
        let mut err = ValidationError::new("positive");
        err.message = Some(msg.into());
        err
    })
}

pub fn non_negative_decimal(value: &Decimal) -> Result<(), ValidationError> {
    validate_estimated_price(*value).map_err(|msg| {
        let mut err = ValidationError::new("non_negative");
        err.message = Some(msg.into());
        err
    })
}

pub fn category_set(value: &str) -> Result<(), ValidationError> {
    validate_category_set(value).map_err(|msg| {
        let mut err = ValidationError::new("category_set");
        err.message = Some(msg.into());
        err
    })
}
