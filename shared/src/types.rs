//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for all distance computations
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// GPS coordinates in decimal degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build a point from nullable columns; both halves must be present and finite
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => {
                Some(Self::new(lat, lon))
            }
            _ => None,
        }
    }

    /// Great-circle distance to `other` in kilometres (haversine)
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_km(self, other)
    }
}

/// Haversine distance between two points in kilometres
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push near-antipodal points just past 1
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Contact details of a marketplace participant, as shown to the counterparty
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactInfo {
    pub user_id: uuid::Uuid,
    pub name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
}

impl ContactInfo {
    /// Name used in greetings, falling back to a generic salutation
    pub fn display_name(&self) -> &str {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => "Customer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        let p = GeoPoint::new(13.7563, 100.5018);
        assert!(p.distance_km(&p).abs() < 1e-9);
    }

    #[test]
    fn test_known_distance() {
        // Bangkok to Chiang Mai is roughly 585 km as the crow flies
        let bangkok = GeoPoint::new(13.7563, 100.5018);
        let chiang_mai = GeoPoint::new(18.7883, 98.9853);
        let d = bangkok.distance_km(&chiang_mai);
        assert!((d - 584.0).abs() < 10.0, "got {}", d);
    }

    #[test]
    fn test_from_parts_requires_both() {
        assert!(GeoPoint::from_parts(Some(1.0), None).is_none());
        assert!(GeoPoint::from_parts(None, Some(1.0)).is_none());
        assert!(GeoPoint::from_parts(Some(f64::NAN), Some(1.0)).is_none());
        assert_eq!(
            GeoPoint::from_parts(Some(1.0), Some(2.0)),
            Some(GeoPoint::new(1.0, 2.0))
        );
    }

    #[test]
    fn test_display_name_fallback() {
        let mut contact = ContactInfo {
            user_id: uuid::Uuid::new_v4(),
            name: Some("  ".to_string()),
            email: "a@b.co".to_string(),
            phone: None,
        };
        assert_eq!(contact.display_name(), "Customer");
        contact.name = Some("Somchai".to_string());
        assert_eq!(contact.display_name(), "Somchai");
    }
}
