//! User and role models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ContactInfo, GeoPoint};

/// A marketplace participant's profile, stored in the `users` collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub registered_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn location(&self) -> Option<GeoPoint> {
        GeoPoint::from_parts(self.latitude, self.longitude)
    }

    pub fn contact(&self) -> ContactInfo {
        ContactInfo {
            user_id: self.user_id,
            name: Some(self.name.clone()),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// Marketplace role of an ordinary user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Seller,
    Recycler,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Seller => "seller",
            UserRole::Recycler => "recycler",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "seller" => Some(UserRole::Seller),
            "recycler" => Some(UserRole::Recycler),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Seller => write!(f, "Seller"),
            UserRole::Recycler => write!(f, "Recycler"),
        }
    }
}

/// An administrator, authenticated separately from ordinary users
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminIdentity {
    pub admin_id: Uuid,
    pub email: String,
}

/// The identity a session can hold once resolved
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Identity {
    User(UserProfile),
    Admin(AdminIdentity),
}
