//! HTTP handlers

pub mod admin;
pub mod auth;
pub mod health;
pub mod listing;
pub mod pickup;
pub mod transaction;

pub use admin::*;
pub use auth::*;
pub use health::*;
pub use listing::*;
pub use pickup::*;
pub use transaction::*;
