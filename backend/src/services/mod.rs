//! Business logic services for the Scrap Link marketplace

pub mod admin;
pub mod auth;
pub mod listing;
pub mod notification;
pub mod pickup;
pub mod transaction;

pub use admin::AdminService;
pub use auth::AuthService;
pub use listing::ListingService;
pub use notification::{NotificationOutbox, NotificationWorker, RetryPolicy};
pub use pickup::PickupService;
pub use transaction::TransactionService;
