//! Domain models for the Scrap Link marketplace

mod flag;
mod listing;
mod pickup;
mod transaction;
mod user;

pub use flag::*;
pub use listing::*;
pub use pickup::*;
pub use transaction::*;
pub use user::*;
