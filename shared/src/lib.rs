//! Shared types and models for the Scrap Link marketplace
//!
//! This crate contains types shared between the backend, the browser client
//! (via WASM), and other components of the system.

pub mod discovery;
pub mod models;
pub mod types;
pub mod validation;

pub use discovery::*;
pub use models::*;
pub use types::*;
pub use validation::*;
