//! External API integrations

pub mod email;
pub mod price_oracle;

pub use email::{EmailJsClient, EmailParams, EmailReceipt, EmailSender, NotificationError};
pub use price_oracle::{
    PredictionError, PriceOracle, PriceOracleClient, PricePrediction, PricePredictionRequest,
};
