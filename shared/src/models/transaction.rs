//! Transaction models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The finalized sale record created when a pickup completes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub transaction_id: Uuid,
    pub seller_id: Uuid,
    pub recycler_id: Uuid,
    pub scrap_id: Uuid,
    pub final_price: Decimal,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

/// Transaction status; `Disputed` and `Refunded` are set by admins only
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
    Disputed,
    Refunded,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
            TransactionStatus::Disputed => "disputed",
            TransactionStatus::Refunded => "refunded",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(TransactionStatus::Completed),
            "disputed" => Some(TransactionStatus::Disputed),
            "refunded" => Some(TransactionStatus::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Completed => write!(f, "Completed"),
            TransactionStatus::Disputed => write!(f, "Disputed"),
            TransactionStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

/// Everything needed to close a pickup in one step
#[derive(Debug, Clone)]
pub struct CompletePickup {
    pub request_id: Uuid,
    pub scrap_id: Uuid,
    pub seller_id: Uuid,
    pub recycler_id: Uuid,
    pub final_price: Decimal,
}
