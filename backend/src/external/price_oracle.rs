//! Price prediction service client
//!
//! The service exposes `GET /health` and `POST /predict`. Callers fall back to
//! manual price entry when a prediction fails.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PriceOracleConfig;

const DEFAULT_CONFIDENCE: f64 = 0.95;

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("price prediction is not configured")]
    NotConfigured,

    #[error("prediction request failed: {0}")]
    Transport(String),

    #[error("prediction failed ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid prediction response: {0}")]
    InvalidResponse(String),
}

/// One prediction input, three category levels deep
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricePredictionRequest {
    pub category: String,
    pub sub_category: String,
    /// Leaf category; defaults to the sub-category when absent
    #[serde(default)]
    pub leaf_category: Option<String>,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriceFactors {
    pub base_price: f64,
    pub weight_multiplier: f64,
    pub market_trend: f64,
    pub quality_adjustment: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PricePrediction {
    pub predicted_price: f64,
    pub confidence: f64,
    pub factors: PriceFactors,
}

impl PricePrediction {
    /// Build a prediction from the service's raw answer
    pub fn from_wire(base_price: f64, predicted_price: Option<f64>, weight: f64) -> Self {
        let predicted = predicted_price.unwrap_or(base_price * weight);
        let denominator = base_price * weight;
        let denominator = if denominator == 0.0 || !denominator.is_finite() {
            1.0
        } else {
            denominator
        };

        Self {
            predicted_price: predicted,
            confidence: DEFAULT_CONFIDENCE,
            factors: PriceFactors {
                base_price,
                weight_multiplier: predicted / denominator,
                market_trend: 1.0,
                quality_adjustment: 1.0,
            },
        }
    }

    /// Predicted price as a listing price, rounded to cents
    pub fn price(&self) -> Option<Decimal> {
        Decimal::from_f64(self.predicted_price).map(|d| d.round_dp(2))
    }
}

/// Source of price predictions
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn health(&self) -> bool;

    async fn predict(&self, request: &PricePredictionRequest) -> Result<PricePrediction, PredictionError>;

    /// Sequential batch prediction; the first failure aborts the batch
    async fn predict_batch(
        &self,
        requests: &[PricePredictionRequest],
    ) -> Result<Vec<PricePrediction>, PredictionError> {
        let mut out = Vec::with_capacity(requests.len());
        for request in requests {
            out.push(self.predict(request).await?);
        }
        Ok(out)
    }
}

/// Normalize a main category into the service's scrap-type vocabulary
pub fn normalize_scrap_type(raw: &str) -> String {
    let normalized = raw
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    if normalized == "ewaste" {
        "e-waste".to_string()
    } else {
        normalized
    }
}

#[derive(Serialize)]
struct PredictBody<'a> {
    scrap_type: String,
    sub_category: &'a str,
    sub_sub_category: &'a str,
    weight: f64,
}

#[derive(Deserialize)]
struct PredictResponse {
    base_price: f64,
    predicted_price: Option<f64>,
}

#[derive(Deserialize)]
struct PredictErrorBody {
    error: Option<String>,
}

/// HTTP client for the prediction service
#[derive(Clone)]
pub struct PriceOracleClient {
    http_client: Client,
    base_url: String,
}

impl PriceOracleClient {
    pub fn new(config: &PriceOracleConfig) -> Result<Self, PredictionError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PredictionError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> Result<String, PredictionError> {
        if self.base_url.is_empty() {
            return Err(PredictionError::NotConfigured);
        }
        Ok(format!("{}{}", self.base_url, path))
    }
}

#[async_trait]
impl PriceOracle for PriceOracleClient {
    async fn health(&self) -> bool {
        let Ok(url) = self.url("/health") else {
            return false;
        };
        match self.http_client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "price oracle health check failed");
                false
            }
        }
    }

    async fn predict(&self, request: &PricePredictionRequest) -> Result<PricePrediction, PredictionError> {
        let leaf = request
            .leaf_category
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(&request.sub_category);

        let body = PredictBody {
            scrap_type: normalize_scrap_type(&request.category),
            sub_category: &request.sub_category,
            sub_sub_category: leaf,
            weight: request.weight,
        };

        let response = self
            .http_client
            .post(self.url("/predict")?)
            .json(&body)
            .send()
            .await
            .map_err(|e| PredictionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<PredictErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| "ML Prediction failed".to_string());
            return Err(PredictionError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let data: PredictResponse = response
            .json()
            .await
            .map_err(|e| PredictionError::InvalidResponse(e.to_string()))?;

        tracing::debug!(
            scrap_type = %body.scrap_type,
            base_price = data.base_price,
            "price predicted"
        );

        Ok(PricePrediction::from_wire(
            data.base_price,
            data.predicted_price,
            request.weight,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_scrap_type() {
        assert_eq!(normalize_scrap_type("  Metal "), "metal");
        assert_eq!(normalize_scrap_type("E   Waste"), "e-waste");
        assert_eq!(normalize_scrap_type("ewaste"), "e-waste");
        assert_eq!(normalize_scrap_type("Paper"), "paper");
    }

    #[test]
    fn test_from_wire_uses_predicted_price() {
        let p = PricePrediction::from_wire(20.0, Some(250.0), 10.0);
        assert_eq!(p.predicted_price, 250.0);
        assert_eq!(p.confidence, 0.95);
        assert!((p.factors.weight_multiplier - 1.25).abs() < 1e-9);
        assert_eq!(p.factors.market_trend, 1.0);
    }

    #[test]
    fn test_from_wire_falls_back_to_base_times_weight() {
        let p = PricePrediction::from_wire(12.5, None, 4.0);
        assert_eq!(p.predicted_price, 50.0);
        assert_eq!(p.factors.weight_multiplier, 1.0);
        assert_eq!(p.price(), Some(Decimal::from(50)));
    }

    #[test]
    fn test_zero_base_price_does_not_divide_by_zero() {
        let p = PricePrediction::from_wire(0.0, Some(30.0), 5.0);
        assert_eq!(p.factors.weight_multiplier, 30.0);
    }

    #[tokio::test]
    async fn test_unconfigured_client() {
        let client = PriceOracleClient::new(&PriceOracleConfig {
            base_url: String::new(),
            timeout_secs: 1,
        })
        .unwrap();
        assert!(!client.health().await);
        let request = PricePredictionRequest {
            category: "metal".into(),
            sub_category: "copper".into(),
            leaf_category: None,
            weight: 1.0,
        };
        assert!(matches!(client.predict(&request).await, Err(PredictionError::NotConfigured)));
    }
}
