//! Scrap listing service: posting, pricing and discovery

use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use shared::{
    category_set, discover, non_negative_decimal, positive_decimal, split_categories,
    unique_main_categories, unique_sub_categories, coordinate_pair, DiscoveredListing,
    DiscoveryQuery, NewListing, ScrapListing, UserRole,
};

use crate::error::{AppError, AppResult};
use crate::external::{PredictionError, PriceOracle, PricePrediction, PricePredictionRequest};
use crate::gateway::PersistenceGateway;
use crate::session::SessionContext;

/// Listing service
#[derive(Clone)]
pub struct ListingService {
    gateway: Arc<dyn PersistenceGateway>,
    price_oracle: Arc<dyn PriceOracle>,
}

/// Input for posting a listing
#[derive(Debug, Deserialize, Validate)]
pub struct CreateListingInput {
    /// Comma-joined main categories, e.g. "metal, paper"
    #[validate(custom = "category_set")]
    pub scrap_type: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub sub_category: String,
    /// Third category level, only used for price prediction
    #[serde(default)]
    pub leaf_category: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    #[validate(custom = "positive_decimal")]
    pub weight: Decimal,
    /// Manual price; when absent the price oracle is asked
    #[serde(default)]
    #[validate(custom = "non_negative_decimal")]
    pub estimated_price: Option<Decimal>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Input for a standalone price estimate
#[derive(Debug, Deserialize, Validate)]
pub struct PriceEstimateInput {
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    #[serde(default)]
    pub sub_category: String,
    #[serde(default)]
    pub leaf_category: Option<String>,
    pub weight: f64,
}

impl PriceEstimateInput {
    fn check(&self) -> AppResult<()> {
        self.validate()?;
        if !(self.weight.is_finite() && self.weight > 0.0) {
            return Err(AppError::validation("weight", "Weight must be greater than zero"));
        }
        Ok(())
    }
}

impl From<PriceEstimateInput> for PricePredictionRequest {
    fn from(input: PriceEstimateInput) -> Self {
        Self {
            category: input.category,
            sub_category: input.sub_category,
            leaf_category: input.leaf_category,
            weight: input.weight,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub main_categories: Vec<String>,
    pub sub_categories: Vec<String>,
}

impl ListingService {
    pub fn new(gateway: Arc<dyn PersistenceGateway>, price_oracle: Arc<dyn PriceOracle>) -> Self {
        Self {
            gateway,
            price_oracle,
        }
    }

    /// Seller posts a listing; the price comes from the seller or the oracle
    pub async fn create_listing(
        &self,
        session: &SessionContext,
        input: CreateListingInput,
    ) -> AppResult<ScrapListing> {
        let seller = session.require_role(UserRole::Seller)?;
        input.validate()?;

        let location = coordinate_pair(input.latitude, input.longitude)
            .map_err(|msg| AppError::validation("latitude", msg))?
            .or_else(|| seller.location());

        let estimated_price = match input.estimated_price {
            Some(price) => price,
            None => self.predict_listing_price(&input).await?,
        };

        let listing = self
            .gateway
            .insert_listing(NewListing {
                user_id: seller.user_id,
                scrap_type: input.scrap_type.trim().to_string(),
                sub_category: input.sub_category.trim().to_string(),
                description: input.description.trim().to_string(),
                weight: input.weight,
                estimated_price,
                latitude: location.map(|p| p.latitude),
                longitude: location.map(|p| p.longitude),
            })
            .await?;

        tracing::info!(
            scrap_id = %listing.scrap_id,
            seller_id = %seller.user_id,
            estimated_price = %listing.estimated_price,
            "listing posted"
        );
        Ok(listing)
    }

    async fn predict_listing_price(&self, input: &CreateListingInput) -> AppResult<Decimal> {
        let category = split_categories(&input.scrap_type)
            .next()
            .unwrap_or_default()
            .to_string();
        let weight = input
            .weight
            .to_f64()
            .ok_or_else(|| AppError::validation("weight", "Weight is out of range"))?;

        let prediction = self
            .price_oracle
            .predict(&PricePredictionRequest {
                category,
                sub_category: input.sub_category.trim().to_string(),
                leaf_category: input.leaf_category.clone(),
                weight,
            })
            .await?;

        let price = prediction.price().ok_or_else(|| {
            PredictionError::InvalidResponse(format!(
                "predicted price {} is not a number",
                prediction.predicted_price
            ))
        })?;
        Ok(price.max(Decimal::ZERO))
    }

    pub async fn price_estimate(
        &self,
        session: &SessionContext,
        input: PriceEstimateInput,
    ) -> AppResult<PricePrediction> {
        session.require_user()?;
        input.check()?;
        Ok(self.price_oracle.predict(&input.into()).await?)
    }

    pub async fn price_estimate_batch(
        &self,
        session: &SessionContext,
        inputs: Vec<PriceEstimateInput>,
    ) -> AppResult<Vec<PricePrediction>> {
        session.require_user()?;
        for input in &inputs {
            input.check()?;
        }
        let requests: Vec<PricePredictionRequest> = inputs.into_iter().map(Into::into).collect();
        Ok(self.price_oracle.predict_batch(&requests).await?)
    }

    pub async fn oracle_healthy(&self) -> bool {
        self.price_oracle.health().await
    }

    /// Available listings of other users around the viewer
    pub async fn nearby(
        &self,
        session: &SessionContext,
        query: &DiscoveryQuery,
    ) -> AppResult<Vec<DiscoveredListing>> {
        let viewer = session.require_user()?;
        let listings = self.gateway.list_available_listings(viewer.user_id).await?;
        Ok(discover(&listings, viewer.location().as_ref(), query))
    }

    pub async fn categories(&self, session: &SessionContext) -> AppResult<CategoriesResponse> {
        let viewer = session.require_user()?;
        let listings = self.gateway.list_available_listings(viewer.user_id).await?;
        Ok(CategoriesResponse {
            main_categories: unique_main_categories(&listings),
            sub_categories: unique_sub_categories(&listings),
        })
    }

    pub async fn mine(&self, session: &SessionContext) -> AppResult<Vec<ScrapListing>> {
        let owner = session.require_user()?;
        Ok(self.gateway.list_listings_by_owner(owner.user_id).await?)
    }

    pub async fn get(&self, session: &SessionContext, scrap_id: Uuid) -> AppResult<ScrapListing> {
        session.require_user()?;
        self.gateway
            .get_listing(scrap_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Scrap listing".to_string()))
    }
}
