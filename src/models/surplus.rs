use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{
    serde::{ts_milliseconds, ts_milliseconds_option},
    DateTime, Utc,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::common::GeoPoint;
use crate::models::user::User;
use crate::utils::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurplusItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub quantity: String,
    pub location: String,
    pub geolocation: Option<GeoPoint>,
    pub price: Decimal,
    pub currency: String,
    pub image_url: String,
    pub created_by: String,
    pub creator_name: String,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub claimed_by: Option<String>,
    pub claimed_by_name: Option<String>,
    #[serde(default, with = "ts_milliseconds_option")]
    pub claimed_at: Option<DateTime<Utc>>,
    pub payment_id: Option<String>,
}

impl SurplusItem {
    pub fn new(request: ListingFields, creator: &User, image_url: String, currency: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: request.title.trim().to_string(),
            description: request.description.trim().to_string(),
            quantity: request.quantity.trim().to_string(),
            location: request.location.trim().to_string(),
            geolocation: request.geolocation,
            price: request.price,
            currency,
            image_url,
            created_by: creator.id.clone(),
            creator_name: creator.display_name.clone(),
            created_at: Utc::now(),
            claimed_by: None,
            claimed_by_name: None,
            claimed_at: None,
            payment_id: None,
        }
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed_by.is_some()
    }

    pub fn is_free(&self) -> bool {
        self.price.is_zero()
    }

    /// Price in the currency's minor unit (paise for INR).
    pub fn amount_minor_units(&self) -> Result<i64, AppError> {
        (self.price * Decimal::ONE_HUNDRED)
            .round()
            .to_i64()
            .ok_or_else(|| AppError::Validation(format!("Price {} is out of range", self.price)))
    }
}

/// Fields written by a successful claim.
#[derive(Debug, Clone)]
pub struct ClaimRecord {
    pub claimed_by: String,
    pub claimed_by_name: String,
    pub claimed_at: DateTime<Utc>,
    pub payment_id: Option<String>,
}

impl ClaimRecord {
    pub fn new(claimer: &User, payment_id: Option<String>) -> Self {
        Self {
            claimed_by: claimer.id.clone(),
            claimed_by_name: claimer.display_name.clone(),
            claimed_at: Utc::now(),
            payment_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImagePayload {
    pub file_name: String,
    pub content_type: String,
    /// Base64 body, optionally as a `data:` URL.
    pub data: String,
}

impl ImagePayload {
    pub fn decode(&self, max_bytes: usize) -> Result<Vec<u8>, AppError> {
        if !self.content_type.starts_with("image/") {
            return Err(AppError::Validation("Only image uploads are accepted".to_string()));
        }

        let encoded = match self.data.split_once(";base64,") {
            Some((prefix, body)) if prefix.starts_with("data:") => body,
            _ => self.data.as_str(),
        };

        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| AppError::Validation("Image data is not valid base64".to_string()))?;

        if bytes.is_empty() {
            return Err(AppError::Validation("Please select an image to upload!".to_string()));
        }
        if bytes.len() > max_bytes {
            return Err(AppError::Validation(format!(
                "Image is larger than {} bytes",
                max_bytes
            )));
        }

        Ok(bytes)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateListingRequest {
    #[validate(length(min = 1, max = 120, message = "Item name must be at most 120 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: String,

    #[validate(length(min = 1, max = 50, message = "Quantity must be at most 50 characters"))]
    pub quantity: String,

    #[validate(length(min = 1, max = 200, message = "Location must be at most 200 characters"))]
    pub location: String,

    pub geolocation: Option<GeoPoint>,
    pub price: Option<Decimal>,
    pub image: Option<ImagePayload>,
}

/// A listing request that passed validation, minus its image.
#[derive(Debug, Clone)]
pub struct ListingFields {
    pub title: String,
    pub description: String,
    pub quantity: String,
    pub location: String,
    pub geolocation: Option<GeoPoint>,
    pub price: Decimal,
}

impl CreateListingRequest {
    /// Validates the form and decodes the image without uploading anything.
    pub fn check(self, max_image_bytes: usize) -> Result<(ListingFields, ImagePayload, Vec<u8>), AppError> {
        for (value, message) in [
            (&self.title, "Item name is required"),
            (&self.description, "Description is required"),
            (&self.quantity, "Quantity is required"),
            (&self.location, "Location is required"),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Validation(message.to_string()));
            }
        }
        self.validate()?;

        let price = self.price.unwrap_or(Decimal::ZERO);
        if price < Decimal::ZERO {
            return Err(AppError::Validation("Price cannot be negative".to_string()));
        }

        if let Some(point) = &self.geolocation {
            if !point.is_valid() {
                return Err(AppError::Validation("Invalid geolocation".to_string()));
            }
        }

        let image = self
            .image
            .ok_or_else(|| AppError::Validation("Please select an image to upload!".to_string()))?;
        let bytes = image.decode(max_image_bytes)?;

        Ok((
            ListingFields {
                title: self.title,
                description: self.description,
                quantity: self.quantity,
                location: self.location,
                geolocation: self.geolocation,
                price,
            },
            image,
            bytes,
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: crate::models::common::ClaimFilter,
}
