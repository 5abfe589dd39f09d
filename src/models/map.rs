use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::common::GeoPoint;
use crate::models::surplus::SurplusItem;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MarkerState {
    Available,
    Claimed,
    Mixed,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkerItem {
    pub id: String,
    pub title: String,
    pub quantity: String,
    pub location: String,
    pub image_url: String,
    pub creator_name: String,
    pub price: Decimal,
    pub claimed: bool,
}

impl From<&SurplusItem> for MarkerItem {
    fn from(item: &SurplusItem) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            quantity: item.quantity.clone(),
            location: item.location.clone(),
            image_url: item.image_url.clone(),
            creator_name: item.creator_name.clone(),
            price: item.price,
            claimed: item.is_claimed(),
        }
    }
}

/// Every item sitting on exactly the same coordinates.
#[derive(Debug, Clone, Serialize)]
pub struct MarkerGroup {
    pub key: String,
    pub position: GeoPoint,
    pub state: MarkerState,
    pub available_count: usize,
    pub claimed_count: usize,
    pub items: Vec<MarkerItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub center: GeoPoint,
    pub markers: Vec<MarkerGroup>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RouteOverlay {
    pub start: GeoPoint,
    pub end: GeoPoint,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    /// Polyline as `[lat, lng]` pairs.
    pub path: Vec<[f64; 2]>,
}
