use actix_web::web::{Data, Json, Path, Query};
use actix_web::{get, post, HttpResponse};
use serde::Deserialize;

use crate::config::AppConfig;
use crate::middleware::AuthenticatedUser;
use crate::models::common::{ApiResponse, ClaimFilter, GeoPoint};
use crate::models::surplus::{CreateListingRequest, ListQuery};
use crate::services::{
    claims::ClaimService, database::DatabaseService, listing::ListingService, map,
    routing::{self, RoutingService},
};
use crate::utils::AppError;

#[derive(Debug, Deserialize)]
pub struct RouteQuery {
    pub from_lat: Option<f64>,
    pub from_lng: Option<f64>,
}

impl RouteQuery {
    fn start(&self) -> Option<GeoPoint> {
        match (self.from_lat, self.from_lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        }
    }
}

// GET /surplus?status=all|available|claimed
#[get("")]
pub async fn list_surplus(
    db: Data<DatabaseService>,
    query: Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let items = db.list_surplus(query.status).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(items)))
}

// GET /surplus/deck
#[get("/deck")]
pub async fn swipe_deck(db: Data<DatabaseService>) -> Result<HttpResponse, AppError> {
    let items = db.list_surplus(ClaimFilter::Available).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(items)))
}

// GET /surplus/map
#[get("/map")]
pub async fn map_markers(
    db: Data<DatabaseService>,
    app: Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    let items = db.list_geolocated_surplus().await?;
    let center = GeoPoint::new(app.map_center_lat, app.map_center_lng);
    Ok(HttpResponse::Ok().json(ApiResponse::success(map::map_view(&items, center))))
}

// POST /surplus
#[post("")]
pub async fn create_listing(
    listings: Data<ListingService>,
    current: AuthenticatedUser,
    payload: Json<CreateListingRequest>,
) -> Result<HttpResponse, AppError> {
    let item = listings
        .create_listing(&current.user, payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
        item,
        "Item added successfully!".to_string(),
    )))
}

// GET /surplus/{id}
#[get("/{id}")]
pub async fn get_surplus(
    db: Data<DatabaseService>,
    path: Path<String>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();
    let item = db
        .get_surplus(&item_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Surplus item {}", item_id)))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(item)))
}

// POST /surplus/{id}/checkout
#[post("/{id}/checkout")]
pub async fn begin_checkout(
    claims: Data<ClaimService>,
    current: AuthenticatedUser,
    path: Path<String>,
) -> Result<HttpResponse, AppError> {
    let checkout = claims.begin_checkout(&current.user, &path.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(checkout)))
}

// POST /surplus/{id}/claim
#[post("/{id}/claim")]
pub async fn claim_free(
    claims: Data<ClaimService>,
    current: AuthenticatedUser,
    path: Path<String>,
) -> Result<HttpResponse, AppError> {
    let item = claims.claim_free(&current.user, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        item,
        "Item claimed".to_string(),
    )))
}

// GET /surplus/{id}/route?from_lat=..&from_lng=..
#[get("/{id}/route")]
pub async fn route_to_item(
    db: Data<DatabaseService>,
    router: Data<RoutingService>,
    current: AuthenticatedUser,
    path: Path<String>,
    query: Query<RouteQuery>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();
    let item = db
        .get_surplus(&item_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Surplus item {}", item_id)))?;

    let start = query.start().or(current.user.geolocation);
    let (start, end) = routing::route_endpoints(start, item.geolocation)?;

    let overlay = router.route(start, end).await.map_err(|e| {
        log::warn!("Routing to item {} failed: {}", item.id, e);
        AppError::Upstream("Could not calculate a route".to_string())
    })?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(overlay)))
}
