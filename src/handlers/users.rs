use actix_web::web::{Data, Json, Path};
use actix_web::{get, put, HttpResponse};
use serde::Serialize;
use validator::Validate;

use crate::middleware::AuthenticatedUser;
use crate::models::common::ApiResponse;
use crate::models::surplus::SurplusItem;
use crate::models::user::{MemberProfile, UpdateLocationRequest, UserType};
use crate::services::database::DatabaseService;
use crate::utils::AppError;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub user_type: UserType,
    /// Own listings for stores and restaurants, claimed items for NGOs.
    pub items: Vec<SurplusItem>,
}

#[get("/me")]
pub async fn get_me(current: AuthenticatedUser) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(current.user)))
}

#[put("/me/location")]
pub async fn update_location(
    db: Data<DatabaseService>,
    current: AuthenticatedUser,
    payload: Json<UpdateLocationRequest>,
) -> Result<HttpResponse, AppError> {
    let request = payload.into_inner();
    request.validate()?;
    if !request.geolocation.is_valid() {
        return Err(AppError::Validation("Invalid geolocation".to_string()));
    }

    let user = db
        .update_user_location(&current.user.id, request.address, request.geolocation)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", current.user.id)))?;

    log::info!("User {} updated their location", user.id);
    Ok(HttpResponse::Ok().json(ApiResponse::success(user)))
}

#[get("/me/dashboard")]
pub async fn dashboard(
    db: Data<DatabaseService>,
    current: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let user = current.user;
    let items = if user.user_type.can_list() {
        db.list_surplus_by_creator(&user.id).await?
    } else {
        db.list_surplus_claimed_by(&user.id).await?
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(DashboardResponse {
        user_type: user.user_type,
        items,
    })))
}

#[get("/members/{user_type}")]
pub async fn members(
    db: Data<DatabaseService>,
    path: Path<String>,
) -> Result<HttpResponse, AppError> {
    let user_type: UserType = path.into_inner().parse()?;
    let profiles: Vec<MemberProfile> = db
        .get_users_by_type(user_type)
        .await?
        .into_iter()
        .map(MemberProfile::from)
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::success(profiles)))
}
