use actix_web::web::Data;
use actix_web::{get, post, HttpResponse};

use crate::middleware::AuthenticatedUser;
use crate::models::common::ApiResponse;
use crate::services::notifications::NotificationService;
use crate::utils::AppError;

#[get("")]
pub async fn get_notifications(
    notifications: Data<NotificationService>,
    current: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let feed = notifications.feed(&current.user).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(feed)))
}

/// Called when the bell panel opens.
#[post("/open")]
pub async fn open_notifications(
    notifications: Data<NotificationService>,
    current: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let feed = notifications.open_panel(&current.user).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(feed)))
}
