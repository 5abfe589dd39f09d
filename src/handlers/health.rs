use actix_web::web::Data;
use actix_web::HttpResponse;
use serde::Serialize;

use crate::services::database::{DatabaseService, DatabaseStats};
use crate::utils::AppError;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: i64,
    pub database: DatabaseStats,
}

pub async fn health_check(db: Data<DatabaseService>) -> Result<HttpResponse, AppError> {
    db.health_check().await?;
    let stats = db.get_statistics().await?;

    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        service: "swaplink-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().timestamp_millis(),
        database: stats,
    }))
}
