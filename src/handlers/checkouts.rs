use actix_web::web::{Data, Json, Path};
use actix_web::{get, post, HttpResponse};

use crate::middleware::AuthenticatedUser;
use crate::models::checkout::{PaymentFailureRequest, PaymentSuccessRequest};
use crate::models::common::ApiResponse;
use crate::services::claims::ClaimService;
use crate::utils::AppError;

// POST /checkouts/{id}/success
#[post("/{id}/success")]
pub async fn payment_success(
    claims: Data<ClaimService>,
    current: AuthenticatedUser,
    path: Path<String>,
    payload: Json<PaymentSuccessRequest>,
) -> Result<HttpResponse, AppError> {
    let item = claims
        .confirm_payment(&current.user, &path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        item,
        "Payment successful".to_string(),
    )))
}

// POST /checkouts/{id}/failure
#[post("/{id}/failure")]
pub async fn payment_failure(
    claims: Data<ClaimService>,
    current: AuthenticatedUser,
    path: Path<String>,
    payload: Json<PaymentFailureRequest>,
) -> Result<HttpResponse, AppError> {
    let checkout = claims
        .fail_payment(&current.user, &path.into_inner(), payload.into_inner())
        .await?;
    Err(AppError::PaymentFailed(
        checkout
            .failure_reason
            .unwrap_or_else(|| "Payment was not completed".to_string()),
    ))
}

// GET /checkouts/{id}
#[get("/{id}")]
pub async fn get_checkout(
    claims: Data<ClaimService>,
    current: AuthenticatedUser,
    path: Path<String>,
) -> Result<HttpResponse, AppError> {
    let checkout = claims.get_checkout(&current.user, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(checkout)))
}
