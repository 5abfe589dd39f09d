use actix_web::web::{Data, Json};
use actix_web::{get, post, HttpResponse};

use crate::middleware::AuthenticatedUser;
use crate::models::common::ApiResponse;
use crate::models::user::{LoginRequest, SignupRequest};
use crate::services::auth::AuthService;
use crate::utils::AppError;

// POST /auth/signup
#[post("/signup")]
pub async fn signup(
    auth: Data<AuthService>,
    payload: Json<SignupRequest>,
) -> Result<HttpResponse, AppError> {
    let response = auth.signup(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(response)))
}

// POST /auth/login
#[post("/login")]
pub async fn login(
    auth: Data<AuthService>,
    payload: Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let response = auth.login(payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

// POST /auth/logout
#[post("/logout")]
pub async fn logout(
    auth: Data<AuthService>,
    current: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    auth.logout(&current.claims).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        (),
        "Signed out".to_string(),
    )))
}

// GET /auth/session
#[get("/session")]
pub async fn current_session(current: AuthenticatedUser) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(current.user)))
}
