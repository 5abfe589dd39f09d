use actix_web::{dev::Payload, http::header, web::Data, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;

use crate::models::user::User;
use crate::services::auth::{AuthService, Claims};
use crate::utils::AppError;

/// The signed-in user behind a `Bearer` token. Handlers that take this
/// extractor reject anonymous requests with 401 before running any code.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub claims: Claims,
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let auth = req.app_data::<Data<AuthService>>().cloned();

        Box::pin(async move {
            let token = token.ok_or_else(AppError::unauthenticated)?;
            let auth = auth.ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("AuthService is not registered"))
            })?;

            let (user, claims) = auth.authenticate(&token).await?;
            Ok(AuthenticatedUser { user, claims })
        })
    }
}
