use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::models::user::{LoginRequest, Session, SignupRequest, User};
use crate::services::database::DatabaseService;
use crate::utils::{AppError, AppResult};

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id
    pub email: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: String, // session id
    pub aud: String,
    pub iss: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: chrono::DateTime<Utc>,
    pub user: User,
}

#[derive(Clone)]
pub struct AuthService {
    db: DatabaseService,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(db: DatabaseService, config: AuthConfig) -> Self {
        Self { db, config }
    }

    /// Validates the form first; the database is only touched once it passes.
    pub async fn signup(&self, request: SignupRequest) -> AppResult<AuthResponse> {
        let user_type = request.check()?;

        let user = User::new(
            request.email,
            request.display_name,
            user_type,
            request.address,
            request.geolocation,
        );
        let password_hash = self.hash_password(&request.password)?;

        let user = self.db.create_user(&user, &password_hash).await?;
        log::info!("Registered {} user {}", user.user_type, user.id);

        self.start_session(user).await
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        use validator::Validate;
        request.validate()?;

        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

        let user = self
            .db
            .get_user_by_email(&request.email)
            .await?
            .ok_or_else(invalid)?;
        let password_hash = self.db.get_password_hash(&user.id).await?.ok_or_else(invalid)?;

        if !verify(&request.password, &password_hash).unwrap_or(false) {
            log::warn!("Failed login for user {}", user.id);
            return Err(invalid());
        }

        log::info!("User {} signed in", user.id);
        self.start_session(user).await
    }

    pub async fn logout(&self, claims: &Claims) -> AppResult<()> {
        self.db.delete_session(&claims.jti).await?;
        log::info!("User {} signed out", claims.sub);
        Ok(())
    }

    /// Resolves a bearer token to its user. The token must verify and its
    /// session must still exist.
    pub async fn authenticate(&self, token: &str) -> AppResult<(User, Claims)> {
        let claims = self.decode_token(token)?;

        let session = self
            .db
            .get_session(&claims.jti)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Session has ended".to_string()))?;
        if session.user_id != claims.sub || session.expires_at <= Utc::now() {
            return Err(AppError::Unauthorized("Session has ended".to_string()));
        }

        let user = self
            .db
            .get_user(&claims.sub)
            .await?
            .ok_or_else(AppError::unauthenticated)?;

        Ok((user, claims))
    }

    async fn start_session(&self, user: User) -> AppResult<AuthResponse> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            created_at: now,
            expires_at: now + Duration::hours(self.config.session_ttl_hours),
        };

        let token = self.generate_jwt(&user, &session)?;
        self.db.create_session(&session).await?;

        Ok(AuthResponse {
            token,
            expires_at: session.expires_at,
            user,
        })
    }

    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        hash(password, self.config.bcrypt_cost)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))
    }

    // Generate JWT token
    fn generate_jwt(&self, user: &User, session: &Session) -> AppResult<String> {
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            iat: session.created_at.timestamp() as usize,
            exp: session.expires_at.timestamp() as usize,
            jti: session.id.clone(),
            aud: self.config.audience.clone(),
            iss: self.config.issuer.clone(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Token encoding failed: {}", e)))
    }

    pub fn decode_token(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.audience.as_str()]);
        validation.set_issuer(&[self.config.issuer.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            log::debug!("Rejected token: {}", e);
            AppError::unauthenticated()
        })
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "test-secret".to_string(),
        issuer: "swaplink-api".to_string(),
        audience: "swaplink-web".to_string(),
        session_ttl_hours: 1,
        bcrypt_cost: 4,
    }
}
