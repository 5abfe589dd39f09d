use chrono::{serde::ts_milliseconds, DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::models::common::GeoPoint;
use crate::utils::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Store,
    Restaurant,
    Ngo,
}

impl UserType {
    /// Stores and restaurants list surplus; NGOs only claim it.
    pub fn can_list(&self) -> bool {
        matches!(self, UserType::Store | UserType::Restaurant)
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserType::Store => write!(f, "store"),
            UserType::Restaurant => write!(f, "restaurant"),
            UserType::Ngo => write!(f, "ngo"),
        }
    }
}

impl FromStr for UserType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "store" => Ok(UserType::Store),
            "restaurant" => Ok(UserType::Restaurant),
            "ngo" => Ok(UserType::Ngo),
            other => Err(AppError::Validation(format!("Unknown user type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub user_type: UserType,
    pub address: Option<String>,
    pub geolocation: Option<GeoPoint>,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        email: String,
        display_name: Option<String>,
        user_type: UserType,
        address: Option<String>,
        geolocation: Option<GeoPoint>,
    ) -> Self {
        let email = email.trim().to_lowercase();
        let display_name = display_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or(&email).to_string());

        Self {
            id: Uuid::new_v4().to_string(),
            email,
            display_name,
            user_type,
            address,
            geolocation,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    pub confirm_password: String,

    #[serde(default, deserialize_with = "blank_user_type")]
    pub user_type: Option<UserType>,

    #[validate(length(max = 100, message = "Display name must be at most 100 characters"))]
    pub display_name: Option<String>,

    #[validate(length(max = 300, message = "Address must be at most 300 characters"))]
    pub address: Option<String>,

    pub geolocation: Option<GeoPoint>,
}

impl SignupRequest {
    /// Runs every signup check in the order the form reports them and returns
    /// the selected user type. Nothing here touches the network.
    pub fn check(&self) -> Result<UserType, AppError> {
        if self.password != self.confirm_password {
            return Err(AppError::Validation("Passwords do not match".to_string()));
        }

        let user_type = self
            .user_type
            .ok_or_else(|| AppError::Validation("Please select a user type".to_string()))?;

        self.validate()?;

        if let Some(point) = &self.geolocation {
            if !point.is_valid() {
                return Err(AppError::Validation("Invalid geolocation".to_string()));
            }
        }

        Ok(user_type)
    }
}

/// Treats a missing or empty `user_type` as "not selected".
fn blank_user_type<'de, D>(deserializer: D) -> Result<Option<UserType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|e: AppError| de::Error::custom(e.to_string())),
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLocationRequest {
    #[validate(length(max = 300, message = "Address must be at most 300 characters"))]
    pub address: Option<String>,
    pub geolocation: GeoPoint,
}

/// What other members see of a user.
#[derive(Debug, Clone, Serialize)]
pub struct MemberProfile {
    pub id: String,
    pub display_name: String,
    pub user_type: UserType,
    pub address: Option<String>,
}

impl From<User> for MemberProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name,
            user_type: user.user_type,
            address: user.address,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(password: &str, confirm: &str, user_type: Option<UserType>) -> SignupRequest {
        SignupRequest {
            email: "shop@example.com".to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
            user_type,
            display_name: None,
            address: None,
            geolocation: None,
        }
    }

    #[test]
    fn test_user_creation() {
        let user = User::new(
            "Corner.Shop@Example.com ".to_string(),
            None,
            UserType::Store,
            None,
            None,
        );
        assert_eq!(user.email, "corner.shop@example.com");
        assert_eq!(user.display_name, "corner.shop");
        assert!(user.user_type.can_list());
    }

    #[test]
    fn test_signup_rejects_mismatched_passwords() {
        let err = signup("secret1", "secret2", Some(UserType::Ngo)).check().unwrap_err();
        assert_eq!(err.to_string(), "Passwords do not match");
    }

    #[test]
    fn test_signup_rejects_missing_user_type() {
        let err = signup("secret1", "secret1", None).check().unwrap_err();
        assert_eq!(err.to_string(), "Please select a user type");
    }

    #[test]
    fn test_signup_password_mismatch_reported_first() {
        let err = signup("a", "b", None).check().unwrap_err();
        assert_eq!(err.to_string(), "Passwords do not match");
    }

    #[test]
    fn test_signup_accepts_valid_form() {
        let user_type = signup("secret1", "secret1", Some(UserType::Restaurant))
            .check()
            .unwrap();
        assert_eq!(user_type, UserType::Restaurant);
    }

    #[test]
    fn test_blank_user_type_is_missing() {
        let request: SignupRequest = serde_json::from_value(serde_json::json!({
            "email": "ngo@example.com",
            "password": "secret1",
            "confirm_password": "secret1",
            "user_type": ""
        }))
        .unwrap();
        assert!(request.user_type.is_none());

        let request: SignupRequest = serde_json::from_value(serde_json::json!({
            "email": "ngo@example.com",
            "password": "secret1",
            "confirm_password": "secret1",
            "user_type": "NGO"
        }))
        .unwrap();
        assert_eq!(request.user_type, Some(UserType::Ngo));
    }

    #[test]
    fn test_ngo_cannot_list() {
        assert!(!UserType::Ngo.can_list());
        assert!(UserType::Restaurant.can_list());
    }
}
