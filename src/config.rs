use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub razorpay: RazorpayConfig,
    pub storage: StorageConfig,
    pub routing: RoutingConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    pub session_ttl_hours: i64,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayConfig {
    pub api_url: String,
    pub key_id: String,
    pub key_secret: String,
    pub currency: String,
    pub merchant_name: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub api_url: String,
    pub cloud_name: String,
    pub upload_preset: String,
    pub max_image_bytes: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub notification_feed_limit: u32,
    pub map_center_lat: f64,
    pub map_center_lng: f64,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        let timeout_secs = parse_or("HTTP_TIMEOUT_SECS", 15);

        Ok(Config {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "mem://".to_string()),
                namespace: env::var("DATABASE_NS").unwrap_or_else(|_| "swaplink".to_string()),
                database: env::var("DATABASE_DB").unwrap_or_else(|_| "main".to_string()),
                username: env::var("DATABASE_USER").ok(),
                password: env::var("DATABASE_PASS").ok(),
            },

            auth: AuthConfig {
                jwt_secret: env::var("JWT_SECRET")?,
                issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "swaplink-api".to_string()),
                audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "swaplink-web".to_string()),
                session_ttl_hours: parse_or("SESSION_TTL_HOURS", 24),
                bcrypt_cost: parse_or("BCRYPT_COST", bcrypt::DEFAULT_COST),
            },

            razorpay: RazorpayConfig {
                api_url: env::var("RAZORPAY_API_URL")
                    .unwrap_or_else(|_| "https://api.razorpay.com".to_string()),
                key_id: env::var("RAZORPAY_KEY_ID")?,
                key_secret: env::var("RAZORPAY_KEY_SECRET")?,
                currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "INR".to_string()),
                merchant_name: env::var("MERCHANT_NAME").unwrap_or_else(|_| "SwapLink".to_string()),
                timeout_secs,
            },

            storage: StorageConfig {
                api_url: env::var("CLOUDINARY_API_URL")
                    .unwrap_or_else(|_| "https://api.cloudinary.com/v1_1".to_string()),
                cloud_name: env::var("CLOUDINARY_CLOUD_NAME")?,
                upload_preset: env::var("CLOUDINARY_UPLOAD_PRESET")?,
                max_image_bytes: parse_or("MAX_IMAGE_BYTES", 5 * 1024 * 1024),
                timeout_secs,
            },

            routing: RoutingConfig {
                base_url: env::var("ROUTING_BASE_URL")
                    .unwrap_or_else(|_| "https://router.project-osrm.org".to_string()),
                profile: env::var("ROUTING_PROFILE").unwrap_or_else(|_| "driving".to_string()),
                timeout_secs,
            },

            app: AppConfig {
                notification_feed_limit: parse_or("NOTIFICATION_FEED_LIMIT", 20),
                map_center_lat: parse_or("MAP_CENTER_LAT", 19.0760),
                map_center_lng: parse_or("MAP_CENTER_LNG", 72.8777),
            },
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            notification_feed_limit: 20,
            map_center_lat: 19.0760,
            map_center_lng: 72.8777,
        }
    }
}
