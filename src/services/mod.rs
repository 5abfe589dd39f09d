pub mod auth;
pub mod claims;
pub mod database;
pub mod listing;
pub mod map;
pub mod notifications;
pub mod razorpay;
pub mod routing;
pub mod storage;
