pub mod auth;
pub mod checkouts;
pub mod health;
pub mod notifications;
pub mod surplus;
pub mod users;
