pub mod checkout;
pub mod common;
pub mod map;
pub mod notification;
pub mod surplus;
pub mod user;
