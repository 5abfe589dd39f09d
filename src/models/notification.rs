use chrono::{serde::ts_milliseconds, DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub message: String,
    pub sent_by: String,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(message: String, sent_by: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message,
            sent_by: sent_by.to_string(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationEntry {
    #[serde(flatten)]
    pub notification: Notification,
    pub unread: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationFeed {
    pub notifications: Vec<NotificationEntry>,
    pub unread_count: usize,
    /// Badge text for the bell icon; absent when nothing is unread.
    pub badge: Option<String>,
    #[serde(with = "ts_milliseconds")]
    pub last_opened_at: DateTime<Utc>,
}
