use chrono::{DateTime, Utc};

use crate::models::notification::{Notification, NotificationEntry, NotificationFeed};
use crate::models::surplus::SurplusItem;
use crate::models::user::User;
use crate::services::database::DatabaseService;
use crate::utils::AppResult;

#[derive(Clone)]
pub struct NotificationService {
    db: DatabaseService,
    feed_limit: u32,
}

impl NotificationService {
    pub fn new(db: DatabaseService, feed_limit: u32) -> Self {
        Self { db, feed_limit }
    }

    /// Feed as the user sees it before opening the panel.
    pub async fn feed(&self, user: &User) -> AppResult<NotificationFeed> {
        let last_opened = self.last_opened(user).await?;
        let entries = self.entries(user, last_opened).await?;
        let unread_count = entries.iter().filter(|e| e.unread).count();

        Ok(NotificationFeed {
            notifications: entries,
            unread_count,
            badge: badge(unread_count),
            last_opened_at: last_opened,
        })
    }

    /// Marks the panel opened now. Entries keep the unread flags they had
    /// against the previous marker so the client can highlight them once.
    pub async fn open_panel(&self, user: &User) -> AppResult<NotificationFeed> {
        let previous = self.last_opened(user).await?;
        let entries = self.entries(user, previous).await?;

        let now = Utc::now();
        self.db.set_last_opened(&user.id, now).await?;
        log::debug!("User {} opened notifications", user.id);

        Ok(NotificationFeed {
            notifications: entries,
            unread_count: 0,
            badge: None,
            last_opened_at: now,
        })
    }

    pub async fn announce_listing(&self, item: &SurplusItem) -> AppResult<()> {
        let notification = Notification::new(
            format!("{} listed {}", item.creator_name, item.title),
            &item.created_by,
        );
        self.db.create_notification(&notification).await
    }

    async fn last_opened(&self, user: &User) -> AppResult<DateTime<Utc>> {
        Ok(self
            .db
            .get_last_opened(&user.id)
            .await?
            .unwrap_or(user.created_at))
    }

    async fn entries(&self, user: &User, last_opened: DateTime<Utc>) -> AppResult<Vec<NotificationEntry>> {
        let notifications = self.db.get_notifications_for(&user.id, self.feed_limit).await?;
        Ok(notifications
            .into_iter()
            .map(|notification| NotificationEntry {
                unread: notification.created_at > last_opened,
                notification,
            })
            .collect())
    }
}

/// Bell badge text.
pub fn badge(unread: usize) -> Option<String> {
    match unread {
        0 => None,
        1..=9 => Some(unread.to_string()),
        _ => Some("9+".to_string()),
    }
}
