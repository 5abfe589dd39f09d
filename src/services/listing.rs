use crate::models::surplus::{CreateListingRequest, SurplusItem};
use crate::models::user::User;
use crate::services::database::DatabaseService;
use crate::services::notifications::NotificationService;
use crate::services::storage::ImageStorageService;
use crate::utils::{AppError, AppResult};

#[derive(Clone)]
pub struct ListingService {
    db: DatabaseService,
    storage: ImageStorageService,
    notifications: NotificationService,
    currency: String,
}

impl ListingService {
    pub fn new(
        db: DatabaseService,
        storage: ImageStorageService,
        notifications: NotificationService,
        currency: String,
    ) -> Self {
        Self {
            db,
            storage,
            notifications,
            currency,
        }
    }

    /// Uploads the image, stores the listing and announces it.
    pub async fn create_listing(&self, user: &User, request: CreateListingRequest) -> AppResult<SurplusItem> {
        if !user.user_type.can_list() {
            return Err(AppError::Forbidden(
                "Only stores and restaurants can list surplus".to_string(),
            ));
        }

        let (fields, image, bytes) = request.check(self.storage.max_image_bytes())?;

        let image_url = self
            .storage
            .upload_image(bytes, &image.file_name, &image.content_type)
            .await
            .map_err(|e| {
                log::error!("Image upload for {} failed: {}", user.id, e);
                AppError::Upstream("Image upload failed".to_string())
            })?;

        let item = SurplusItem::new(fields, user, image_url, self.currency.clone());
        let item = self.db.create_surplus(&item).await?;
        log::info!("User {} listed item {} ({})", user.id, item.id, item.title);

        if let Err(e) = self.notifications.announce_listing(&item).await {
            log::warn!("Could not announce item {}: {}", item.id, e);
        }

        Ok(item)
    }
}
