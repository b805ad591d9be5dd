//! Notification fan-out: the single place notifications are written.

use crate::config::AppConfig;
use crate::core::retry::retry_transient;
use crate::core::traits::NotificationService;
use crate::error::{ServiceError, ServiceResult};
use crate::infrastructure::entities::{Notification, NotificationCategory};
use crate::infrastructure::traits::NotificationRepository;
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, injectable};
use log::debug;
use uuid::Uuid;

#[injectable(NotificationService)]
pub struct NotificationFanout {
    notifications: Ref<dyn NotificationRepository>,
    config: Ref<AppConfig>,
}

impl NotificationFanout {
    pub fn new(notifications: Ref<dyn NotificationRepository>, config: Ref<AppConfig>) -> Self {
        Self {
            notifications,
            config,
        }
    }
}

#[async_trait]
impl NotificationService for NotificationFanout {
    async fn notify(
        &self,
        target_user_id: Uuid,
        title: String,
        body: String,
        category: NotificationCategory,
        related_entity_id: Uuid,
    ) -> ServiceResult<Notification> {
        let draft = Notification {
            id: Uuid::new_v4(),
            target_user_id,
            title,
            body,
            category,
            related_entity_id,
            created_at: Utc::now(),
            read: false,
        };

        let notification = retry_transient(&self.config.retry, "notify", || {
            self.notifications.insert_notification(draft.clone())
        })
        .await?;

        debug!(
            "notification {} ({:?}) created for {}",
            notification.id, notification.category, notification.target_user_id
        );
        Ok(notification)
    }

    async fn list_for_user(&self, user_id: Uuid) -> ServiceResult<Vec<Notification>> {
        retry_transient(&self.config.retry, "list notifications", || {
            self.notifications.list_notifications(user_id)
        })
        .await
    }

    async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> ServiceResult<()> {
        let found = retry_transient(&self.config.retry, "mark notification read", || {
            self.notifications.mark_read(notification_id, user_id)
        })
        .await?;

        if found {
            Ok(())
        } else {
            Err(ServiceError::NotFound("notification"))
        }
    }

    async fn mark_all_read(&self, user_id: Uuid) -> ServiceResult<u64> {
        retry_transient(&self.config.retry, "mark all notifications read", || {
            self.notifications.mark_all_read(user_id)
        })
        .await
    }

    async fn unread_count(&self, user_id: Uuid) -> ServiceResult<i64> {
        retry_transient(&self.config.retry, "count unread notifications", || {
            self.notifications.count_unread(user_id)
        })
        .await
    }

    async fn notify_rating(
        &self,
        provider_id: Uuid,
        service_id: Uuid,
        stars: u8,
        comment: Option<String>,
    ) -> ServiceResult<Notification> {
        if !(1..=5).contains(&stars) {
            return Err(ServiceError::validation("rating must be between 1 and 5 stars"));
        }

        let mut body = format!("Your service received a {stars}-star rating.");
        if let Some(comment) = comment.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            body.push_str(&format!(" \"{}\"", preview(comment)));
        }

        self.notify(
            provider_id,
            "New Rating".to_owned(),
            body,
            NotificationCategory::Rating,
            service_id,
        )
        .await
    }
}

/// First 100 characters of a text, for notification bodies.
pub fn preview(text: &str) -> String {
    const PREVIEW_CHARS: usize = 100;

    let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().nth(PREVIEW_CHARS).is_some() {
        preview.push('…');
    }
    preview
}
