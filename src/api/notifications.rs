//! Notification endpoints

use crate::api::ExtractUser;
use crate::api::messages::schemas::UnreadCount;
use crate::api::notifications::schemas::{MarkedAllRead, NotificationList};
use crate::core::traits::NotificationService;
use crate::error::ServiceError;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/:id/read", post(mark_read))
        .route("/read-all", post(mark_all_read))
        .route("/unread-count", get(unread_count))
}

async fn list_notifications(
    Inject(notification_service): Inject<dyn NotificationService>,
    ExtractUser(current_user): ExtractUser,
) -> Result<Json<NotificationList>, ServiceError> {
    let notifications = notification_service.list_for_user(current_user).await?;

    Ok(Json(NotificationList {
        notifications: notifications
            .into_iter()
            .map(schemas::Notification::from)
            .collect(),
    }))
}

async fn mark_read(
    Inject(notification_service): Inject<dyn NotificationService>,
    ExtractUser(current_user): ExtractUser,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    notification_service
        .mark_read(notification_id, current_user)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn mark_all_read(
    Inject(notification_service): Inject<dyn NotificationService>,
    ExtractUser(current_user): ExtractUser,
) -> Result<Json<MarkedAllRead>, ServiceError> {
    let updated = notification_service.mark_all_read(current_user).await?;

    Ok(Json(MarkedAllRead { updated }))
}

async fn unread_count(
    Inject(notification_service): Inject<dyn NotificationService>,
    ExtractUser(current_user): ExtractUser,
) -> Result<Json<UnreadCount>, ServiceError> {
    let unread = notification_service.unread_count(current_user).await?;

    Ok(Json(UnreadCount { unread }))
}

pub mod schemas {
    use crate::infrastructure::entities;
    use chrono::{DateTime, Utc};
    use serde::Serialize;
    use uuid::Uuid;

    #[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum Category {
        Booking,
        Message,
        Rating,
    }

    impl From<entities::NotificationCategory> for Category {
        fn from(category: entities::NotificationCategory) -> Self {
            match category {
                entities::NotificationCategory::Booking => Category::Booking,
                entities::NotificationCategory::Message => Category::Message,
                entities::NotificationCategory::Rating => Category::Rating,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct Notification {
        pub id: Uuid,
        pub title: String,
        pub body: String,
        pub category: Category,
        pub related_entity_id: Uuid,
        pub created_at: DateTime<Utc>,
        pub read: bool,
    }

    impl From<entities::Notification> for Notification {
        fn from(notification: entities::Notification) -> Self {
            Notification {
                id: notification.id,
                title: notification.title,
                body: notification.body,
                category: notification.category.into(),
                related_entity_id: notification.related_entity_id,
                created_at: notification.created_at,
                read: notification.read,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct NotificationList {
        pub notifications: Vec<Notification>,
    }

    #[derive(Serialize, Debug)]
    pub struct MarkedAllRead {
        pub updated: u64,
    }
}
