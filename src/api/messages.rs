//! Room message endpoints

use crate::api::ExtractUser;
use crate::api::messages::schemas::{CreateMessage, MarkedRead, MessagesList, UnreadCount};
use crate::core::traits::MessagingService;
use crate::error::ServiceError;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

/// Routes living under a booking, `/bookings/:id/messages`.
pub fn room_router() -> Router {
    Router::new()
        .route("/:id/messages", get(room_messages).post(post_message))
        .route("/:id/messages/read", post(mark_read))
}

pub fn router() -> Router {
    Router::new().route("/unread-count", get(unread_count))
}

async fn room_messages(
    Inject(messaging_service): Inject<dyn MessagingService>,
    ExtractUser(current_user): ExtractUser,
    Path(room_id): Path<Uuid>,
) -> Result<Json<MessagesList>, ServiceError> {
    let messages = messaging_service
        .list_for_room(room_id, current_user)
        .await?;

    Ok(Json(MessagesList {
        messages: messages.into_iter().map(schemas::Message::from).collect(),
    }))
}

async fn post_message(
    Inject(messaging_service): Inject<dyn MessagingService>,
    ExtractUser(current_user): ExtractUser,
    Path(room_id): Path<Uuid>,
    Json(message): Json<CreateMessage>,
) -> Result<(StatusCode, Json<schemas::Message>), ServiceError> {
    let message = messaging_service
        .append(room_id, current_user, message.text)
        .await?;

    Ok((StatusCode::CREATED, Json(message.into())))
}

async fn mark_read(
    Inject(messaging_service): Inject<dyn MessagingService>,
    ExtractUser(current_user): ExtractUser,
    Path(room_id): Path<Uuid>,
) -> Result<Json<MarkedRead>, ServiceError> {
    let updated = messaging_service.mark_read(room_id, current_user).await?;

    Ok(Json(MarkedRead { updated }))
}

async fn unread_count(
    Inject(messaging_service): Inject<dyn MessagingService>,
    ExtractUser(current_user): ExtractUser,
) -> Result<Json<UnreadCount>, ServiceError> {
    let unread = messaging_service.unread_count(current_user).await?;

    Ok(Json(UnreadCount { unread }))
}

pub mod schemas {
    use crate::infrastructure::entities;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Deserialize, Debug)]
    pub struct CreateMessage {
        pub text: String,
    }

    #[derive(Serialize, Debug, Clone)]
    pub struct Message {
        pub id: Uuid,
        pub room_id: Uuid,
        pub sender_id: Uuid,
        pub receiver_id: Uuid,
        pub text: String,
        pub created_at: DateTime<Utc>,
        pub read: bool,
    }

    impl From<entities::Message> for Message {
        fn from(message: entities::Message) -> Self {
            Message {
                id: message.id,
                room_id: message.room_id,
                sender_id: message.sender_id,
                receiver_id: message.receiver_id,
                text: message.text,
                created_at: message.created_at,
                read: message.read,
            }
        }
    }

    #[derive(Serialize, Debug, Default)]
    pub struct MessagesList {
        pub messages: Vec<Message>,
    }

    #[derive(Serialize, Debug)]
    pub struct MarkedRead {
        pub updated: u64,
    }

    #[derive(Serialize, Debug)]
    pub struct UnreadCount {
        pub unread: i64,
    }
}
