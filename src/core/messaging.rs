//! Per-booking message log with read tracking.

use crate::config::AppConfig;
use crate::core::notifications::preview;
use crate::core::realtime::RoomEvent;
use crate::core::retry::retry_transient;
use crate::core::traits::{Broadcaster, MessagingService, NotificationService, RoomRegistry};
use crate::error::{ServiceError, ServiceResult};
use crate::infrastructure::entities::{Message, NotificationCategory};
use crate::infrastructure::traits::MessageRepository;
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, injectable};
use log::debug;
use uuid::Uuid;

#[injectable(MessagingService)]
pub struct MessageLog {
    messages: Ref<dyn MessageRepository>,
    rooms: Ref<dyn RoomRegistry>,
    notifications: Ref<dyn NotificationService>,
    broadcaster: Ref<dyn Broadcaster>,
    config: Ref<AppConfig>,
}

impl MessageLog {
    pub fn new(
        messages: Ref<dyn MessageRepository>,
        rooms: Ref<dyn RoomRegistry>,
        notifications: Ref<dyn NotificationService>,
        broadcaster: Ref<dyn Broadcaster>,
        config: Ref<AppConfig>,
    ) -> Self {
        Self {
            messages,
            rooms,
            notifications,
            broadcaster,
            config,
        }
    }
}

#[async_trait]
impl MessagingService for MessageLog {
    async fn append(&self, room_id: Uuid, sender_id: Uuid, text: String) -> ServiceResult<Message> {
        if text.trim().is_empty() {
            return Err(ServiceError::validation("message text must not be empty"));
        }

        let room = self.rooms.authorize(room_id, sender_id).await?;
        let closed = || ServiceError::forbidden("this booking is closed for new messages");
        if room.is_closed() {
            return Err(closed());
        }
        let Some(receiver_id) = room.other_member(sender_id) else {
            return Err(ServiceError::forbidden("you are not a member of this booking"));
        };

        let draft = Message {
            id: Uuid::new_v4(),
            room_id,
            sender_id,
            receiver_id,
            text,
            created_at: Utc::now(),
            read: false,
        };

        let message = retry_transient(&self.config.retry, "append message", || {
            self.messages.insert_message(draft.clone())
        })
        .await?
        .ok_or_else(closed)?;

        debug!("message {} appended to room {room_id}", message.id);

        self.notifications
            .notify_best_effort(
                receiver_id,
                "New Message".to_owned(),
                preview(&message.text),
                NotificationCategory::Message,
                room_id,
            )
            .await;

        // Published only after the append committed, from the task that appended it.
        self.broadcaster
            .publish(room_id, RoomEvent::NewMessage(message.clone()));

        Ok(message)
    }

    async fn list_for_room(&self, room_id: Uuid, viewer_id: Uuid) -> ServiceResult<Vec<Message>> {
        self.rooms.authorize(room_id, viewer_id).await?;

        retry_transient(&self.config.retry, "list messages", || {
            self.messages.list_room_messages(room_id)
        })
        .await
    }

    async fn mark_read(&self, room_id: Uuid, reader_id: Uuid) -> ServiceResult<u64> {
        self.rooms.authorize(room_id, reader_id).await?;

        let count = retry_transient(&self.config.retry, "mark messages read", || {
            self.messages.mark_room_read(room_id, reader_id)
        })
        .await?;

        if count > 0 {
            self.broadcaster.publish(
                room_id,
                RoomEvent::MessagesRead {
                    room_id,
                    reader_id,
                    count,
                },
            );
        }

        Ok(count)
    }

    async fn unread_count(&self, user_id: Uuid) -> ServiceResult<i64> {
        retry_transient(&self.config.retry, "count unread messages", || {
            self.messages.count_unread(user_id)
        })
        .await
    }
}
