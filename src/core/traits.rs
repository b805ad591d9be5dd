//! DI "Interfaces"

use crate::core::realtime::{RoomEvent, SessionId};
use crate::core::slots::UnavailableSlots;
use crate::error::ServiceResult;
use crate::infrastructure::entities;
use crate::infrastructure::entities::{BookingStatus, NotificationCategory};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use log::error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// The authenticated caller, as resolved by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl Actor {
    pub fn user(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }
}

/// A customer's booking request, exactly as received.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub service_id: Uuid,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`, on the slot grid
    pub time: String,
    pub initial_message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreatedBooking {
    pub booking: entities::Booking,
    pub initial_message: Option<entities::Message>,
}

#[async_trait]
pub trait BookingService: Send + Sync {
    /// Opens a pending booking with its room, the optional first message and a notification to
    /// the provider.
    ///
    /// Returns `Conflict` if the customer already has an active booking for the service or the
    /// slot is taken.
    async fn create_booking(
        &self,
        customer_id: Uuid,
        request: BookingRequest,
    ) -> ServiceResult<CreatedBooking>;

    /// Applies one step of the booking state machine and notifies the other side.
    async fn transition_status(
        &self,
        booking_id: Uuid,
        actor: Actor,
        new_status: BookingStatus,
    ) -> ServiceResult<entities::Booking>;

    /// Bookings where the user is customer or provider, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> ServiceResult<Vec<entities::Booking>>;

    /// Returns `Forbidden` unless the actor is a member of the booking or an admin.
    async fn get_booking(&self, booking_id: Uuid, actor: Actor) -> ServiceResult<entities::Booking>;

    async fn is_slot_free(
        &self,
        service_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> ServiceResult<bool>;

    /// Slots blocked by pending or confirmed bookings. Missing bounds fall back to today and the
    /// configured window.
    async fn unavailable_slots(
        &self,
        service_id: Uuid,
        start: Option<NaiveDate>,
        days: Option<u32>,
    ) -> ServiceResult<UnavailableSlots>;
}

#[async_trait]
pub trait RoomRegistry: Send + Sync {
    async fn room_for(&self, booking_id: Uuid) -> ServiceResult<entities::Room>;

    async fn is_member(&self, booking_id: Uuid, user_id: Uuid) -> ServiceResult<bool>;

    /// The room, if `user_id` is one of its members; `Forbidden` otherwise.
    async fn authorize(&self, booking_id: Uuid, user_id: Uuid) -> ServiceResult<entities::Room> {
        let room = self.room_for(booking_id).await?;
        if room.is_member(user_id) {
            Ok(room)
        } else {
            Err(crate::error::ServiceError::forbidden(
                "you are not a member of this booking",
            ))
        }
    }
}

#[async_trait]
pub trait MessagingService: Send + Sync {
    /// Appends a message from `sender_id` to the other member of the room.
    async fn append(
        &self,
        room_id: Uuid,
        sender_id: Uuid,
        text: String,
    ) -> ServiceResult<entities::Message>;

    /// Full history of the room, oldest first.
    async fn list_for_room(
        &self,
        room_id: Uuid,
        viewer_id: Uuid,
    ) -> ServiceResult<Vec<entities::Message>>;

    /// Marks every unread message addressed to `reader_id` as read. Returns how many changed.
    async fn mark_read(&self, room_id: Uuid, reader_id: Uuid) -> ServiceResult<u64>;

    async fn unread_count(&self, user_id: Uuid) -> ServiceResult<i64>;
}

#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn notify(
        &self,
        target_user_id: Uuid,
        title: String,
        body: String,
        category: NotificationCategory,
        related_entity_id: Uuid,
    ) -> ServiceResult<entities::Notification>;

    /// Notifications of a user, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> ServiceResult<Vec<entities::Notification>>;

    /// Idempotent. Returns `NotFound` unless the notification belongs to `user_id`.
    async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> ServiceResult<()>;

    async fn mark_all_read(&self, user_id: Uuid) -> ServiceResult<u64>;

    async fn unread_count(&self, user_id: Uuid) -> ServiceResult<i64>;

    /// Entry point for the rating collaborator. `stars` must be 1 to 5.
    async fn notify_rating(
        &self,
        provider_id: Uuid,
        service_id: Uuid,
        stars: u8,
        comment: Option<String>,
    ) -> ServiceResult<entities::Notification>;

    /// Fire-and-forget variant used after a primary write has committed.
    ///
    /// Failures are logged and dropped.
    async fn notify_best_effort(
        &self,
        target_user_id: Uuid,
        title: String,
        body: String,
        category: NotificationCategory,
        related_entity_id: Uuid,
    ) -> Option<entities::Notification> {
        match self
            .notify(target_user_id, title, body, category, related_entity_id)
            .await
        {
            Ok(notification) => Some(notification),
            Err(err) => {
                error!(
                    "dropping notification for {target_user_id} about {related_entity_id}: {err}"
                );
                None
            }
        }
    }
}

/// Ephemeral registry of live sessions per room.
pub trait Broadcaster: Send + Sync {
    /// Opens a live session; events for its rooms arrive on the receiver.
    fn connect(&self) -> (SessionId, mpsc::Receiver<RoomEvent>);

    /// Returns `false` if the session is unknown (already left).
    fn join(&self, session_id: SessionId, room_id: Uuid) -> bool;

    /// Best-effort delivery to the sessions currently in the room. Returns how many got it.
    fn publish(&self, room_id: Uuid, event: RoomEvent) -> usize;

    /// Drops the session from every room. Safe to call repeatedly.
    fn leave(&self, session_id: SessionId);

    fn connected(&self, room_id: Uuid) -> usize;
}
