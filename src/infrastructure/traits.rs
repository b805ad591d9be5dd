//! Infrastructure traits, used for DI on higher levels

use crate::error::ServiceResult;
use crate::infrastructure::entities;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

/// Everything the store needs to open a booking together with its room.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub id: Uuid,
    pub service_id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub created_at: DateTime<Utc>,
    pub initial_message: Option<String>,
}

/// Read access to the catalog collaborator's projection.
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Returns `NotFound` if the service is not listed.
    async fn find_service(&self, service_id: Uuid) -> ServiceResult<entities::Service>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Inserts the booking, its room and the optional first message in one transaction.
    ///
    /// Returns `Conflict` if the customer already holds an active booking for the service or
    /// the slot is held by another active booking.
    async fn create_booking(
        &self,
        booking: NewBooking,
    ) -> ServiceResult<(entities::Booking, Option<entities::Message>)>;

    async fn find_booking(&self, booking_id: Uuid) -> ServiceResult<entities::Booking>;

    /// The room opened together with the booking; its id is the booking id.
    async fn find_room(&self, room_id: Uuid) -> ServiceResult<entities::Room>;

    /// Bookings where the user is customer or provider, newest first.
    async fn list_bookings_for_user(&self, user_id: Uuid) -> ServiceResult<Vec<entities::Booking>>;

    /// Moves the booking from `from` to `to` if it is still in `from`.
    ///
    /// Returns `None` when the status changed underneath. Closes the room when `to` is terminal.
    async fn update_status(
        &self,
        booking_id: Uuid,
        from: entities::BookingStatus,
        to: entities::BookingStatus,
    ) -> ServiceResult<Option<entities::Booking>>;

    /// Slots held by pending or confirmed bookings of a service within `[start, end)`.
    async fn held_slots(
        &self,
        service_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ServiceResult<Vec<(NaiveDate, NaiveTime)>>;

    async fn slot_held(
        &self,
        service_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> ServiceResult<bool>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Appends the message unless the room has been closed in the meantime.
    async fn insert_message(
        &self,
        message: entities::Message,
    ) -> ServiceResult<Option<entities::Message>>;

    /// Messages of a room, oldest first.
    async fn list_room_messages(&self, room_id: Uuid) -> ServiceResult<Vec<entities::Message>>;

    /// Flags unread messages addressed to `reader_id` as read and returns how many changed.
    async fn mark_room_read(&self, room_id: Uuid, reader_id: Uuid) -> ServiceResult<u64>;

    async fn count_unread(&self, user_id: Uuid) -> ServiceResult<i64>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert_notification(
        &self,
        notification: entities::Notification,
    ) -> ServiceResult<entities::Notification>;

    /// Notifications of a user, newest first.
    async fn list_notifications(&self, user_id: Uuid) -> ServiceResult<Vec<entities::Notification>>;

    /// Returns `false` if no notification with that id belongs to the user.
    async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> ServiceResult<bool>;

    async fn mark_all_read(&self, user_id: Uuid) -> ServiceResult<u64>;

    async fn count_unread(&self, user_id: Uuid) -> ServiceResult<i64>;
}
