//! DB Repository abstractions

use crate::error::{ServiceError, ServiceResult};
use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{
    Booking, BookingStatus, Message, Notification, Room, Service,
};
use crate::infrastructure::traits::{
    BookingRepository, MessageRepository, NewBooking, NotificationRepository, ServiceCatalog,
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use di::{Ref, injectable};
use log::{debug, warn};
use uuid::Uuid;

/// Maps unique-index violations on `bookings` to the invariant they protect.
fn booking_conflict(err: sqlx::Error) -> ServiceError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let message = db_err.message();
            debug!("booking insert rejected: {message}");
            return if message.contains("scheduled_time") {
                ServiceError::conflict("slot no longer available")
            } else {
                ServiceError::conflict("you already have an active booking for this service")
            };
        }
    }
    err.into()
}

#[injectable(ServiceCatalog)]
pub struct DbServiceCatalog {
    connection: Ref<DatabaseConnection>,
}

impl DbServiceCatalog {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl ServiceCatalog for DbServiceCatalog {
    async fn find_service(&self, service_id: Uuid) -> ServiceResult<Service> {
        sqlx::query_as("SELECT id, provider_id, title FROM services WHERE id = ?")
            .bind(service_id)
            .fetch_optional(&**self.connection)
            .await?
            .ok_or(ServiceError::NotFound("service"))
    }
}

#[injectable(BookingRepository)]
pub struct DbBookingRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbBookingRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl BookingRepository for DbBookingRepository {
    async fn create_booking(
        &self,
        booking: NewBooking,
    ) -> ServiceResult<(Booking, Option<Message>)> {
        let mut tx = self.connection.begin().await?;

        // The insert goes first so the transaction takes the write lock before anything else;
        // the partial unique indexes decide conflicts between concurrent requests.
        let created: Booking = sqlx::query_as(
            "INSERT INTO bookings (id, service_id, customer_id, provider_id, status, scheduled_date, scheduled_time, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(booking.id)
        .bind(booking.service_id)
        .bind(booking.customer_id)
        .bind(booking.provider_id)
        .bind(BookingStatus::Pending)
        .bind(booking.scheduled_date)
        .bind(booking.scheduled_time)
        .bind(booking.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(booking_conflict)?;

        sqlx::query("INSERT INTO rooms (booking_id, customer_id, provider_id) VALUES (?, ?, ?)")
            .bind(created.id)
            .bind(created.customer_id)
            .bind(created.provider_id)
            .execute(&mut *tx)
            .await?;

        let message = match booking.initial_message {
            Some(text) => Some(
                sqlx::query_as::<_, Message>(
                    "INSERT INTO messages (id, room_id, sender_id, receiver_id, text, created_at, read) VALUES (?, ?, ?, ?, ?, ?, 0) RETURNING *",
                )
                .bind(Uuid::new_v4())
                .bind(created.id)
                .bind(created.customer_id)
                .bind(created.provider_id)
                .bind(text)
                .bind(created.created_at)
                .fetch_one(&mut *tx)
                .await?,
            ),
            None => None,
        };

        tx.commit().await?;

        Ok((created, message))
    }

    async fn find_booking(&self, booking_id: Uuid) -> ServiceResult<Booking> {
        sqlx::query_as("SELECT * FROM bookings WHERE id = ?")
            .bind(booking_id)
            .fetch_optional(&**self.connection)
            .await?
            .ok_or(ServiceError::NotFound("booking"))
    }

    async fn find_room(&self, room_id: Uuid) -> ServiceResult<Room> {
        sqlx::query_as("SELECT * FROM rooms WHERE booking_id = ?")
            .bind(room_id)
            .fetch_optional(&**self.connection)
            .await?
            .ok_or(ServiceError::NotFound("room"))
    }

    async fn list_bookings_for_user(&self, user_id: Uuid) -> ServiceResult<Vec<Booking>> {
        Ok(sqlx::query_as(
            "SELECT * FROM bookings WHERE customer_id = ? OR provider_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&**self.connection)
        .await?)
    }

    async fn update_status(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> ServiceResult<Option<Booking>> {
        let mut tx = self.connection.begin().await?;

        let updated: Option<Booking> =
            sqlx::query_as("UPDATE bookings SET status = ? WHERE id = ? AND status = ? RETURNING *")
                .bind(to)
                .bind(booking_id)
                .bind(from)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(updated) = updated else {
            warn!("booking {booking_id} is no longer {from}, dropping transition to {to}");
            return Ok(None);
        };

        if to.is_terminal() {
            sqlx::query("UPDATE rooms SET closed_at = ? WHERE booking_id = ? AND closed_at IS NULL")
                .bind(Utc::now())
                .bind(booking_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(Some(updated))
    }

    async fn held_slots(
        &self,
        service_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ServiceResult<Vec<(NaiveDate, NaiveTime)>> {
        Ok(sqlx::query_as(
            "SELECT scheduled_date, scheduled_time FROM bookings WHERE service_id = ? AND status IN ('pending', 'confirmed') AND scheduled_date >= ? AND scheduled_date < ? ORDER BY scheduled_date, scheduled_time",
        )
        .bind(service_id)
        .bind(start)
        .bind(end)
        .fetch_all(&**self.connection)
        .await?)
    }

    async fn slot_held(
        &self,
        service_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> ServiceResult<bool> {
        let (held,): (i64,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM bookings WHERE service_id = ? AND scheduled_date = ? AND scheduled_time = ? AND status IN ('pending', 'confirmed'))",
        )
        .bind(service_id)
        .bind(date)
        .bind(time)
        .fetch_one(&**self.connection)
        .await?;

        Ok(held != 0)
    }
}

#[injectable(MessageRepository)]
pub struct DbMessageRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbMessageRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl MessageRepository for DbMessageRepository {
    async fn insert_message(&self, message: Message) -> ServiceResult<Option<Message>> {
        Ok(sqlx::query_as(
            "INSERT INTO messages (id, room_id, sender_id, receiver_id, text, created_at, read) SELECT ?, ?, ?, ?, ?, ?, 0 FROM rooms WHERE booking_id = ? AND closed_at IS NULL RETURNING *",
        )
        .bind(message.id)
        .bind(message.room_id)
        .bind(message.sender_id)
        .bind(message.receiver_id)
        .bind(message.text)
        .bind(message.created_at)
        .bind(message.room_id)
        .fetch_optional(&**self.connection)
        .await?)
    }

    async fn list_room_messages(&self, room_id: Uuid) -> ServiceResult<Vec<Message>> {
        Ok(sqlx::query_as(
            "SELECT * FROM messages WHERE room_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(room_id)
        .fetch_all(&**self.connection)
        .await?)
    }

    async fn mark_room_read(&self, room_id: Uuid, reader_id: Uuid) -> ServiceResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET read = 1 WHERE room_id = ? AND receiver_id = ? AND read = 0",
        )
        .bind(room_id)
        .bind(reader_id)
        .execute(&**self.connection)
        .await?;

        Ok(result.rows_affected())
    }

    async fn count_unread(&self, user_id: Uuid) -> ServiceResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM messages WHERE receiver_id = ? AND read = 0")
                .bind(user_id)
                .fetch_one(&**self.connection)
                .await?;

        Ok(count)
    }
}

#[injectable(NotificationRepository)]
pub struct DbNotificationRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbNotificationRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl NotificationRepository for DbNotificationRepository {
    async fn insert_notification(&self, notification: Notification) -> ServiceResult<Notification> {
        Ok(sqlx::query_as(
            "INSERT INTO notifications (id, target_user_id, title, body, category, related_entity_id, created_at, read) VALUES (?, ?, ?, ?, ?, ?, ?, 0) RETURNING *",
        )
        .bind(notification.id)
        .bind(notification.target_user_id)
        .bind(notification.title)
        .bind(notification.body)
        .bind(notification.category)
        .bind(notification.related_entity_id)
        .bind(notification.created_at)
        .fetch_one(&**self.connection)
        .await?)
    }

    async fn list_notifications(&self, user_id: Uuid) -> ServiceResult<Vec<Notification>> {
        Ok(sqlx::query_as(
            "SELECT * FROM notifications WHERE target_user_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user_id)
        .fetch_all(&**self.connection)
        .await?)
    }

    async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> ServiceResult<bool> {
        // SQLite counts matched rows, so an already-read notification still reports one row.
        let result =
            sqlx::query("UPDATE notifications SET read = 1 WHERE id = ? AND target_user_id = ?")
                .bind(notification_id)
                .bind(user_id)
                .execute(&**self.connection)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, user_id: Uuid) -> ServiceResult<u64> {
        let result =
            sqlx::query("UPDATE notifications SET read = 1 WHERE target_user_id = ? AND read = 0")
                .bind(user_id)
                .execute(&**self.connection)
                .await?;

        Ok(result.rows_affected())
    }

    async fn count_unread(&self, user_id: Uuid) -> ServiceResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE target_user_id = ? AND read = 0",
        )
        .bind(user_id)
        .fetch_one(&**self.connection)
        .await?;

        Ok(count)
    }
}
