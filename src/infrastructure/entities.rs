//! Database entities

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }
}

impl Display for BookingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub service_id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Uuid,
    pub status: BookingStatus,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// The other party of the booking, if `user_id` is one of its members.
    pub fn counterparty(&self, user_id: Uuid) -> Option<Uuid> {
        if user_id == self.customer_id {
            Some(self.provider_id)
        } else if user_id == self.provider_id {
            Some(self.customer_id)
        } else {
            None
        }
    }
}

/// A booking's chat room. Its id is the booking id.
#[derive(Debug, Clone, FromRow)]
pub struct Room {
    pub booking_id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Uuid,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Room {
    pub fn id(&self) -> Uuid {
        self.booking_id
    }

    pub fn is_member(&self, user_id: Uuid) -> bool {
        user_id == self.customer_id || user_id == self.provider_id
    }

    pub fn other_member(&self, user_id: Uuid) -> Option<Uuid> {
        if user_id == self.customer_id {
            Some(self.provider_id)
        } else if user_id == self.provider_id {
            Some(self.customer_id)
        } else {
            None
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub room_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum NotificationCategory {
    Booking,
    Message,
    Rating,
}

#[derive(Debug, Clone, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub target_user_id: Uuid,
    pub title: String,
    pub body: String,
    pub category: NotificationCategory,
    pub related_entity_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

/// Row of the catalog projection.
#[derive(Debug, Clone, FromRow)]
pub struct Service {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub title: String,
}
