//! Room registry backed by the booking store.

use crate::core::traits::RoomRegistry;
use crate::error::ServiceResult;
use crate::infrastructure::entities::Room;
use crate::infrastructure::traits::BookingRepository;
use async_trait::async_trait;
use di::{Ref, injectable};
use uuid::Uuid;

#[injectable(RoomRegistry)]
pub struct BookingRooms {
    bookings: Ref<dyn BookingRepository>,
}

impl BookingRooms {
    pub fn new(bookings: Ref<dyn BookingRepository>) -> Self {
        Self { bookings }
    }
}

#[async_trait]
impl RoomRegistry for BookingRooms {
    async fn room_for(&self, booking_id: Uuid) -> ServiceResult<Room> {
        self.bookings.find_room(booking_id).await
    }

    async fn is_member(&self, booking_id: Uuid, user_id: Uuid) -> ServiceResult<bool> {
        Ok(self.room_for(booking_id).await?.is_member(user_id))
    }
}
