//! Booking lifecycle and booking-room messaging service - Library exports for testing

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod infrastructure;

use crate::config::AppConfig;
use crate::core::bookings::BookingStore;
use crate::core::messaging::MessageLog;
use crate::core::notifications::NotificationFanout;
use crate::core::realtime::RoomBroadcaster;
use crate::core::rooms::BookingRooms;
use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::repositories::{
    DbBookingRepository, DbMessageRepository, DbNotificationRepository, DbServiceCatalog,
};
use di::{Injectable, ServiceCollection};

/// Every component of the service, wired the way `main` runs it.
pub fn service_collection() -> ServiceCollection {
    let mut services = ServiceCollection::new();
    services
        .add(AppConfig::singleton())
        .add(DatabaseConnection::singleton())
        .add(RoomBroadcaster::singleton())
        .add(DbServiceCatalog::scoped())
        .add(DbBookingRepository::scoped())
        .add(DbMessageRepository::scoped())
        .add(DbNotificationRepository::scoped())
        .add(NotificationFanout::scoped())
        .add(BookingRooms::scoped())
        .add(BookingStore::scoped())
        .add(MessageLog::scoped());
    services
}
