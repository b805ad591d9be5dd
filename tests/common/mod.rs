//! Shared setup for the integration tests.
//!
//! Every test gets its own SQLite file so concurrent writers go through the real locking path.

#![allow(dead_code)]

use async_trait::async_trait;
use booking_coordinator::config::AppConfig;
use booking_coordinator::core::bookings::BookingStore;
use booking_coordinator::core::messaging::MessageLog;
use booking_coordinator::core::notifications::NotificationFanout;
use booking_coordinator::core::realtime::RoomBroadcaster;
use booking_coordinator::core::retry::RetryPolicy;
use booking_coordinator::core::rooms::BookingRooms;
use booking_coordinator::core::traits::{
    BookingRequest, BookingService, Broadcaster, MessagingService, NotificationService,
    RoomRegistry,
};
use booking_coordinator::error::{ServiceError, ServiceResult};
use booking_coordinator::infrastructure::database::DatabaseConnection;
use booking_coordinator::infrastructure::entities::{Booking, Notification, NotificationCategory};
use booking_coordinator::infrastructure::repositories::{
    DbBookingRepository, DbMessageRepository, DbNotificationRepository, DbServiceCatalog,
};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

pub struct TestDb {
    pub pool: SqlitePool,
    path: PathBuf,
}

impl TestDb {
    pub async fn new() -> TestDb {
        let path = std::env::temp_dir().join(format!("booking-coordinator-{}.db", Uuid::new_v4()));
        let url = format!("sqlite://{}", path.display());
        let pool = DatabaseConnection::connect(&url, 5).await.unwrap();

        TestDb { pool, path }
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        retry: RetryPolicy::builder()
            .max_retries(3)
            .initial_delay(Duration::from_millis(5))
            .build(),
        realtime_buffer: 16,
        ..AppConfig::default()
    }
}

/// Inserts a row into the catalog projection and returns the service id.
pub async fn seed_service(pool: &SqlitePool, provider_id: Uuid, title: &str) -> Uuid {
    let service_id = Uuid::new_v4();
    sqlx::query("INSERT INTO services (id, provider_id, title) VALUES (?, ?, ?)")
        .bind(service_id)
        .bind(provider_id)
        .bind(title)
        .execute(pool)
        .await
        .unwrap();
    service_id
}

/// The service graph wired by hand, sharing one pool and one broadcaster.
pub struct Harness {
    pub db: TestDb,
    pub bookings: Arc<dyn BookingService>,
    pub rooms: Arc<dyn RoomRegistry>,
    pub messaging: Arc<dyn MessagingService>,
    pub notifications: Arc<dyn NotificationService>,
    pub broadcaster: Arc<RoomBroadcaster>,
    pub provider_id: Uuid,
    pub service_id: Uuid,
}

impl Harness {
    pub async fn new() -> Harness {
        Harness::build(None).await
    }

    /// Same graph, but every notification goes through `notifications`.
    pub async fn with_notifications(notifications: Arc<dyn NotificationService>) -> Harness {
        Harness::build(Some(notifications)).await
    }

    async fn build(notifications: Option<Arc<dyn NotificationService>>) -> Harness {
        let db = TestDb::new().await;
        let config = Arc::new(test_config());
        let connection = Arc::new(DatabaseConnection::from_pool(db.pool.clone()));

        let booking_repository = Arc::new(DbBookingRepository::new(connection.clone()));
        let notifications = notifications.unwrap_or_else(|| {
            Arc::new(NotificationFanout::new(
                Arc::new(DbNotificationRepository::new(connection.clone())),
                config.clone(),
            )) as Arc<dyn NotificationService>
        });
        let rooms: Arc<dyn RoomRegistry> = Arc::new(BookingRooms::new(booking_repository.clone()));
        let broadcaster = Arc::new(RoomBroadcaster::new(config.realtime_buffer));
        let bookings: Arc<dyn BookingService> = Arc::new(BookingStore::new(
            booking_repository,
            Arc::new(DbServiceCatalog::new(connection.clone())),
            notifications.clone(),
            config.clone(),
        ));
        let messaging: Arc<dyn MessagingService> = Arc::new(MessageLog::new(
            Arc::new(DbMessageRepository::new(connection)),
            rooms.clone(),
            notifications.clone(),
            broadcaster.clone() as Arc<dyn Broadcaster>,
            config,
        ));

        let provider_id = Uuid::new_v4();
        let service_id = seed_service(&db.pool, provider_id, "Haircut").await;

        Harness {
            db,
            bookings,
            rooms,
            messaging,
            notifications,
            broadcaster,
            provider_id,
            service_id,
        }
    }

    pub fn request(&self, date: &str, time: &str, message: Option<&str>) -> BookingRequest {
        BookingRequest {
            service_id: self.service_id,
            date: date.to_owned(),
            time: time.to_owned(),
            initial_message: message.map(str::to_owned),
        }
    }

    pub async fn book(&self, customer_id: Uuid, date: &str, time: &str) -> Booking {
        self.bookings
            .create_booking(customer_id, self.request(date, time, None))
            .await
            .unwrap()
            .booking
    }
}

/// Notification store that is always down.
#[derive(Default)]
pub struct UnavailableNotifications {
    attempts: AtomicUsize,
}

impl UnavailableNotifications {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn down<T>(&self) -> ServiceResult<T> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ServiceError::Storage(sqlx::Error::PoolClosed))
    }
}

#[async_trait]
impl NotificationService for UnavailableNotifications {
    async fn notify(
        &self,
        _target_user_id: Uuid,
        _title: String,
        _body: String,
        _category: NotificationCategory,
        _related_entity_id: Uuid,
    ) -> ServiceResult<Notification> {
        self.down()
    }

    async fn list_for_user(&self, _user_id: Uuid) -> ServiceResult<Vec<Notification>> {
        self.down()
    }

    async fn mark_read(&self, _notification_id: Uuid, _user_id: Uuid) -> ServiceResult<()> {
        self.down()
    }

    async fn mark_all_read(&self, _user_id: Uuid) -> ServiceResult<u64> {
        self.down()
    }

    async fn unread_count(&self, _user_id: Uuid) -> ServiceResult<i64> {
        self.down()
    }

    async fn notify_rating(
        &self,
        _provider_id: Uuid,
        _service_id: Uuid,
        _stars: u8,
        _comment: Option<String>,
    ) -> ServiceResult<Notification> {
        self.down()
    }
}
