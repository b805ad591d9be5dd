//! Booking endpoints

use crate::api::bookings::schemas::{BookingList, CreateBooking, CreatedBooking, TransitionStatus};
use crate::api::{ExtractActor, ExtractUser, messages, realtime};
use crate::core::traits::{BookingRequest, BookingService};
use crate::error::ServiceError;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_bookings).post(create_booking))
        .route("/:id", get(get_booking))
        .route("/:id/status", post(transition_status))
        .merge(messages::room_router())
        .merge(realtime::router())
}

async fn create_booking(
    Inject(booking_service): Inject<dyn BookingService>,
    ExtractUser(current_user): ExtractUser,
    Json(create_booking): Json<CreateBooking>,
) -> Result<(StatusCode, Json<CreatedBooking>), ServiceError> {
    let created = booking_service
        .create_booking(
            current_user,
            BookingRequest {
                service_id: create_booking.service_id,
                date: create_booking.date,
                time: create_booking.time,
                initial_message: create_booking.message,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn list_bookings(
    Inject(booking_service): Inject<dyn BookingService>,
    ExtractUser(current_user): ExtractUser,
) -> Result<Json<BookingList>, ServiceError> {
    let bookings = booking_service.list_for_user(current_user).await?;

    Ok(Json(BookingList {
        bookings: bookings.into_iter().map(schemas::Booking::from).collect(),
    }))
}

async fn get_booking(
    Inject(booking_service): Inject<dyn BookingService>,
    ExtractActor(actor): ExtractActor,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<schemas::Booking>, ServiceError> {
    let booking = booking_service.get_booking(booking_id, actor).await?;

    Ok(Json(booking.into()))
}

async fn transition_status(
    Inject(booking_service): Inject<dyn BookingService>,
    ExtractActor(actor): ExtractActor,
    Path(booking_id): Path<Uuid>,
    Json(transition): Json<TransitionStatus>,
) -> Result<Json<schemas::Booking>, ServiceError> {
    let booking = booking_service
        .transition_status(booking_id, actor, transition.status.into())
        .await?;

    Ok(Json(booking.into()))
}

pub mod schemas {
    use crate::api::messages::schemas::Message;
    use crate::core::traits;
    use crate::infrastructure::entities;
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Deserialize, Debug)]
    pub struct CreateBooking {
        pub service_id: Uuid,
        pub date: String,
        pub time: String,
        pub message: Option<String>,
    }

    #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum BookingStatus {
        Pending,
        Confirmed,
        Completed,
        Cancelled,
    }

    impl From<entities::BookingStatus> for BookingStatus {
        fn from(status: entities::BookingStatus) -> Self {
            match status {
                entities::BookingStatus::Pending => BookingStatus::Pending,
                entities::BookingStatus::Confirmed => BookingStatus::Confirmed,
                entities::BookingStatus::Completed => BookingStatus::Completed,
                entities::BookingStatus::Cancelled => BookingStatus::Cancelled,
            }
        }
    }

    impl From<BookingStatus> for entities::BookingStatus {
        fn from(status: BookingStatus) -> Self {
            match status {
                BookingStatus::Pending => entities::BookingStatus::Pending,
                BookingStatus::Confirmed => entities::BookingStatus::Confirmed,
                BookingStatus::Completed => entities::BookingStatus::Completed,
                BookingStatus::Cancelled => entities::BookingStatus::Cancelled,
            }
        }
    }

    #[derive(Deserialize, Debug)]
    pub struct TransitionStatus {
        pub status: BookingStatus,
    }

    #[derive(Serialize, Debug)]
    pub struct Booking {
        pub id: Uuid,
        pub service_id: Uuid,
        pub customer_id: Uuid,
        pub provider_id: Uuid,
        pub status: BookingStatus,
        pub date: NaiveDate,
        pub time: String,
        pub created_at: DateTime<Utc>,
    }

    impl From<entities::Booking> for Booking {
        fn from(booking: entities::Booking) -> Self {
            Booking {
                id: booking.id,
                service_id: booking.service_id,
                customer_id: booking.customer_id,
                provider_id: booking.provider_id,
                status: booking.status.into(),
                date: booking.scheduled_date,
                time: booking.scheduled_time.format("%H:%M").to_string(),
                created_at: booking.created_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct BookingList {
        pub bookings: Vec<Booking>,
    }

    #[derive(Serialize, Debug)]
    pub struct CreatedBooking {
        pub booking: Booking,
        pub message: Option<Message>,
    }

    impl From<traits::CreatedBooking> for CreatedBooking {
        fn from(created: traits::CreatedBooking) -> Self {
            CreatedBooking {
                booking: created.booking.into(),
                message: created.initial_message.map(Message::from),
            }
        }
    }
}
