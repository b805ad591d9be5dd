//! Slot availability endpoints, under `/services`.

use crate::api::slots::schemas::{SlotQuery, SlotStatus, UnavailableSlots};
use crate::core::bookings::{parse_date, parse_time};
use crate::core::traits::BookingService;
use crate::error::ServiceError;
use axum::extract::{Path, Query};
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/:id/unavailable-slots", get(unavailable_slots))
        .route("/:id/slots/:date/:time", get(slot_status))
}

async fn unavailable_slots(
    Inject(booking_service): Inject<dyn BookingService>,
    Path(service_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<UnavailableSlots>, ServiceError> {
    let view = booking_service
        .unavailable_slots(service_id, query.start, query.days)
        .await?;

    Ok(Json(UnavailableSlots {
        service_id,
        start: view.range().start(),
        end: view.range().end(),
        slots: view.iter().map(schemas::Slot::from).collect(),
    }))
}

async fn slot_status(
    Inject(booking_service): Inject<dyn BookingService>,
    Path((service_id, date, time)): Path<(Uuid, String, String)>,
) -> Result<Json<SlotStatus>, ServiceError> {
    let date = parse_date(&date)?;
    let time = parse_time(&time)?;
    let free = booking_service.is_slot_free(service_id, date, time).await?;

    Ok(Json(SlotStatus {
        service_id,
        date,
        time: time.format("%H:%M").to_string(),
        free,
    }))
}

pub mod schemas {
    use crate::core::slots;
    use chrono::NaiveDate;
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Deserialize, Debug, Default)]
    pub struct SlotQuery {
        pub start: Option<NaiveDate>,
        pub days: Option<u32>,
    }

    #[derive(Serialize, Debug, PartialEq, Eq)]
    pub struct Slot {
        pub date: NaiveDate,
        pub time: String,
    }

    impl From<slots::Slot> for Slot {
        fn from(slot: slots::Slot) -> Self {
            Slot {
                date: slot.date,
                time: slot.time.format("%H:%M").to_string(),
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct UnavailableSlots {
        pub service_id: Uuid,
        pub start: NaiveDate,
        /// Exclusive.
        pub end: NaiveDate,
        pub slots: Vec<Slot>,
    }

    #[derive(Serialize, Debug)]
    pub struct SlotStatus {
        pub service_id: Uuid,
        pub date: NaiveDate,
        pub time: String,
        pub free: bool,
    }
}
