//! Booking lifecycle: creation, the status state machine and slot availability.

use crate::config::AppConfig;
use crate::core::retry::retry_transient;
use crate::core::slots::{DateRange, UnavailableSlots};
use crate::core::traits::{
    Actor, BookingRequest, BookingService, CreatedBooking, NotificationService,
};
use crate::error::{ServiceError, ServiceResult};
use crate::infrastructure::entities::{Booking, BookingStatus, NotificationCategory};
use crate::infrastructure::traits::{BookingRepository, NewBooking, ServiceCatalog};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use di::{Ref, injectable};
use log::{debug, info};
use uuid::Uuid;

/// Longest window an unavailable-slots query may cover.
pub const MAX_SLOT_WINDOW_DAYS: u32 = 31;

/// The complete transition table. Anything not listed is rejected.
pub fn is_legal_transition(from: BookingStatus, to: BookingStatus) -> bool {
    use BookingStatus::*;

    matches!(
        (from, to),
        (Pending, Confirmed)
            | (Pending, Cancelled)
            | (Confirmed, Completed)
            | (Confirmed, Cancelled)
    )
}

/// Providers and admins drive the booking; a customer may only withdraw a pending request.
fn may_transition(booking: &Booking, actor: Actor, to: BookingStatus) -> bool {
    if actor.is_admin || actor.user_id == booking.provider_id {
        return true;
    }

    actor.user_id == booking.customer_id
        && booking.status == BookingStatus::Pending
        && to == BookingStatus::Cancelled
}

/// Membership, then legality, then permission, all against the booking as currently stored.
fn check_transition(booking: &Booking, actor: Actor, to: BookingStatus) -> ServiceResult<()> {
    if !actor.is_admin && booking.counterparty(actor.user_id).is_none() {
        return Err(ServiceError::forbidden("you are not a member of this booking"));
    }
    if !is_legal_transition(booking.status, to) {
        return Err(ServiceError::InvalidTransition {
            from: booking.status,
            to,
        });
    }
    if !may_transition(booking, actor, to) {
        return Err(ServiceError::forbidden(format!(
            "you may not mark this booking as {to}"
        )));
    }
    Ok(())
}

fn status_title(status: BookingStatus) -> &'static str {
    match status {
        BookingStatus::Pending => "Booking Pending",
        BookingStatus::Confirmed => "Booking Confirmed",
        BookingStatus::Completed => "Booking Completed",
        BookingStatus::Cancelled => "Booking Cancelled",
    }
}

pub fn parse_date(raw: &str) -> ServiceResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ServiceError::validation(format!("invalid date `{raw}`, expected YYYY-MM-DD")))
}

pub fn parse_time(raw: &str) -> ServiceResult<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| ServiceError::validation(format!("invalid time `{raw}`, expected HH:MM")))
}

#[injectable(BookingService)]
pub struct BookingStore {
    bookings: Ref<dyn BookingRepository>,
    catalog: Ref<dyn ServiceCatalog>,
    notifications: Ref<dyn NotificationService>,
    config: Ref<AppConfig>,
}

impl BookingStore {
    pub fn new(
        bookings: Ref<dyn BookingRepository>,
        catalog: Ref<dyn ServiceCatalog>,
        notifications: Ref<dyn NotificationService>,
        config: Ref<AppConfig>,
    ) -> Self {
        Self {
            bookings,
            catalog,
            notifications,
            config,
        }
    }

    async fn find_booking(&self, booking_id: Uuid) -> ServiceResult<Booking> {
        retry_transient(&self.config.retry, "find booking", || {
            self.bookings.find_booking(booking_id)
        })
        .await
    }

    async fn announce_transition(&self, booking: &Booking, actor: Actor) {
        let body = format!(
            "Your booking for {} at {} is now {}.",
            booking.scheduled_date,
            booking.scheduled_time.format("%H:%M"),
            booking.status
        );

        let recipients = match booking.counterparty(actor.user_id) {
            Some(counterparty) => vec![counterparty],
            None => vec![booking.customer_id, booking.provider_id],
        };

        for recipient in recipients {
            self.notifications
                .notify_best_effort(
                    recipient,
                    status_title(booking.status).to_owned(),
                    body.clone(),
                    NotificationCategory::Booking,
                    booking.id,
                )
                .await;
        }
    }
}

#[async_trait]
impl BookingService for BookingStore {
    async fn create_booking(
        &self,
        customer_id: Uuid,
        request: BookingRequest,
    ) -> ServiceResult<CreatedBooking> {
        let scheduled_date = parse_date(&request.date)?;
        let scheduled_time = parse_time(&request.time)?;
        if !self.config.slot_grid.contains(scheduled_time) {
            return Err(ServiceError::validation(format!(
                "{} is not a bookable slot",
                scheduled_time.format("%H:%M")
            )));
        }

        let initial_message = request
            .initial_message
            .filter(|text| !text.trim().is_empty());

        let service = retry_transient(&self.config.retry, "find service", || {
            self.catalog.find_service(request.service_id)
        })
        .await?;

        if service.provider_id == customer_id {
            return Err(ServiceError::validation("you cannot book your own service"));
        }

        let new_booking = NewBooking {
            id: Uuid::new_v4(),
            service_id: service.id,
            customer_id,
            provider_id: service.provider_id,
            scheduled_date,
            scheduled_time,
            created_at: Utc::now(),
            initial_message,
        };

        let (booking, initial_message) = retry_transient(&self.config.retry, "create booking", || {
            self.bookings.create_booking(new_booking.clone())
        })
        .await?;

        info!(
            "booking {} created for service {} at {} {}",
            booking.id, booking.service_id, booking.scheduled_date, booking.scheduled_time
        );

        self.notifications
            .notify_best_effort(
                booking.provider_id,
                "New Booking Request".to_owned(),
                format!(
                    "New request for {} on {} at {}.",
                    service.title,
                    booking.scheduled_date,
                    booking.scheduled_time.format("%H:%M")
                ),
                NotificationCategory::Booking,
                booking.id,
            )
            .await;

        Ok(CreatedBooking {
            booking,
            initial_message,
        })
    }

    async fn transition_status(
        &self,
        booking_id: Uuid,
        actor: Actor,
        new_status: BookingStatus,
    ) -> ServiceResult<Booking> {
        // Statuses only move forward, so a lost race re-checks at most twice.
        let (booking, updated) = loop {
            let booking = self.find_booking(booking_id).await?;
            check_transition(&booking, actor, new_status)?;

            let updated = retry_transient(&self.config.retry, "update booking status", || {
                self.bookings
                    .update_status(booking_id, booking.status, new_status)
            })
            .await?;

            match updated {
                Some(updated) => break (booking, updated),
                None => debug!(
                    "booking {booking_id} left {} before the update, checking again",
                    booking.status
                ),
            }
        };

        info!(
            "booking {} moved from {} to {} by {}",
            updated.id, booking.status, updated.status, actor.user_id
        );
        self.announce_transition(&updated, actor).await;

        Ok(updated)
    }

    async fn list_for_user(&self, user_id: Uuid) -> ServiceResult<Vec<Booking>> {
        retry_transient(&self.config.retry, "list bookings", || {
            self.bookings.list_bookings_for_user(user_id)
        })
        .await
    }

    async fn get_booking(&self, booking_id: Uuid, actor: Actor) -> ServiceResult<Booking> {
        let booking = self.find_booking(booking_id).await?;

        if actor.is_admin || booking.counterparty(actor.user_id).is_some() {
            Ok(booking)
        } else {
            Err(ServiceError::forbidden("you are not a member of this booking"))
        }
    }

    async fn is_slot_free(
        &self,
        service_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> ServiceResult<bool> {
        let held = retry_transient(&self.config.retry, "check slot", || {
            self.bookings.slot_held(service_id, date, time)
        })
        .await?;

        Ok(!held)
    }

    async fn unavailable_slots(
        &self,
        service_id: Uuid,
        start: Option<NaiveDate>,
        days: Option<u32>,
    ) -> ServiceResult<UnavailableSlots> {
        let days = days.unwrap_or(self.config.slot_window_days);
        if days == 0 || days > MAX_SLOT_WINDOW_DAYS {
            return Err(ServiceError::validation(format!(
                "days must be between 1 and {MAX_SLOT_WINDOW_DAYS}"
            )));
        }
        let start = start.unwrap_or_else(|| Utc::now().date_naive());
        let range = DateRange::new(start, days)
            .ok_or_else(|| ServiceError::validation("date range is out of bounds"))?;

        retry_transient(&self.config.retry, "find service", || {
            self.catalog.find_service(service_id)
        })
        .await?;

        let held = retry_transient(&self.config.retry, "list held slots", || {
            self.bookings.held_slots(service_id, range.start(), range.end())
        })
        .await?;

        Ok(UnavailableSlots::new(self.config.slot_grid.clone(), range, held))
    }
}
