//! Inbound hook for the rating collaborator.

use crate::api::notifications::schemas::Notification;
use crate::api::ratings::schemas::RatingSubmitted;
use crate::core::traits::NotificationService;
use crate::error::ServiceError;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new().route("/ratings", post(rating_submitted))
}

async fn rating_submitted(
    Inject(notification_service): Inject<dyn NotificationService>,
    Json(rating): Json<RatingSubmitted>,
) -> Result<(StatusCode, Json<Notification>), ServiceError> {
    let notification = notification_service
        .notify_rating(
            rating.provider_id,
            rating.service_id,
            rating.stars,
            rating.comment,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(notification.into())))
}

pub mod schemas {
    use serde::Deserialize;
    use uuid::Uuid;

    #[derive(Deserialize, Debug)]
    pub struct RatingSubmitted {
        pub provider_id: Uuid,
        pub service_id: Uuid,
        pub stars: u8,
        pub comment: Option<String>,
    }
}
