use crate::core::traits::Actor;
use crate::error::ServiceError;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use log::error;
use serde::Serialize;
use std::str::FromStr;
use uuid::Uuid;

pub mod bookings;
pub mod messages;
pub mod notifications;
pub mod ratings;
pub mod realtime;
pub mod slots;

/// Every endpoint of the service, without the DI provider attached.
pub fn router() -> Router {
    Router::new()
        .nest("/bookings", bookings::router())
        .nest("/services", slots::router())
        .nest("/messages", messages::router())
        .nest("/notifications", notifications::router())
        .nest("/internal", ratings::router())
}

const X_USER_ID: &str = "X-User-ID";
const X_USER_ROLE: &str = "X-User-Role";
const ADMIN_ROLE: &str = "admin";

#[derive(Debug)]
pub struct ExtractUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for ExtractUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, (StatusCode, &'static str)> {
        if let Some(user_id) = parts.headers.get(X_USER_ID) {
            let user_id = user_id
                .to_str()
                .map_err(|_| (StatusCode::BAD_REQUEST, "invalid user id"))?;
            let user_id = Uuid::from_str(user_id)
                .map_err(|_| (StatusCode::BAD_REQUEST, "invalid user id"))?;
            Ok(ExtractUser(user_id))
        } else {
            Err((StatusCode::BAD_REQUEST, "`X-User-ID` header is missing"))
        }
    }
}

/// The calling user plus the role the identity provider vouched for.
#[derive(Debug)]
pub struct ExtractActor(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for ExtractActor
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, (StatusCode, &'static str)> {
        let ExtractUser(user_id) = ExtractUser::from_request_parts(parts, state).await?;

        let is_admin = match parts.headers.get(X_USER_ROLE) {
            Some(role) => role
                .to_str()
                .map_err(|_| (StatusCode::BAD_REQUEST, "invalid user role"))?
                .eq_ignore_ascii_case(ADMIN_ROLE),
            None => false,
        };

        Ok(ExtractActor(Actor { user_id, is_admin }))
    }
}

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let message = match &self {
            ServiceError::Storage(err) => {
                error!("request failed after retries: {err}");
                "something went wrong, please try again".to_owned()
            }
            other => other.to_string(),
        };

        (
            self.status_code(),
            Json(ErrorBody {
                error: self.kind(),
                message,
            }),
        )
            .into_response()
    }
}
