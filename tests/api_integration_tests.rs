//! API Integration Tests
//!
//! Tests the HTTP API endpoints with a real database, wired through the same service collection
//! `main` uses.
//!
//! Tests are serialized because they share the globally installed pool.

mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    response::IntoResponse,
};
use booking_coordinator::{
    api, error::ServiceError, infrastructure::database::DatabaseConnection, service_collection,
};
use common::{TestDb, seed_service};
use di_axum::RouterServiceProviderExtensions;
use futures_util::StreamExt;
use serde_json::{Value, json};
use serial_test::serial;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    router: axum::Router,
    db: TestDb,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        DatabaseConnection::uninstall();
    }
}

/// Installs a fresh database as the pool every DI-created `DatabaseConnection` uses.
async fn create_test_app() -> TestApp {
    let db = TestDb::new().await;
    DatabaseConnection::install(db.pool.clone());

    let provider = service_collection().build_provider().unwrap();
    let router = api::router().with_provider(provider);

    TestApp { router, db }
}

impl TestApp {
    async fn call(
        &self,
        method: Method,
        uri: &str,
        user: Option<Uuid>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            request = request.header("X-User-ID", user.to_string());
        }
        let request = match body {
            Some(body) => request
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };

        (status, json)
    }

    async fn get(&self, uri: &str, user: Uuid) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(user), None).await
    }

    async fn post(&self, uri: &str, user: Uuid, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(user), Some(body)).await
    }

    async fn book(&self, customer: Uuid, service_id: Uuid, time: &str) -> Value {
        let (status, json) = self
            .post(
                "/bookings",
                customer,
                json!({ "service_id": service_id, "date": "2024-06-01", "time": time }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["booking"].clone()
    }
}

#[tokio::test]
#[serial]
async fn test_list_bookings_empty() {
    let app = create_test_app().await;

    let (status, json) = app.get("/bookings", Uuid::new_v4()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["bookings"].as_array().unwrap().len(), 0);
}

#[tokio::test]
#[serial]
async fn test_list_bookings_requires_auth() {
    let app = create_test_app().await;

    let (status, _) = app.call(Method::GET, "/bookings", None, None).await;

    // Should fail without X-User-ID header
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
async fn test_create_booking_and_conflict() {
    let app = create_test_app().await;
    let provider = Uuid::new_v4();
    let service_id = seed_service(&app.db.pool, provider, "Yoga").await;
    let customer = Uuid::new_v4();

    let (status, json) = app
        .post(
            "/bookings",
            customer,
            json!({
                "service_id": service_id,
                "date": "2024-06-01",
                "time": "10:00",
                "message": "Looking forward to it"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["booking"]["status"], "pending");
    assert_eq!(json["booking"]["date"], "2024-06-01");
    assert_eq!(json["booking"]["time"], "10:00");
    assert_eq!(json["message"]["text"], "Looking forward to it");

    let (status, json) = app
        .post(
            "/bookings",
            Uuid::new_v4(),
            json!({ "service_id": service_id, "date": "2024-06-01", "time": "10:00" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "conflict");
    assert_eq!(json["message"], "slot no longer available");

    let (status, json) = app
        .get(
            &format!("/services/{service_id}/slots/2024-06-01/10:00"),
            Uuid::new_v4(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["free"], false);
}

#[tokio::test]
#[serial]
async fn test_create_booking_validation_errors() {
    let app = create_test_app().await;
    let service_id = seed_service(&app.db.pool, Uuid::new_v4(), "Yoga").await;

    let (status, json) = app
        .post(
            "/bookings",
            Uuid::new_v4(),
            json!({ "service_id": service_id, "date": "June 1st", "time": "10:00" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation");

    let (status, json) = app
        .post(
            "/bookings",
            Uuid::new_v4(),
            json!({ "service_id": Uuid::new_v4(), "date": "2024-06-01", "time": "10:00" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
#[serial]
async fn test_status_transitions_over_http() {
    let app = create_test_app().await;
    let provider = Uuid::new_v4();
    let service_id = seed_service(&app.db.pool, provider, "Yoga").await;
    let customer = Uuid::new_v4();
    let booking = app.book(customer, service_id, "11:00").await;
    let status_uri = format!("/bookings/{}/status", booking["id"].as_str().unwrap());

    let (status, json) = app
        .post(&status_uri, customer, json!({ "status": "confirmed" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{json}");

    let (status, json) = app
        .post(&status_uri, provider, json!({ "status": "confirmed" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "confirmed");

    let (status, _) = app
        .post(&status_uri, provider, json!({ "status": "completed" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = app
        .post(&status_uri, provider, json!({ "status": "confirmed" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "invalid_transition");

    let (status, _) = app
        .post(&status_uri, provider, json!({ "status": "archived" }))
        .await;
    assert!(status.is_client_error());
}

#[tokio::test]
#[serial]
async fn test_admin_role_header_allows_transition() {
    let app = create_test_app().await;
    let service_id = seed_service(&app.db.pool, Uuid::new_v4(), "Yoga").await;
    let booking = app.book(Uuid::new_v4(), service_id, "12:00").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/bookings/{}/status", booking["id"].as_str().unwrap()))
        .header("X-User-ID", Uuid::new_v4().to_string())
        .header("X-User-Role", "admin")
        .header("Content-Type", "application/json")
        .body(Body::from(json!({ "status": "cancelled" }).to_string()))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[serial]
async fn test_get_booking_hidden_from_strangers() {
    let app = create_test_app().await;
    let service_id = seed_service(&app.db.pool, Uuid::new_v4(), "Yoga").await;
    let customer = Uuid::new_v4();
    let booking = app.book(customer, service_id, "13:00").await;
    let uri = format!("/bookings/{}", booking["id"].as_str().unwrap());

    let (status, json) = app.get(&uri, customer).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], booking["id"]);

    let (status, _) = app.get(&uri, Uuid::new_v4()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .get(&format!("/bookings/{}", Uuid::new_v4()), customer)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[serial]
async fn test_messages_flow() {
    let app = create_test_app().await;
    let provider = Uuid::new_v4();
    let service_id = seed_service(&app.db.pool, provider, "Yoga").await;
    let customer = Uuid::new_v4();
    let booking = app.book(customer, service_id, "14:00").await;
    let messages_uri = format!("/bookings/{}/messages", booking["id"].as_str().unwrap());

    let (status, json) = app
        .post(&messages_uri, customer, json!({ "text": "Hello!" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["receiver_id"], provider.to_string());

    let (status, _) = app
        .post(&messages_uri, Uuid::new_v4(), json!({ "text": "Hi" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, json) = app.get("/messages/unread-count", provider).await;
    assert_eq!(json["unread"], 1);

    let (status, json) = app.get(&messages_uri, provider).await;
    assert_eq!(status, StatusCode::OK);
    let messages = json["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["text"], "Hello!");

    let (status, json) = app
        .call(
            Method::POST,
            &format!("{messages_uri}/read"),
            Some(provider),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["updated"], 1);

    let (_, json) = app.get("/messages/unread-count", provider).await;
    assert_eq!(json["unread"], 0);
}

#[tokio::test]
#[serial]
async fn test_notifications_flow() {
    let app = create_test_app().await;
    let provider = Uuid::new_v4();
    let service_id = seed_service(&app.db.pool, provider, "Yoga").await;
    app.book(Uuid::new_v4(), service_id, "15:00").await;

    let (status, json) = app.get("/notifications", provider).await;
    assert_eq!(status, StatusCode::OK);
    let notifications = json["notifications"].as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["category"], "booking");
    let notification_id = notifications[0]["id"].as_str().unwrap().to_owned();

    let (_, json) = app.get("/notifications/unread-count", provider).await;
    assert_eq!(json["unread"], 1);

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/notifications/{notification_id}/read"),
            Some(Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/notifications/{notification_id}/read"),
            Some(provider),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, json) = app
        .call(Method::POST, "/notifications/read-all", Some(provider), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["updated"], 0);
}

#[tokio::test]
#[serial]
async fn test_rating_hook() {
    let app = create_test_app().await;
    let provider = Uuid::new_v4();
    let service_id = seed_service(&app.db.pool, provider, "Yoga").await;

    let (status, json) = app
        .call(
            Method::POST,
            "/internal/ratings",
            None,
            Some(json!({ "provider_id": provider, "service_id": service_id, "stars": 4 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["category"], "rating");

    let (status, _) = app
        .call(
            Method::POST,
            "/internal/ratings",
            None,
            Some(json!({ "provider_id": provider, "service_id": service_id, "stars": 9 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
async fn test_unavailable_slots_endpoint() {
    let app = create_test_app().await;
    let service_id = seed_service(&app.db.pool, Uuid::new_v4(), "Yoga").await;
    app.book(Uuid::new_v4(), service_id, "16:00").await;
    app.book(Uuid::new_v4(), service_id, "09:00").await;

    let (status, json) = app
        .get(
            &format!("/services/{service_id}/unavailable-slots?start=2024-06-01&days=3"),
            Uuid::new_v4(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["end"], "2024-06-04");
    assert_eq!(
        json["slots"],
        json!([
            { "date": "2024-06-01", "time": "09:00" },
            { "date": "2024-06-01", "time": "16:00" }
        ])
    );

    let (status, _) = app
        .get(
            &format!("/services/{service_id}/unavailable-slots?start=2024-06-01&days=400"),
            Uuid::new_v4(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
async fn test_room_events_stream_new_messages() {
    let app = create_test_app().await;
    let provider = Uuid::new_v4();
    let service_id = seed_service(&app.db.pool, provider, "Yoga").await;
    let customer = Uuid::new_v4();
    let booking = app.book(customer, service_id, "17:00").await;
    let booking_id = booking["id"].as_str().unwrap();

    let (status, _) = app
        .get(&format!("/bookings/{booking_id}/events"), Uuid::new_v4())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let request = Request::builder()
        .uri(format!("/bookings/{booking_id}/events"))
        .header("X-User-ID", provider.to_string())
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let mut events = response.into_body().into_data_stream();

    let (status, _) = app
        .post(
            &format!("/bookings/{booking_id}/messages"),
            customer,
            json!({ "text": "On my way" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let frame = tokio::time::timeout(Duration::from_secs(5), events.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let frame = String::from_utf8(frame.to_vec()).unwrap();
    assert!(frame.contains("event: newMessage"), "{frame}");
    assert!(frame.contains("On my way"), "{frame}");
}

#[tokio::test]
async fn test_storage_failure_is_503_without_details() {
    let response = ServiceError::Storage(sqlx::Error::PoolClosed).into_response();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        json,
        json!({ "error": "storage", "message": "something went wrong, please try again" })
    );
}
