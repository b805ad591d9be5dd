//! Server-sent events for a booking room.

use crate::api::ExtractUser;
use crate::core::realtime::{RoomEvent, SessionId};
use crate::core::traits::{Broadcaster, RoomRegistry};
use crate::error::ServiceError;
use async_stream::stream;
use axum::Router;
use axum::extract::Path;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use axum::routing::get;
use di::Ref;
use di_axum::Inject;
use futures_util::Stream;
use log::{debug, error};
use std::convert::Infallible;
use tokio::sync::mpsc;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new().route("/:id/events", get(room_events))
}

/// Leaves the broadcaster when the client goes away and the stream is dropped.
struct LiveSession {
    broadcaster: Ref<dyn Broadcaster>,
    id: SessionId,
    receiver: mpsc::Receiver<RoomEvent>,
}

impl LiveSession {
    fn open(broadcaster: Ref<dyn Broadcaster>, room_id: Uuid) -> Self {
        let (id, receiver) = broadcaster.connect();
        broadcaster.join(id, room_id);

        Self {
            broadcaster,
            id,
            receiver,
        }
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.broadcaster.leave(self.id);
    }
}

fn to_sse(event: RoomEvent) -> Result<Event, axum::Error> {
    match event {
        RoomEvent::NewMessage(message) => Event::default()
            .event("newMessage")
            .json_data(crate::api::messages::schemas::Message::from(message)),
        RoomEvent::MessagesRead {
            room_id,
            reader_id,
            count,
        } => Event::default()
            .event("messagesRead")
            .json_data(schemas::MessagesRead {
                room_id,
                reader_id,
                count,
            }),
    }
}

async fn room_events(
    Inject(room_registry): Inject<dyn RoomRegistry>,
    Inject(broadcaster): Inject<dyn Broadcaster>,
    ExtractUser(current_user): ExtractUser,
    Path(booking_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ServiceError> {
    let room = room_registry.authorize(booking_id, current_user).await?;
    let mut session = LiveSession::open(broadcaster, room.id());
    debug!("user {current_user} listening on room {}", room.id());

    let stream = stream! {
        while let Some(event) = session.receiver.recv().await {
            match to_sse(event) {
                Ok(event) => yield Ok(event),
                Err(err) => error!("could not encode room event: {err}"),
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

pub mod schemas {
    use serde::Serialize;
    use uuid::Uuid;

    #[derive(Serialize, Debug)]
    pub struct MessagesRead {
        pub room_id: Uuid,
        pub reader_id: Uuid,
        pub count: u64,
    }
}
