//! Live delivery of room events to connected sessions.
//!
//! The registry only knows which session listens to which room. Message content always comes
//! from the durable log; a session that misses an event re-fetches the room.

use crate::config::AppConfig;
use crate::core::traits::Broadcaster;
use crate::infrastructure::entities;
use di::{Ref, inject, injectable};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

pub type SessionId = Uuid;

#[derive(Debug, Clone)]
pub enum RoomEvent {
    NewMessage(entities::Message),
    MessagesRead {
        room_id: Uuid,
        reader_id: Uuid,
        count: u64,
    },
}

#[derive(Default)]
struct Registry {
    sessions: HashMap<SessionId, Session>,
    rooms: HashMap<Uuid, HashSet<SessionId>>,
}

struct Session {
    sender: mpsc::Sender<RoomEvent>,
    rooms: HashSet<Uuid>,
}

impl Registry {
    fn remove_session(&mut self, session_id: SessionId) -> bool {
        let Some(session) = self.sessions.remove(&session_id) else {
            return false;
        };

        for room_id in session.rooms {
            if let Some(members) = self.rooms.get_mut(&room_id) {
                members.remove(&session_id);
                if members.is_empty() {
                    self.rooms.remove(&room_id);
                }
            }
        }
        true
    }
}

pub struct RoomBroadcaster {
    registry: Mutex<Registry>,
    buffer: usize,
}

#[injectable(Broadcaster)]
impl RoomBroadcaster {
    #[inject]
    pub fn create(config: Ref<AppConfig>) -> RoomBroadcaster {
        RoomBroadcaster::new(config.realtime_buffer)
    }
}

impl RoomBroadcaster {
    pub fn new(buffer: usize) -> RoomBroadcaster {
        RoomBroadcaster {
            registry: Mutex::new(Registry::default()),
            buffer: buffer.max(1),
        }
    }

    // The lock only guards map mutation; nothing inside it awaits.
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Broadcaster for RoomBroadcaster {
    fn connect(&self) -> (SessionId, mpsc::Receiver<RoomEvent>) {
        let (sender, receiver) = mpsc::channel(self.buffer);
        let session_id = Uuid::new_v4();

        self.registry().sessions.insert(
            session_id,
            Session {
                sender,
                rooms: HashSet::new(),
            },
        );
        debug!("live session {session_id} connected");

        (session_id, receiver)
    }

    fn join(&self, session_id: SessionId, room_id: Uuid) -> bool {
        let mut registry = self.registry();
        let Some(session) = registry.sessions.get_mut(&session_id) else {
            return false;
        };

        session.rooms.insert(room_id);
        registry.rooms.entry(room_id).or_default().insert(session_id);
        debug!("live session {session_id} joined room {room_id}");
        true
    }

    fn publish(&self, room_id: Uuid, event: RoomEvent) -> usize {
        let targets: Vec<(SessionId, mpsc::Sender<RoomEvent>)> = {
            let registry = self.registry();
            let Some(members) = registry.rooms.get(&room_id) else {
                return 0;
            };
            members
                .iter()
                .filter_map(|id| registry.sessions.get(id).map(|s| (*id, s.sender.clone())))
                .collect()
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (session_id, sender) in targets {
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!("live session {session_id} is lagging, dropped event for room {room_id}")
                }
                Err(TrySendError::Closed(_)) => closed.push(session_id),
            }
        }

        if !closed.is_empty() {
            let mut registry = self.registry();
            for session_id in closed {
                registry.remove_session(session_id);
            }
        }

        delivered
    }

    fn leave(&self, session_id: SessionId) {
        if self.registry().remove_session(session_id) {
            debug!("live session {session_id} left");
        }
    }

    fn connected(&self, room_id: Uuid) -> usize {
        self.registry().rooms.get(&room_id).map_or(0, HashSet::len)
    }
}
