//! Registry of live rooms, keyed by join code

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::game::room::ROOM_CAPACITY;
use crate::game::{RoomError, RoomHandle, RoomTask};
use crate::ws::protocol::{RoomSummary, ServerMsg};

use super::code::{generate_code, normalize_code};

/// Registry of all live rooms
#[derive(Clone)]
pub struct RoomRegistry {
    rooms: Arc<DashMap<String, RoomHandle>>,
    tick_duration: Duration,
}

impl RoomRegistry {
    pub fn new(tick_duration: Duration) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            tick_duration,
        }
    }

    /// Open a room under a fresh code and seat its creator.
    /// `RoomCreated` is queued on the creator's outbox ahead of anything the room sends.
    pub async fn create_room(
        &self,
        player_id: Uuid,
        name: String,
        outbox: mpsc::Sender<ServerMsg>,
    ) -> Result<RoomHandle, RoomError> {
        let handle = self.spawn_room();

        if outbox
            .try_send(ServerMsg::RoomCreated {
                code: handle.code.to_string(),
            })
            .is_err()
        {
            warn!(room = %handle.code, player_id = %player_id, "Could not queue room code");
        }

        handle.join(player_id, name, outbox).await?;
        Ok(handle)
    }

    /// Seat a player in an existing room
    pub async fn join_room(
        &self,
        code: &str,
        player_id: Uuid,
        name: String,
        outbox: mpsc::Sender<ServerMsg>,
    ) -> Result<RoomHandle, RoomError> {
        let code = normalize_code(code);
        let handle = self.get(&code).ok_or_else(|| RoomError::NotFound(code.clone()))?;
        handle.join(player_id, name, outbox).await?;
        Ok(handle)
    }

    /// Live room by code. Rooms whose task already exited are not returned.
    pub fn get(&self, code: &str) -> Option<RoomHandle> {
        self.rooms
            .get(code)
            .map(|r| r.value().clone())
            .filter(|h| !h.is_closed())
    }

    /// Rooms waiting for a second player, sorted by code
    pub fn list_open_rooms(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<RoomSummary> = self
            .rooms
            .iter()
            .map(|r| r.value().clone())
            .filter(|h| !h.is_closed())
            .filter(|h| h.phase().is_open() && h.occupants() < ROOM_CAPACITY)
            .map(|h| h.summary())
            .collect();
        rooms.sort_by(|a, b| a.code.cmp(&b.code));
        rooms
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_players(&self) -> usize {
        self.rooms.iter().map(|r| r.value().occupants()).sum()
    }

    fn spawn_room(&self) -> RoomHandle {
        let mut rng = rand::thread_rng();
        loop {
            let code = generate_code(&mut rng);
            let Entry::Vacant(slot) = self.rooms.entry(code) else {
                continue;
            };

            let (task, handle) = RoomTask::new(slot.key(), self.tick_duration);
            slot.insert(handle.clone());

            let rooms = self.rooms.clone();
            let watched = handle.clone();
            tokio::spawn(async move {
                task.run().await;
                rooms.remove_if(&*watched.code, |_, h| h.same_room(&watched));
                info!(room = %watched.code, "Room removed from registry");
            });

            return handle;
        }
    }
}
