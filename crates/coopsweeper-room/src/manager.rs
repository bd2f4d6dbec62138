//! Room registry: creates, tracks and destroys rooms.

use std::collections::HashMap;

use coopsweeper_board::BoardConfig;
use coopsweeper_protocol::{ParticipantId, RoomId};
use rand::Rng;
use tokio::sync::mpsc;

use crate::room::spawn_room;
use crate::{
    GameResult, LeaveOutcome, Participant, ParticipantSender, RoomConfig, RoomError, RoomHandle,
    RoomInfo,
};

/// Range of the four-digit codes handed out by
/// [`create_room_with_code`](RoomRegistry::create_room_with_code).
const ROOM_CODE_RANGE: std::ops::RangeInclusive<u32> = 1000..=9999;

/// The set of live rooms, keyed by id.
///
/// The registry is a plain owned value; the server keeps it behind a
/// `tokio::sync::Mutex` so creation, lookup and teardown are atomic across
/// connections. Board traffic does not go through it: callers keep the
/// [`RoomHandle`] returned by [`join_room`](Self::join_room).
pub struct RoomRegistry {
    rooms: HashMap<RoomId, RoomHandle>,
    config: RoomConfig,
    results: Option<mpsc::UnboundedSender<GameResult>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::with_config(RoomConfig::default())
    }

    pub fn with_config(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
            results: None,
        }
    }

    /// Rooms created from now on report won boards on `results`.
    pub fn with_results(mut self, results: mpsc::UnboundedSender<GameResult>) -> Self {
        self.results = Some(results);
        self
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Creates a room under `room_id` and starts its actor.
    ///
    /// # Errors
    /// - [`RoomError::InvalidRoomId`] if the id is malformed
    /// - [`RoomError::InvalidConfig`] if the board cannot be built
    /// - [`RoomError::RoomAlreadyExists`] if a live room has this id
    pub fn create_room(
        &mut self,
        room_id: RoomId,
        board: BoardConfig,
    ) -> Result<RoomHandle, RoomError> {
        if !room_id.is_valid() {
            return Err(RoomError::InvalidRoomId(room_id.as_str().to_owned()));
        }
        board.validate()?;

        self.prune_stopped();
        if self.rooms.contains_key(&room_id) {
            return Err(RoomError::RoomAlreadyExists(room_id));
        }

        let handle = spawn_room(room_id.clone(), board, &self.config, self.results.clone())?;
        self.rooms.insert(room_id.clone(), handle.clone());
        tracing::info!(%room_id, %board, rooms = self.rooms.len(), "room created");
        Ok(handle)
    }

    /// Creates a room under a random unused four-digit code.
    ///
    /// # Errors
    /// [`RoomError::InvalidConfig`] for an unplayable board, or
    /// [`RoomError::InvalidState`] when every code is taken.
    pub fn create_room_with_code(
        &mut self,
        board: BoardConfig,
    ) -> Result<(RoomId, RoomHandle), RoomError> {
        board.validate()?;
        let room_id = self.generate_room_code()?;
        let handle = self.create_room(room_id.clone(), board)?;
        Ok((room_id, handle))
    }

    /// Forgets rooms whose actor has stopped on its own.
    fn prune_stopped(&mut self) {
        let before = self.rooms.len();
        self.rooms.retain(|_, handle| !handle.is_closed());
        let pruned = before - self.rooms.len();
        if pruned > 0 {
            tracing::debug!(pruned, rooms = self.rooms.len(), "pruned stopped rooms");
        }
    }

    fn generate_room_code(&self) -> Result<RoomId, RoomError> {
        let capacity = (ROOM_CODE_RANGE.end() - ROOM_CODE_RANGE.start() + 1) as usize;
        let mut rng = rand::rng();
        // Random probing is cheap while the code space is mostly free;
        // fall back to a scan so a crowded registry still terminates.
        for _ in 0..32 {
            let candidate = RoomId::new(rng.random_range(ROOM_CODE_RANGE).to_string());
            if !self.room_exists(&candidate) {
                return Ok(candidate);
            }
        }
        if self.room_count() < capacity {
            for code in ROOM_CODE_RANGE {
                let candidate = RoomId::new(code.to_string());
                if !self.room_exists(&candidate) {
                    return Ok(candidate);
                }
            }
        }
        Err(RoomError::InvalidState("no free room codes".into()))
    }

    /// Whether a live room has this id.
    pub fn room_exists(&self, room_id: &RoomId) -> bool {
        self.rooms.get(room_id).is_some_and(|h| !h.is_closed())
    }

    /// Returns a handle to a live room.
    pub fn get(&self, room_id: &RoomId) -> Result<RoomHandle, RoomError> {
        self.rooms
            .get(room_id)
            .filter(|h| !h.is_closed())
            .cloned()
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))
    }

    /// Adds a participant to a room.
    ///
    /// Returns the room's handle for the caller to keep, along with the
    /// participant as registered.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if the room does not exist or has stopped.
    pub async fn join_room(
        &mut self,
        room_id: &RoomId,
        identity: ParticipantId,
        username: impl Into<String>,
        sender: ParticipantSender,
    ) -> Result<(RoomHandle, Participant), RoomError> {
        let handle = self.get(room_id)?;
        match handle.join(identity, username, sender).await {
            Ok(participant) => Ok((handle, participant)),
            Err(RoomError::Unavailable(_)) => {
                self.rooms.remove(room_id);
                Err(RoomError::NotFound(room_id.clone()))
            }
            Err(e) => Err(e),
        }
    }

    /// Removes a participant. If the room is left empty it is destroyed.
    pub async fn leave_room(
        &mut self,
        room_id: &RoomId,
        identity: ParticipantId,
    ) -> Result<LeaveOutcome, RoomError> {
        let handle = self.get(room_id)?;
        let outcome = handle.leave(identity).await?;
        if outcome.is_empty() {
            self.rooms.remove(room_id);
            tracing::info!(%room_id, rooms = self.rooms.len(), "room destroyed (empty)");
        }
        Ok(outcome)
    }

    /// Removes a room and stops its actor.
    pub async fn destroy_room(&mut self, room_id: &RoomId) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        // An actor that already stopped has nothing left to shut down.
        let _ = handle.shutdown().await;

        tracing::info!(%room_id, rooms = self.rooms.len(), "room destroyed");
        Ok(())
    }

    /// Info for every live room, sorted by id. Rooms that fail to answer
    /// (e.g. stopping) are skipped.
    pub async fn list_rooms(&self) -> Vec<RoomInfo> {
        let mut infos = Vec::with_capacity(self.rooms.len());
        for handle in self.rooms.values() {
            if let Ok(info) = handle.get_info().await {
                if info.state.is_joinable() {
                    infos.push(info);
                }
            }
        }
        infos.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        infos
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.values().filter(|h| !h.is_closed()).count()
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self
            .rooms
            .iter()
            .filter(|(_, h)| !h.is_closed())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Cloned handles to every room, for async work without holding the
    /// registry lock.
    pub fn room_handles(&self) -> Vec<RoomHandle> {
        self.rooms.values().cloned().collect()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
