//! Room actor: an isolated Tokio task that owns one board.
//!
//! Each room runs in its own task and is reached only through its channel.
//! Commands are applied one at a time in arrival order, and every command
//! that changes the board is followed, in the same turn, by a full
//! broadcast to every participant. Cursor movement is the one exception:
//! it only touches participant state and is rate limited by
//! [`CursorThrottle`].

use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::Arc;

use coopsweeper_board::{Board, BoardConfig, Coord, GameStatus};
use coopsweeper_protocol::{Cursor, ParticipantId, RoomId, RoomSnapshot, UserView};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};

use crate::throttle::CursorThrottle;
use crate::{GameResult, Participant, ResultParticipant, RoomConfig, RoomError, RoomState};

/// An outbound message from the room actor to a participant's connection.
///
/// Payloads are shared between all recipients of one broadcast.
#[derive(Debug, Clone)]
pub enum RoomOutbound {
    /// Board and participants, after any board change or membership change.
    Update(Arc<RoomSnapshot>),
    /// Participants only, after cursor movement.
    Users(Arc<BTreeMap<ParticipantId, UserView>>),
}

/// Channel for delivering outbound messages to one participant.
pub type ParticipantSender = mpsc::UnboundedSender<RoomOutbound>;

/// Commands sent to a room actor. Variants with a `reply` are
/// request/response; the rest are fire-and-forget.
pub(crate) enum RoomCommand {
    Join {
        identity: ParticipantId,
        username: String,
        sender: ParticipantSender,
        reply: oneshot::Sender<Result<Participant, RoomError>>,
    },
    Leave {
        identity: ParticipantId,
        reply: oneshot::Sender<Result<LeaveOutcome, RoomError>>,
    },
    MoveCursor {
        identity: ParticipantId,
        cursor: Cursor,
    },
    Click {
        identity: ParticipantId,
        coord: Coord,
        reply: oneshot::Sender<Result<u32, RoomError>>,
    },
    Flag {
        identity: ParticipantId,
        coord: Coord,
        reply: oneshot::Sender<Result<bool, RoomError>>,
    },
    Reset {
        identity: ParticipantId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },
    Shutdown,
}

/// Room metadata, without the board itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub state: RoomState,
    pub participant_count: usize,
    pub config: BoardConfig,
    pub status: GameStatus,
}

/// What is left of a room after a participant leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// Participants still in the room. At zero the actor has stopped.
    pub remaining: usize,
}

impl LeaveOutcome {
    pub fn is_empty(&self) -> bool {
        self.remaining == 0
    }
}

// ---------------------------------------------------------------------------
// RoomHandle
// ---------------------------------------------------------------------------

/// Handle to a running room actor.
///
/// Cheap to clone. The registry holds one per room, and every connection
/// caches one after joining so board traffic never touches the registry.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Registers a participant and broadcasts the new membership. The
    /// joiner's own channel receives the current snapshot as part of it.
    ///
    /// Joining again with a known identity replaces the previous entry.
    pub async fn join(
        &self,
        identity: ParticipantId,
        username: impl Into<String>,
        sender: ParticipantSender,
    ) -> Result<Participant, RoomError> {
        let username = username.into();
        self.request(|reply| RoomCommand::Join {
            identity,
            username,
            sender,
            reply,
        })
        .await?
    }

    /// Removes a participant. When the last one leaves the actor stops.
    pub async fn leave(&self, identity: ParticipantId) -> Result<LeaveOutcome, RoomError> {
        self.request(|reply| RoomCommand::Leave { identity, reply })
            .await?
    }

    /// Updates a cursor (fire-and-forget).
    pub async fn move_cursor(
        &self,
        identity: ParticipantId,
        x: f64,
        y: f64,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::MoveCursor {
            identity,
            cursor: Cursor::new(x, y),
        })
        .await
    }

    /// Clicks the shared board. Returns the number of cells revealed.
    pub async fn click(&self, identity: ParticipantId, coord: Coord) -> Result<u32, RoomError> {
        self.request(|reply| RoomCommand::Click {
            identity,
            coord,
            reply,
        })
        .await?
    }

    /// Toggles a flag. Returns whether the board changed.
    pub async fn flag(&self, identity: ParticipantId, coord: Coord) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::Flag {
            identity,
            coord,
            reply,
        })
        .await?
    }

    /// Replaces the board with a fresh one of the same configuration and
    /// zeroes every participant's counter.
    pub async fn reset(&self, identity: ParticipantId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Reset { identity, reply })
            .await?
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::GetInfo { reply }).await
    }

    /// Tells the room to stop. Participants are not notified.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(make(reply_tx)).await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }
}

// ---------------------------------------------------------------------------
// RoomActor
// ---------------------------------------------------------------------------

struct Member {
    participant: Participant,
    sender: ParticipantSender,
}

struct RoomActor {
    room_id: RoomId,
    state: RoomState,
    board: Board,
    participants: BTreeMap<ParticipantId, Member>,
    throttle: CursorThrottle,
    empty_deadline: Instant,
    results: Option<mpsc::UnboundedSender<GameResult>>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(
            room_id = %self.room_id,
            config = %self.board.config(),
            "room actor started"
        );

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if self.handle_command(cmd).is_break() {
                        break;
                    }
                }
                () = self.throttle.wait_for_flush() => {
                    self.throttle.on_flush();
                    self.broadcast_users();
                }
                () = time::sleep_until(self.empty_deadline), if self.state == RoomState::Empty => {
                    tracing::info!(room_id = %self.room_id, "nobody joined, closing room");
                    break;
                }
            }
        }

        self.state = RoomState::Destroying;
        tracing::info!(room_id = %self.room_id, "room actor stopped");
    }

    fn handle_command(&mut self, cmd: RoomCommand) -> ControlFlow<()> {
        match cmd {
            RoomCommand::Join {
                identity,
                username,
                sender,
                reply,
            } => {
                let _ = reply.send(self.handle_join(identity, username, sender));
            }
            RoomCommand::Leave { identity, reply } => {
                let _ = reply.send(self.handle_leave(identity));
                if self.state == RoomState::Destroying {
                    return ControlFlow::Break(());
                }
            }
            RoomCommand::MoveCursor { identity, cursor } => {
                self.handle_move_cursor(identity, cursor);
            }
            RoomCommand::Click {
                identity,
                coord,
                reply,
            } => {
                let _ = reply.send(self.handle_click(identity, coord));
            }
            RoomCommand::Flag {
                identity,
                coord,
                reply,
            } => {
                let _ = reply.send(self.handle_flag(identity, coord));
            }
            RoomCommand::Reset { identity, reply } => {
                let _ = reply.send(self.handle_reset(identity));
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Shutdown => {
                tracing::info!(room_id = %self.room_id, "room shutting down");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn handle_join(
        &mut self,
        identity: ParticipantId,
        username: String,
        sender: ParticipantSender,
    ) -> Result<Participant, RoomError> {
        if !self.state.is_joinable() {
            return Err(RoomError::InvalidState(format!(
                "cannot join room in state {}",
                self.state
            )));
        }

        let participant = Participant::new(identity.clone(), username);
        let member = Member {
            participant: participant.clone(),
            sender,
        };
        if self.participants.insert(identity.clone(), member).is_some() {
            tracing::debug!(room_id = %self.room_id, %identity, "replacing existing participant");
        }
        self.state = RoomState::Active;

        tracing::info!(
            room_id = %self.room_id,
            %identity,
            username = %participant.username,
            participants = self.participants.len(),
            "participant joined"
        );
        self.broadcast_full();
        Ok(participant)
    }

    fn handle_leave(&mut self, identity: ParticipantId) -> Result<LeaveOutcome, RoomError> {
        if self.participants.remove(&identity).is_none() {
            return Err(RoomError::NotInRoom(identity, self.room_id.clone()));
        }
        let remaining = self.participants.len();
        tracing::info!(
            room_id = %self.room_id,
            %identity,
            participants = remaining,
            "participant left"
        );

        if remaining == 0 {
            self.state = RoomState::Destroying;
        } else {
            self.broadcast_full();
        }
        Ok(LeaveOutcome { remaining })
    }

    fn handle_move_cursor(&mut self, identity: ParticipantId, cursor: Cursor) {
        let Some(member) = self.participants.get_mut(&identity) else {
            tracing::warn!(room_id = %self.room_id, %identity, "cursor from non-member, ignoring");
            return;
        };
        member.participant.cursor = cursor;

        if self.throttle.on_move() {
            self.broadcast_users();
        }
    }

    fn handle_click(&mut self, identity: ParticipantId, coord: Coord) -> Result<u32, RoomError> {
        self.ensure_member(&identity, "click")?;

        let before = self.board.status();
        let cleared = self.board.click(coord);
        if let Some(member) = self.participants.get_mut(&identity) {
            member.participant.squares_cleared += cleared;
        }
        tracing::debug!(room_id = %self.room_id, %identity, %coord, cleared, "click");

        if before == GameStatus::Playing {
            match self.board.status() {
                GameStatus::Won => {
                    tracing::info!(
                        room_id = %self.room_id,
                        elapsed_ms = self.board.elapsed().as_millis(),
                        participants = self.participants.len(),
                        "game won"
                    );
                    self.emit_result();
                }
                GameStatus::Lost => {
                    tracing::info!(room_id = %self.room_id, %identity, %coord, "game lost");
                }
                GameStatus::Playing => {}
            }
        }

        self.broadcast_full();
        Ok(cleared)
    }

    fn handle_flag(&mut self, identity: ParticipantId, coord: Coord) -> Result<bool, RoomError> {
        self.ensure_member(&identity, "flag")?;
        let changed = self.board.flag(coord);
        tracing::debug!(room_id = %self.room_id, %identity, %coord, changed, "flag");
        self.broadcast_full();
        Ok(changed)
    }

    fn handle_reset(&mut self, identity: ParticipantId) -> Result<(), RoomError> {
        self.ensure_member(&identity, "reset")?;
        self.board = Board::new(self.board.config())?;
        for member in self.participants.values_mut() {
            member.participant.squares_cleared = 0;
        }
        tracing::info!(room_id = %self.room_id, %identity, "board reset");
        self.broadcast_full();
        Ok(())
    }

    fn ensure_member(&self, identity: &ParticipantId, action: &str) -> Result<(), RoomError> {
        if self.participants.contains_key(identity) {
            return Ok(());
        }
        tracing::warn!(
            room_id = %self.room_id,
            %identity,
            action,
            "event from non-member, ignoring"
        );
        Err(RoomError::NotInRoom(identity.clone(), self.room_id.clone()))
    }

    fn emit_result(&self) {
        let Some(results) = &self.results else {
            return;
        };
        let config = self.board.config();
        let result = GameResult {
            room_id: self.room_id.clone(),
            difficulty: config.difficulty(),
            config,
            solve_time: self.board.elapsed(),
            participants: self
                .participants
                .values()
                .map(|m| ResultParticipant {
                    identity: m.participant.identity.clone(),
                    username: m.participant.username.clone(),
                    squares_cleared: m.participant.squares_cleared,
                })
                .collect(),
        };
        if results.send(result).is_err() {
            tracing::debug!(room_id = %self.room_id, "result receiver dropped");
        }
    }

    fn users(&self) -> BTreeMap<ParticipantId, UserView> {
        self.participants
            .iter()
            .map(|(id, m)| (id.clone(), m.participant.view()))
            .collect()
    }

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            board: self.board.snapshot(),
            users: self.users(),
        }
    }

    /// Sends the full snapshot to everyone. It carries the latest cursors,
    /// so a pending cursor flush is dropped.
    fn broadcast_full(&mut self) {
        self.throttle.cancel_pending();
        self.broadcast(RoomOutbound::Update(Arc::new(self.snapshot())));
    }

    fn broadcast_users(&self) {
        self.broadcast(RoomOutbound::Users(Arc::new(self.users())));
    }

    /// Receivers that are gone belong to connections that are shutting
    /// down; their leave is already on its way.
    fn broadcast(&self, msg: RoomOutbound) {
        for member in self.participants.values() {
            let _ = member.sender.send(msg.clone());
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id.clone(),
            state: self.state,
            participant_count: self.participants.len(),
            config: self.board.config(),
            status: self.board.status(),
        }
    }
}

/// Builds the board and spawns the actor task.
///
/// # Errors
/// [`RoomError::InvalidConfig`] if the board cannot be built.
pub(crate) fn spawn_room(
    room_id: RoomId,
    board_config: BoardConfig,
    config: &RoomConfig,
    results: Option<mpsc::UnboundedSender<GameResult>>,
) -> Result<RoomHandle, RoomError> {
    let board = Board::new(board_config)?;
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));

    let actor = RoomActor {
        room_id: room_id.clone(),
        state: RoomState::Empty,
        board,
        participants: BTreeMap::new(),
        throttle: CursorThrottle::new(config.cursor_throttle),
        empty_deadline: Instant::now() + config.empty_timeout,
        results,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    Ok(RoomHandle { room_id, sender: tx })
}
