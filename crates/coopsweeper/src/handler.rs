//! Per-connection handler: handshake, room admission, and message routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive Handshake → validate version, issue an identity
//!   2. Send HandshakeAck → the participant is connected
//!   3. Loop: whichever comes first of a client envelope, an update from
//!      the joined room, or the idle timeout

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Instant;

use coopsweeper_board::Coord;
use coopsweeper_protocol::{
    Codec, Envelope, GameMessage, ParticipantId, Payload, ProtocolError, RoomListEntry,
    RoomSnapshot, SystemMessage,
};
use coopsweeper_room::{RoomError, RoomHandle, RoomOutbound};
use coopsweeper_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::time;

use crate::identity::{generate_identity, normalize_username};
use crate::server::{PROTOCOL_VERSION, ServerState};
use crate::CoopsweeperError;

/// Drop guard that takes the participant out of its room when the handler
/// exits, however it exits.
///
/// Since `Drop` is synchronous, the leave runs on a spawned task.
struct Membership<C: Codec> {
    identity: ParticipantId,
    room: Option<RoomHandle>,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for Membership<C> {
    fn drop(&mut self) {
        let Some(room) = self.room.take() else {
            return;
        };
        let identity = self.identity.clone();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let room_id = room.room_id().clone();
            let mut rooms = state.rooms.lock().await;
            if let Err(e) = rooms.leave_room(&room_id, identity.clone()).await {
                tracing::debug!(%room_id, %identity, error = %e, "leave on disconnect failed");
            }
        });
    }
}

/// State of one connection after the handshake.
struct Client<C: Codec> {
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
    membership: Membership<C>,
    username: String,
    /// Handed to the room on join; the room pushes updates through it.
    outbound_tx: mpsc::UnboundedSender<RoomOutbound>,
    outbound_rx: mpsc::UnboundedReceiver<RoomOutbound>,
    seq: u64,
    start: Instant,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), CoopsweeperError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");
    let start = Instant::now();

    // --- Step 1: Handshake ---
    let (identity, username) = perform_handshake(&conn, &state, &start).await?;
    tracing::info!(%conn_id, %identity, %username, "participant connected");

    // --- Step 2: Message loop ---
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let mut client = Client {
        membership: Membership {
            identity,
            room: None,
            state: Arc::clone(&state),
        },
        conn,
        state,
        username,
        outbound_tx,
        outbound_rx,
        seq: 1,
        start,
    };

    let idle = client.state.config.idle_timeout;
    let idle_deadline = time::sleep(idle);
    tokio::pin!(idle_deadline);

    loop {
        tokio::select! {
            incoming = client.conn.recv() => {
                let data = match incoming {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(
                            identity = %client.membership.identity,
                            "connection closed cleanly"
                        );
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(
                            identity = %client.membership.identity,
                            error = %e,
                            "recv error"
                        );
                        break;
                    }
                };
                idle_deadline.as_mut().reset(time::Instant::now() + idle);
                if client.handle_frame(&data).await?.is_break() {
                    break;
                }
            }
            Some(outbound) = client.outbound_rx.recv() => {
                client.forward(outbound).await?;
            }
            () = &mut idle_deadline => {
                tracing::info!(identity = %client.membership.identity, "connection timed out");
                break;
            }
        }
    }

    let _ = client.conn.close().await;
    // client.membership drops here → leave fires.
    Ok(())
}

/// Performs the initial handshake: receive Handshake, validate, send Ack.
async fn perform_handshake<C: Codec>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<C>>,
    start: &Instant,
) -> Result<(ParticipantId, String), CoopsweeperError> {
    let data = match time::timeout(state.config.handshake_timeout, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before handshake".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(CoopsweeperError::Transport(e)),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let envelope: Envelope = match state.codec.decode(&data) {
        Ok(env) => env,
        Err(e) => {
            send_error(conn, &state.codec, 400, "malformed handshake", 0, start).await?;
            return Err(e.into());
        }
    };

    let (version, username) = match envelope.payload {
        Payload::System(SystemMessage::Handshake { version, username }) => (version, username),
        _ => {
            send_error(conn, &state.codec, 400, "expected Handshake", 0, start).await?;
            let err = ProtocolError::InvalidMessage("first message must be Handshake".into());
            return Err(err.into());
        }
    };

    if version != PROTOCOL_VERSION {
        send_error(
            conn,
            &state.codec,
            400,
            &format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
            0,
            start,
        )
        .await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    let identity = generate_identity();
    let username = normalize_username(username.as_deref());

    let ack = Envelope {
        seq: 0,
        timestamp: millis_since(start),
        payload: Payload::System(SystemMessage::HandshakeAck {
            identity: identity.clone(),
            server_time: millis_since(start),
        }),
    };
    let ack_bytes = state.codec.encode(&ack)?;
    conn.send(&ack_bytes).await?;

    Ok((identity, username))
}

impl<C: Codec> Client<C> {
    fn identity(&self) -> &ParticipantId {
        &self.membership.identity
    }

    /// Decodes and dispatches one client frame. Breaks when the
    /// connection should close.
    async fn handle_frame(&mut self, data: &[u8]) -> Result<ControlFlow<()>, CoopsweeperError> {
        let envelope: Envelope = match self.state.codec.decode(data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(
                    identity = %self.identity(),
                    error = %e,
                    "failed to decode envelope"
                );
                return Ok(ControlFlow::Continue(()));
            }
        };

        match envelope.payload {
            Payload::System(msg) => self.handle_system_message(msg).await,
            Payload::Game(msg) => {
                self.handle_game_message(msg).await?;
                Ok(ControlFlow::Continue(()))
            }
        }
    }

    async fn handle_system_message(
        &mut self,
        msg: SystemMessage,
    ) -> Result<ControlFlow<()>, CoopsweeperError> {
        match msg {
            SystemMessage::Heartbeat { client_time } => {
                let server_time = millis_since(&self.start);
                self.send(Payload::System(SystemMessage::HeartbeatAck {
                    client_time,
                    server_time,
                }))
                .await?;
            }

            SystemMessage::CreateRoom { room_id, config } => {
                let created = {
                    let mut rooms = self.state.rooms.lock().await;
                    match room_id {
                        Some(room_id) => {
                            rooms.create_room(room_id.clone(), config).map(|_| room_id)
                        }
                        None => rooms.create_room_with_code(config).map(|(room_id, _)| room_id),
                    }
                };
                match created {
                    Ok(room_id) => {
                        tracing::debug!(
                            identity = %self.identity(),
                            %room_id,
                            "room created on request"
                        );
                        self.send(Payload::System(SystemMessage::RoomCreated { room_id }))
                            .await?;
                    }
                    Err(e) => self.send_room_error(&e).await?,
                }
            }

            SystemMessage::CheckRoom { room_id } => {
                let exists = self.state.rooms.lock().await.room_exists(&room_id);
                self.send(Payload::System(SystemMessage::RoomStatus { room_id, exists }))
                    .await?;
            }

            SystemMessage::JoinRoom { room_id } => {
                if let Some(current) = &self.membership.room {
                    let message = format!("already in room {}", current.room_id());
                    self.send_error(409, &message).await?;
                    return Ok(ControlFlow::Continue(()));
                }

                // Lock only for the join itself, drop before network I/O.
                let joined = {
                    let mut rooms = self.state.rooms.lock().await;
                    rooms
                        .join_room(
                            &room_id,
                            self.identity().clone(),
                            self.username.clone(),
                            self.outbound_tx.clone(),
                        )
                        .await
                };

                match joined {
                    Ok((handle, _)) => {
                        self.membership.room = Some(handle);
                        let identity = self.identity().clone();
                        self.send(Payload::System(SystemMessage::RoomJoined { room_id, identity }))
                            .await?;
                    }
                    Err(e @ RoomError::NotFound(_)) => {
                        self.send_room_error(&e).await?;
                        return Ok(ControlFlow::Break(()));
                    }
                    Err(e) => self.send_room_error(&e).await?,
                }
            }

            SystemMessage::LeaveRoom => self.leave_room().await,

            SystemMessage::ListRooms => {
                // Ask the actors without holding the registry lock.
                let handles = self.state.rooms.lock().await.room_handles();

                let mut rooms = Vec::with_capacity(handles.len());
                for handle in &handles {
                    if let Ok(info) = handle.get_info().await {
                        if info.state.is_joinable() {
                            rooms.push(RoomListEntry {
                                room_id: info.room_id,
                                participant_count: info.participant_count,
                                config: info.config,
                                status: info.status,
                            });
                        }
                    }
                }
                rooms.sort_by(|a, b| a.room_id.cmp(&b.room_id));

                self.send(Payload::System(SystemMessage::RoomList { rooms }))
                    .await?;
            }

            SystemMessage::Disconnect { reason } => {
                tracing::info!(identity = %self.identity(), %reason, "client disconnected");
                return Ok(ControlFlow::Break(()));
            }

            _ => {
                tracing::debug!(identity = %self.identity(), "ignoring unexpected system message");
            }
        }

        Ok(ControlFlow::Continue(()))
    }

    /// Routes a board event to the joined room through the cached handle.
    async fn handle_game_message(&mut self, msg: GameMessage) -> Result<(), CoopsweeperError> {
        let Some(room) = self.membership.room.clone() else {
            return self.send_error(400, "not in any room").await;
        };
        let identity = self.identity().clone();

        let result = match msg {
            GameMessage::Click { x, y } => room.click(identity, Coord::new(x, y)).await.map(|_| ()),
            GameMessage::Flag { x, y } => room.flag(identity, Coord::new(x, y)).await.map(|_| ()),
            GameMessage::CursorMovement { x, y } => room.move_cursor(identity, x, y).await,
            GameMessage::Reset => room.reset(identity).await,
            GameMessage::GameUpdate(_) | GameMessage::UsersUpdate { .. } => {
                return self.send_error(400, "server-only message").await;
            }
        };

        if let Err(e) = result {
            if matches!(e, RoomError::Unavailable(_)) {
                self.membership.room = None;
            }
            self.send_room_error(&e).await?;
        }
        Ok(())
    }

    async fn leave_room(&mut self) {
        let Some(room) = self.membership.room.take() else {
            tracing::debug!(identity = %self.identity(), "leave without a room");
            return;
        };
        let room_id = room.room_id().clone();
        let result = {
            let mut rooms = self.state.rooms.lock().await;
            rooms.leave_room(&room_id, self.identity().clone()).await
        };
        if let Err(e) = result {
            tracing::debug!(identity = %self.identity(), %room_id, error = %e, "leave room failed");
        }
        // Updates queued before the leave belong to the old room.
        while self.outbound_rx.try_recv().is_ok() {}
    }

    /// Pushes a room update to the client. Cursor-only updates go out
    /// unreliably; the next one supersedes them.
    async fn forward(&mut self, outbound: RoomOutbound) -> Result<(), CoopsweeperError> {
        match outbound {
            RoomOutbound::Update(snapshot) => {
                let msg = GameMessage::GameUpdate(RoomSnapshot::clone(&snapshot));
                self.send(Payload::Game(msg)).await
            }
            RoomOutbound::Users(users) => {
                let envelope = self.envelope(Payload::Game(GameMessage::UsersUpdate {
                    users: (*users).clone(),
                }));
                let bytes = self.state.codec.encode(&envelope)?;
                self.conn.send_unreliable(&bytes).await?;
                Ok(())
            }
        }
    }

    fn envelope(&mut self, payload: Payload) -> Envelope {
        Envelope {
            seq: next_seq(&mut self.seq),
            timestamp: millis_since(&self.start),
            payload,
        }
    }

    async fn send(&mut self, payload: Payload) -> Result<(), CoopsweeperError> {
        let envelope = self.envelope(payload);
        let bytes = self.state.codec.encode(&envelope)?;
        self.conn.send(&bytes).await?;
        Ok(())
    }

    async fn send_error(&mut self, code: u16, message: &str) -> Result<(), CoopsweeperError> {
        let seq = next_seq(&mut self.seq);
        send_error(&self.conn, &self.state.codec, code, message, seq, &self.start).await
    }

    async fn send_room_error(&mut self, err: &RoomError) -> Result<(), CoopsweeperError> {
        tracing::debug!(identity = %self.identity(), error = %err, "room request failed");
        self.send_error(error_code(err), &err.to_string()).await
    }
}

/// Maps a room error to its wire code.
fn error_code(err: &RoomError) -> u16 {
    match err {
        RoomError::NotFound(_) | RoomError::Unavailable(_) => 404,
        RoomError::RoomAlreadyExists(_) | RoomError::InvalidState(_) => 409,
        RoomError::InvalidConfig(_) | RoomError::InvalidRoomId(_) | RoomError::NotInRoom(..) => 400,
    }
}

/// Sends a SystemMessage::Error envelope to the client.
async fn send_error(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    code: u16,
    message: &str,
    seq: u64,
    start: &Instant,
) -> Result<(), CoopsweeperError> {
    let envelope = Envelope {
        seq,
        timestamp: millis_since(start),
        payload: Payload::System(SystemMessage::Error {
            code,
            message: message.to_string(),
        }),
    };
    let bytes = codec.encode(&envelope)?;
    conn.send(&bytes).await?;
    Ok(())
}

fn millis_since(start: &Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}

#[cfg(test)]
mod tests {
    use coopsweeper_board::{BoardConfig, BoardError};
    use coopsweeper_protocol::RoomId;

    use super::*;

    #[test]
    fn test_next_seq_increments() {
        let mut seq = 5;
        assert_eq!(next_seq(&mut seq), 5);
        assert_eq!(next_seq(&mut seq), 6);
        assert_eq!(seq, 7);
    }

    #[test]
    fn test_error_code_maps_room_errors() {
        let room = RoomId::new("1234");
        assert_eq!(error_code(&RoomError::NotFound(room.clone())), 404);
        assert_eq!(error_code(&RoomError::RoomAlreadyExists(room.clone())), 409);
        assert_eq!(error_code(&RoomError::InvalidRoomId("a b".into())), 400);
        let invalid = BoardConfig::new(0, 8, 1).validate().unwrap_err();
        assert!(matches!(invalid, BoardError::InvalidConfig(_)));
        assert_eq!(error_code(&RoomError::InvalidConfig(invalid)), 400);
    }
}
