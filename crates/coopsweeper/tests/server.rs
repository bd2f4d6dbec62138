//! End-to-end tests: real WebSocket clients against a running server.

use std::time::Duration;

use coopsweeper::prelude::*;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Forwards results to the test over a channel.
struct ChannelSink(mpsc::UnboundedSender<GameResult>);

impl ResultSink for ChannelSink {
    async fn record(&self, result: GameResult) -> Result<(), SinkError> {
        self.0
            .send(result)
            .map_err(|_| SinkError::Unavailable("test receiver gone".into()))
    }
}

async fn spawn(server: CoopsweeperServer<JsonCodec>) -> String {
    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

/// Starts a server on a random port and returns the address.
async fn start_server() -> String {
    let server = CoopsweeperServer::builder()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");
    spawn(server).await
}

async fn start_server_with_results() -> (String, mpsc::UnboundedReceiver<GameResult>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let server = CoopsweeperServer::builder()
        .bind("127.0.0.1:0")
        .result_sink(ChannelSink(tx))
        .build()
        .await
        .expect("server should build");
    (spawn(server).await, rx)
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, payload: Payload) {
    let envelope = Envelope {
        seq: 0,
        timestamp: 0,
        payload,
    };
    let json = serde_json::to_string(&envelope).expect("encode");
    ws.send(Message::Text(json.into())).await.expect("send");
}

async fn send_system(ws: &mut ClientWs, msg: SystemMessage) {
    send(ws, Payload::System(msg)).await;
}

async fn send_game(ws: &mut ClientWs, msg: GameMessage) {
    send(ws, Payload::Game(msg)).await;
}

/// Receives the next envelope. Panics on close or after two seconds.
async fn recv(ws: &mut ClientWs) -> Envelope {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for message")
            .expect("stream ended")
            .expect("websocket error");
        match msg {
            Message::Text(text) => return serde_json::from_str(&text).expect("decode"),
            Message::Binary(data) => return serde_json::from_slice(&data).expect("decode"),
            Message::Close(_) => panic!("connection closed"),
            _ => continue,
        }
    }
}

/// Receives until a full game update arrives, skipping cursor updates.
async fn recv_game_update(ws: &mut ClientWs) -> RoomSnapshot {
    loop {
        if let Payload::Game(GameMessage::GameUpdate(snapshot)) = recv(ws).await.payload {
            return snapshot;
        }
    }
}

fn expect_error(envelope: Envelope) -> (u16, String) {
    match envelope.payload {
        Payload::System(SystemMessage::Error { code, message }) => (code, message),
        other => panic!("expected Error, got {other:?}"),
    }
}

/// Asserts the server closes the connection.
async fn expect_closed(ws: &mut ClientWs) {
    let result = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(result.is_ok(), "expected the server to close the connection");
}

/// Sends a handshake and returns the issued identity.
async fn handshake(ws: &mut ClientWs, username: &str) -> ParticipantId {
    send_system(
        ws,
        SystemMessage::Handshake {
            version: PROTOCOL_VERSION,
            username: Some(username.into()),
        },
    )
    .await;
    match recv(ws).await.payload {
        Payload::System(SystemMessage::HandshakeAck { identity, .. }) => identity,
        other => panic!("expected HandshakeAck, got {other:?}"),
    }
}

async fn create_room(ws: &mut ClientWs, room_id: Option<&str>, config: BoardConfig) -> RoomId {
    send_system(
        ws,
        SystemMessage::CreateRoom {
            room_id: room_id.map(RoomId::new),
            config,
        },
    )
    .await;
    match recv(ws).await.payload {
        Payload::System(SystemMessage::RoomCreated { room_id }) => room_id,
        other => panic!("expected RoomCreated, got {other:?}"),
    }
}

/// Joins a room and returns the snapshot that follows admission.
async fn join(ws: &mut ClientWs, room_id: &RoomId) -> RoomSnapshot {
    send_system(
        ws,
        SystemMessage::JoinRoom {
            room_id: room_id.clone(),
        },
    )
    .await;
    match recv(ws).await.payload {
        Payload::System(SystemMessage::RoomJoined { room_id: joined, .. }) => {
            assert_eq!(&joined, room_id);
        }
        other => panic!("expected RoomJoined, got {other:?}"),
    }
    recv_game_update(ws).await
}

// =========================================================================
// Handshake
// =========================================================================

#[tokio::test]
async fn test_handshake_issues_hex_identity() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let identity = handshake(&mut ws, "alice").await;
    assert_eq!(identity.as_str().len(), 32);
    assert!(identity.as_str().chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn test_handshake_version_mismatch_rejected() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send_system(
        &mut ws,
        SystemMessage::Handshake {
            version: 999,
            username: None,
        },
    )
    .await;

    let (code, message) = expect_error(recv(&mut ws).await);
    assert_eq!(code, 400);
    assert!(message.contains("version mismatch"));
    expect_closed(&mut ws).await;
}

#[tokio::test]
async fn test_handshake_non_handshake_first_message_rejected() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send_system(&mut ws, SystemMessage::Heartbeat { client_time: 0 }).await;

    let (code, _) = expect_error(recv(&mut ws).await);
    assert_eq!(code, 400);
}

#[tokio::test]
async fn test_username_trimmed_and_defaulted() {
    let addr = start_server().await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;

    let id_a = handshake(&mut a, "   alice  ").await;
    send_system(
        &mut b,
        SystemMessage::Handshake {
            version: PROTOCOL_VERSION,
            username: None,
        },
    )
    .await;
    let Payload::System(SystemMessage::HandshakeAck { identity: id_b, .. }) =
        recv(&mut b).await.payload
    else {
        panic!("expected HandshakeAck");
    };

    let room_id = create_room(&mut a, Some("names"), BoardConfig::EASY).await;
    join(&mut a, &room_id).await;
    let snapshot = join(&mut b, &room_id).await;

    assert_eq!(snapshot.users[&id_a].username, "alice");
    assert_eq!(snapshot.users[&id_b].username, "anonymous");
}

// =========================================================================
// Connection plumbing
// =========================================================================

#[tokio::test]
async fn test_heartbeat_echoes_client_time() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws, "alice").await;

    send_system(&mut ws, SystemMessage::Heartbeat { client_time: 12345 }).await;

    match recv(&mut ws).await.payload {
        Payload::System(SystemMessage::HeartbeatAck { client_time, .. }) => {
            assert_eq!(client_time, 12345);
        }
        other => panic!("expected HeartbeatAck, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_envelope_ignored() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws, "alice").await;

    ws.send(Message::Text("not json".to_string().into())).await.expect("send");
    send_system(&mut ws, SystemMessage::Heartbeat { client_time: 999 }).await;

    assert!(matches!(
        recv(&mut ws).await.payload,
        Payload::System(SystemMessage::HeartbeatAck { .. })
    ));
}

#[tokio::test]
async fn test_disconnect_closes_connection() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws, "alice").await;

    send_system(
        &mut ws,
        SystemMessage::Disconnect {
            reason: "bye".into(),
        },
    )
    .await;
    expect_closed(&mut ws).await;
}

#[tokio::test]
async fn test_server_sends_text_frames() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    send_system(
        &mut ws,
        SystemMessage::Handshake {
            version: PROTOCOL_VERSION,
            username: None,
        },
    )
    .await;

    let msg = ws.next().await.unwrap().expect("recv");
    assert!(matches!(msg, Message::Text(_)), "JSON should go out as text");
}

// =========================================================================
// Room management
// =========================================================================

#[tokio::test]
async fn test_create_room_without_id_gets_code() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws, "alice").await;

    let room_id = create_room(&mut ws, None, BoardConfig::EASY).await;
    let code: u32 = room_id.as_str().parse().expect("numeric code");
    assert!((1000..=9999).contains(&code));

    send_system(&mut ws, SystemMessage::CheckRoom { room_id: room_id.clone() }).await;
    match recv(&mut ws).await.payload {
        Payload::System(SystemMessage::RoomStatus { room_id: checked, exists }) => {
            assert_eq!(checked, room_id);
            assert!(exists);
        }
        other => panic!("expected RoomStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_check_room_unknown_does_not_exist() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws, "alice").await;

    send_system(
        &mut ws,
        SystemMessage::CheckRoom {
            room_id: RoomId::new("0000"),
        },
    )
    .await;
    assert!(matches!(
        recv(&mut ws).await.payload,
        Payload::System(SystemMessage::RoomStatus { exists: false, .. })
    ));
}

#[tokio::test]
async fn test_create_room_errors_map_to_codes() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws, "alice").await;

    create_room(&mut ws, Some("1234"), BoardConfig::EASY).await;

    send_system(
        &mut ws,
        SystemMessage::CreateRoom {
            room_id: Some(RoomId::new("1234")),
            config: BoardConfig::EASY,
        },
    )
    .await;
    assert_eq!(expect_error(recv(&mut ws).await).0, 409);

    send_system(
        &mut ws,
        SystemMessage::CreateRoom {
            room_id: Some(RoomId::new("not a code")),
            config: BoardConfig::EASY,
        },
    )
    .await;
    assert_eq!(expect_error(recv(&mut ws).await).0, 400);

    send_system(
        &mut ws,
        SystemMessage::CreateRoom {
            room_id: Some(RoomId::new("5678")),
            config: BoardConfig::new(4, 4, 16),
        },
    )
    .await;
    assert_eq!(expect_error(recv(&mut ws).await).0, 400);
}

#[tokio::test]
async fn test_join_room_not_found_closes_connection() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws, "alice").await;

    send_system(
        &mut ws,
        SystemMessage::JoinRoom {
            room_id: RoomId::new("9999"),
        },
    )
    .await;

    let (code, _) = expect_error(recv(&mut ws).await);
    assert_eq!(code, 404);
    expect_closed(&mut ws).await;
}

#[tokio::test]
async fn test_join_room_twice_conflicts() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws, "alice").await;

    let room_id = create_room(&mut ws, Some("1234"), BoardConfig::EASY).await;
    join(&mut ws, &room_id).await;

    send_system(&mut ws, SystemMessage::JoinRoom { room_id }).await;
    let (code, _) = expect_error(recv(&mut ws).await);
    assert_eq!(code, 409);
}

#[tokio::test]
async fn test_list_rooms_reports_participants() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws, "alice").await;

    let joined = create_room(&mut ws, Some("b-room"), BoardConfig::EASY).await;
    create_room(&mut ws, Some("a-room"), BoardConfig::MEDIUM).await;
    join(&mut ws, &joined).await;

    send_system(&mut ws, SystemMessage::ListRooms).await;
    let rooms = loop {
        if let Payload::System(SystemMessage::RoomList { rooms }) = recv(&mut ws).await.payload {
            break rooms;
        }
    };

    assert_eq!(rooms.len(), 2);
    assert_eq!(rooms[0].room_id, RoomId::new("a-room"));
    assert_eq!(rooms[0].participant_count, 0);
    assert_eq!(rooms[0].config, BoardConfig::MEDIUM);
    assert_eq!(rooms[1].room_id, RoomId::new("b-room"));
    assert_eq!(rooms[1].participant_count, 1);
    assert_eq!(rooms[1].status, GameStatus::Playing);
}

// =========================================================================
// Game traffic
// =========================================================================

#[tokio::test]
async fn test_game_message_before_join_rejected() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws, "alice").await;

    send_game(&mut ws, GameMessage::Click { x: 0, y: 0 }).await;

    let (code, message) = expect_error(recv(&mut ws).await);
    assert_eq!(code, 400);
    assert!(message.contains("not in any room"));
}

#[tokio::test]
async fn test_join_receives_snapshot_with_self() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    let identity = handshake(&mut ws, "alice").await;

    let room_id = create_room(&mut ws, Some("1234"), BoardConfig::EASY).await;
    let snapshot = join(&mut ws, &room_id).await;

    assert_eq!(snapshot.board.status, GameStatus::Playing);
    assert_eq!(snapshot.board.flags_left, 10);
    assert_eq!(snapshot.users.len(), 1);
    assert_eq!(snapshot.users[&identity].squares_cleared, 0);
}

#[tokio::test]
async fn test_click_fans_out_to_all_participants() {
    let addr = start_server().await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;
    let id_a = handshake(&mut a, "alice").await;
    handshake(&mut b, "bob").await;

    let room_id = create_room(&mut a, Some("1234"), BoardConfig::EASY).await;
    join(&mut a, &room_id).await;
    join(&mut b, &room_id).await;
    // Alice also sees Bob's arrival.
    assert_eq!(recv_game_update(&mut a).await.users.len(), 2);

    send_game(&mut a, GameMessage::Click { x: 4, y: 4 }).await;

    let seen_by_a = recv_game_update(&mut a).await;
    let seen_by_b = recv_game_update(&mut b).await;
    assert_eq!(seen_by_a, seen_by_b);
    assert!(seen_by_b.board.cell(4, 4).unwrap().is_revealed);
    assert!(seen_by_b.users[&id_a].squares_cleared > 0);
}

#[tokio::test]
async fn test_cursor_movement_sends_users_update() {
    let addr = start_server().await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;
    let id_a = handshake(&mut a, "alice").await;
    handshake(&mut b, "bob").await;

    let room_id = create_room(&mut a, Some("1234"), BoardConfig::EASY).await;
    join(&mut a, &room_id).await;
    join(&mut b, &room_id).await;

    send_game(&mut a, GameMessage::CursorMovement { x: 120.5, y: 64.0 }).await;

    let users = loop {
        if let Payload::Game(GameMessage::UsersUpdate { users }) = recv(&mut b).await.payload {
            break users;
        }
    };
    assert_eq!(users[&id_a].cursor.x, 120.5);
    assert_eq!(users[&id_a].cursor.y, 64.0);
}

#[tokio::test]
async fn test_disconnect_leaves_room() {
    let addr = start_server().await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;
    let id_a = handshake(&mut a, "alice").await;
    handshake(&mut b, "bob").await;

    let room_id = create_room(&mut a, Some("1234"), BoardConfig::EASY).await;
    join(&mut a, &room_id).await;
    join(&mut b, &room_id).await;
    recv_game_update(&mut a).await;

    drop(b);

    let snapshot = recv_game_update(&mut a).await;
    assert_eq!(snapshot.users.len(), 1);
    assert!(snapshot.users.contains_key(&id_a));
}

#[tokio::test]
async fn test_last_leave_destroys_room() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws, "alice").await;

    let room_id = create_room(&mut ws, Some("1234"), BoardConfig::EASY).await;
    join(&mut ws, &room_id).await;

    send_system(&mut ws, SystemMessage::LeaveRoom).await;
    send_system(&mut ws, SystemMessage::CheckRoom { room_id }).await;
    assert!(matches!(
        recv(&mut ws).await.payload,
        Payload::System(SystemMessage::RoomStatus { exists: false, .. })
    ));
}

#[tokio::test]
async fn test_reset_restores_fresh_board() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    let identity = handshake(&mut ws, "alice").await;

    let room_id = create_room(&mut ws, Some("1234"), BoardConfig::EASY).await;
    join(&mut ws, &room_id).await;

    send_game(&mut ws, GameMessage::Click { x: 0, y: 0 }).await;
    let after_click = recv_game_update(&mut ws).await;
    assert!(after_click.users[&identity].squares_cleared > 0);

    send_game(&mut ws, GameMessage::Reset).await;
    let after_reset = recv_game_update(&mut ws).await;
    assert_eq!(after_reset.board.status, GameStatus::Playing);
    assert_eq!(after_reset.board.flags_left, 10);
    assert!(after_reset.board.cells.iter().flatten().all(|c| !c.is_revealed));
    assert_eq!(after_reset.users[&identity].squares_cleared, 0);
}

#[tokio::test]
async fn test_win_records_result() {
    let (addr, mut results) = start_server_with_results().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws, "alice").await;

    // On a 2x1 board with one mine the first click always wins.
    let room_id = create_room(&mut ws, Some("tiny"), BoardConfig::new(2, 1, 1)).await;
    join(&mut ws, &room_id).await;

    send_game(&mut ws, GameMessage::Click { x: 0, y: 0 }).await;
    let snapshot = recv_game_update(&mut ws).await;
    assert_eq!(snapshot.board.status, GameStatus::Won);

    let result = tokio::time::timeout(Duration::from_secs(2), results.recv())
        .await
        .expect("result should be recorded")
        .expect("sink channel open");
    assert_eq!(result.room_id, room_id);
    assert_eq!(result.usernames(), vec!["alice"]);
    assert_eq!(result.participants[0].squares_cleared, 1);
}
