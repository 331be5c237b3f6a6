
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use session_signal_server::protocol::*;
use session_signal_server::server::{ServerConfig, SignalServer};
use session_signal_server::websocket::create_router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use test_helpers::{create_test_server, create_test_server_with_config, test_server_config};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsSender = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsReceiver = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Serve `server` on an ephemeral port and return its address
async fn start_server_with_instance(server: Arc<SignalServer>) -> SocketAddr {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router("http://localhost:3000").with_state(server);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    addr
}

async fn start_test_server() -> (SocketAddr, Arc<SignalServer>) {
    let server = create_test_server();
    (start_server_with_instance(Arc::clone(&server)).await, server)
}

async fn start_test_server_with_config(config: ServerConfig) -> SocketAddr {
    start_server_with_instance(create_test_server_with_config(config)).await
}

async fn connect_client(addr: SocketAddr) -> (WsSender, WsReceiver) {
    let url = format!("ws://{addr}/v1/ws");
    let (ws_stream, _) = tokio::time::timeout(Duration::from_secs(10), connect_async(&url))
        .await
        .expect("WebSocket connection timed out after 10 seconds")
        .expect("Failed to connect");
    ws_stream.split()
}

async fn send(sender: &mut WsSender, message: &ClientMessage) {
    let json = serde_json::to_string(message).unwrap();
    sender.send(Message::Text(json.into())).await.unwrap();
}

async fn receive(receiver: &mut WsReceiver) -> ServerMessage {
    loop {
        let frame = tokio::time::timeout(RECEIVE_TIMEOUT, receiver.next())
            .await
            .expect("Timeout waiting for server message")
            .expect("Connection closed")
            .expect("WebSocket error");
        match frame {
            Message::Text(text) => {
                return serde_json::from_str(text.as_str()).expect("valid ServerMessage")
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn register(
    sender: &mut WsSender,
    receiver: &mut WsReceiver,
    id: &str,
    display_name: &str,
    is_host: bool,
) {
    send(
        sender,
        &ClientMessage::Register {
            id: id.to_string(),
            display_name: display_name.to_string(),
            is_host,
        },
    )
    .await;
    match receive(receiver).await {
        ServerMessage::Registered { id: registered, .. } => assert_eq!(registered, id),
        other => panic!("expected registered, got {other:?}"),
    }
}

fn assert_error_code(message: ServerMessage, expected: ErrorCode) {
    match message {
        ServerMessage::Error { error_code, .. } => assert_eq!(error_code, Some(expected)),
        other => panic!("expected error {expected:?}, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_host_and_guest_session_over_websocket() {
    let (addr, server) = start_test_server().await;

    let (mut host_tx, mut host_rx) = connect_client(addr).await;
    register(&mut host_tx, &mut host_rx, "H", "Dr. Host", true).await;

    send(
        &mut host_tx,
        &ClientMessage::CreateRoom {
            display_name: "Session A".to_string(),
            host_id: "H".to_string(),
        },
    )
    .await;
    let room_id = match receive(&mut host_rx).await {
        ServerMessage::RoomCreated {
            room_id,
            display_name,
            encryption_key,
        } => {
            assert_eq!(display_name, "Session A");
            assert!(!encryption_key.is_empty());
            room_id
        }
        other => panic!("expected room-created, got {other:?}"),
    };

    let (mut guest_tx, mut guest_rx) = connect_client(addr).await;
    register(&mut guest_tx, &mut guest_rx, "G", "Patient", false).await;
    send(
        &mut guest_tx,
        &ClientMessage::JoinRoom {
            room_id: room_id.clone(),
            participant_id: "G".to_string(),
        },
    )
    .await;
    match receive(&mut guest_rx).await {
        ServerMessage::RoomJoined(payload) => {
            assert_eq!(payload.room_id, room_id);
            assert_eq!(payload.host_id, "H");
        }
        other => panic!("expected room-joined, got {other:?}"),
    }
    match receive(&mut host_rx).await {
        ServerMessage::UserJoined { participant_id, .. } => assert_eq!(participant_id, "G"),
        other => panic!("expected user-joined, got {other:?}"),
    }

    for (n, kind) in ["offer", "candidate"].iter().enumerate() {
        send(
            &mut host_tx,
            &ClientMessage::Signal {
                sender_id: "H".to_string(),
                target_id: "G".to_string(),
                signal: json!({ "type": kind, "seq": n }),
            },
        )
        .await;
    }
    for (n, kind) in ["offer", "candidate"].iter().enumerate() {
        match receive(&mut guest_rx).await {
            ServerMessage::Signal { sender_id, signal } => {
                assert_eq!(sender_id, "H");
                assert_eq!(signal["type"], *kind);
                assert_eq!(signal["seq"], n);
            }
            other => panic!("expected signal, got {other:?}"),
        }
    }

    host_tx.close().await.unwrap();
    drop(host_rx);

    match receive(&mut guest_rx).await {
        ServerMessage::UserLeft { participant_id, .. } => assert_eq!(participant_id, "H"),
        other => panic!("expected user-left, got {other:?}"),
    }
    match receive(&mut guest_rx).await {
        ServerMessage::RoomClosed { reason, .. } => assert_eq!(reason, RoomClosedReason::HostLeft),
        other => panic!("expected room-closed, got {other:?}"),
    }
    assert!(server.list_active_rooms().is_empty());
}

#[tokio::test]
async fn test_requests_before_register_get_not_registered() {
    let (addr, _) = start_test_server().await;
    let (mut tx, mut rx) = connect_client(addr).await;

    send(&mut tx, &ClientMessage::Ping).await;
    assert!(matches!(receive(&mut rx).await, ServerMessage::Pong));

    send(
        &mut tx,
        &ClientMessage::JoinRoom {
            room_id: "AAAAAAAAAAAAAAAAAAAAAA".to_string(),
            participant_id: "nobody".to_string(),
        },
    )
    .await;
    assert_error_code(receive(&mut rx).await, ErrorCode::NotRegistered);
}

#[tokio::test]
async fn test_malformed_and_binary_frames_are_rejected() {
    let (addr, server) = start_test_server().await;
    let (mut tx, mut rx) = connect_client(addr).await;

    tx.send(Message::Text("{not json".into())).await.unwrap();
    assert_error_code(receive(&mut rx).await, ErrorCode::InvalidInput);

    tx.send(Message::Text(r#"{"type":"teleport","data":{}}"#.into()))
        .await
        .unwrap();
    assert_error_code(receive(&mut rx).await, ErrorCode::InvalidInput);

    tx.send(Message::Binary(vec![1_u8, 2, 3].into())).await.unwrap();
    assert_error_code(receive(&mut rx).await, ErrorCode::InvalidInput);

    // The connection survives and can still register.
    register(&mut tx, &mut rx, "still-here", "Still Here", false).await;
    assert!(
        server
            .metrics()
            .protocol_errors
            .load(std::sync::atomic::Ordering::Relaxed)
            >= 3
    );
}

#[tokio::test]
async fn test_oversize_frame_is_rejected() {
    let mut config = test_server_config();
    config.max_message_size = 256;
    let addr = start_test_server_with_config(config).await;
    let (mut tx, mut rx) = connect_client(addr).await;

    register(&mut tx, &mut rx, "sender", "Sender", true).await;
    send(
        &mut tx,
        &ClientMessage::Signal {
            sender_id: "sender".to_string(),
            target_id: "anyone".to_string(),
            signal: json!({ "sdp": "x".repeat(1024) }),
        },
    )
    .await;
    assert_error_code(receive(&mut rx).await, ErrorCode::MessageTooLarge);
}

#[tokio::test]
async fn test_unregistered_connection_times_out() {
    let mut config = test_server_config();
    config.registration_timeout = Duration::from_millis(200);
    let addr = start_test_server_with_config(config).await;
    let (_tx, mut rx) = connect_client(addr).await;

    assert_error_code(receive(&mut rx).await, ErrorCode::NotRegistered);

    // Server closes the socket after the timeout notice.
    let closed = tokio::time::timeout(RECEIVE_TIMEOUT, async {
        loop {
            match rx.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "connection should close after registration timeout");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_guest_disconnect_keeps_room_for_host() {
    let (addr, server) = start_test_server().await;

    let (mut host_tx, mut host_rx) = connect_client(addr).await;
    register(&mut host_tx, &mut host_rx, "host", "Host", true).await;
    send(
        &mut host_tx,
        &ClientMessage::CreateRoom {
            display_name: "Follow-up".to_string(),
            host_id: "host".to_string(),
        },
    )
    .await;
    let ServerMessage::RoomCreated { room_id, .. } = receive(&mut host_rx).await else {
        panic!("expected room-created");
    };

    let (mut guest_tx, mut guest_rx) = connect_client(addr).await;
    register(&mut guest_tx, &mut guest_rx, "guest", "Guest", false).await;
    send(
        &mut guest_tx,
        &ClientMessage::JoinRoom {
            room_id: room_id.clone(),
            participant_id: "guest".to_string(),
        },
    )
    .await;
    assert!(matches!(receive(&mut guest_rx).await, ServerMessage::RoomJoined(_)));
    assert!(matches!(receive(&mut host_rx).await, ServerMessage::UserJoined { .. }));

    guest_tx.close().await.unwrap();
    drop(guest_rx);

    match receive(&mut host_rx).await {
        ServerMessage::UserLeft { participant_id, .. } => assert_eq!(participant_id, "guest"),
        other => panic!("expected user-left, got {other:?}"),
    }

    let rooms = server.list_active_rooms();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].id, room_id);
    assert!(rooms[0].guest_id.is_none());
}
