//! Session Socket Integration Tests
//!
//! Runs the session actor over a real WebSocket against an in-process
//! realtime service and verifies:
//! 1. Login opens one connection and registers with the session token
//! 2. Notifications pushed by the service reach subscribers
//! 3. Logout sends the logout frame before closing and clears the token
//! 4. Unreachable endpoints leave the session closed

mod common;

use common::{start_realtime_service, unused_port, RealtimeService};
use std::sync::Arc;
use std::time::Duration;
use textdata_core::{
    session::OutboundMessage, ConnectionState, ReconnectPolicy, SessionConfig, SessionSocket,
    SessionTokens, WsConnector,
};

const WAIT: Duration = Duration::from_secs(3);

async fn spawn_socket(url: String, tokens: Arc<SessionTokens>) -> SessionSocket {
    let config = SessionConfig {
        url,
        connect_timeout: Duration::from_secs(2),
        reconnect: ReconnectPolicy::default(),
    };
    SessionSocket::spawn(config, Arc::new(WsConnector::new()), tokens)
        .await
        .unwrap()
}

fn frame(message: OutboundMessage) -> String {
    message.to_json().unwrap()
}

#[tokio::test]
async fn test_login_registers_and_receives_notification() {
    let service = Arc::new(RealtimeService::default());
    let url = start_realtime_service(service.clone()).await;
    let tokens = Arc::new(SessionTokens::in_memory());

    let socket = spawn_socket(url, tokens.clone()).await;
    let mut notifications = socket.subscribe();

    socket.login("T1").unwrap();
    socket.wait_for(ConnectionState::Open, WAIT).await.unwrap();

    let notification = tokio::time::timeout(WAIT, notifications.recv())
        .await
        .expect("notification in time")
        .unwrap();
    assert_eq!(notification.notify_msg, "Someone replied to your submission");
    assert_eq!(notification.notify_type.as_deref(), Some("reply"));

    let frames = service.wait_for_frames(1, WAIT).await;
    assert_eq!(
        frames,
        vec![frame(OutboundMessage::Register {
            token: "T1".to_string()
        })]
    );
    assert_eq!(tokens.session_token().as_deref(), Some("T1"));

    socket.shutdown().await;
}

#[tokio::test]
async fn test_logout_frame_precedes_close() {
    let service = Arc::new(RealtimeService::default());
    let url = start_realtime_service(service.clone()).await;
    let tokens = Arc::new(SessionTokens::in_memory());

    let socket = spawn_socket(url, tokens.clone()).await;
    socket.login("T1").unwrap();
    socket.wait_for(ConnectionState::Open, WAIT).await.unwrap();

    socket.logout().unwrap();
    socket.wait_for(ConnectionState::Closed, WAIT).await.unwrap();

    let frames = service.wait_for_frames(3, WAIT).await;
    assert_eq!(
        frames,
        vec![
            frame(OutboundMessage::Register {
                token: "T1".to_string()
            }),
            frame(OutboundMessage::Logout {
                token: "T1".to_string()
            }),
            "close".to_string(),
        ]
    );
    assert_eq!(tokens.session_token(), None);

    socket.shutdown().await;
}

#[tokio::test]
async fn test_repeated_login_keeps_single_connection() {
    let service = Arc::new(RealtimeService::default());
    let url = start_realtime_service(service.clone()).await;

    let socket = spawn_socket(url, Arc::new(SessionTokens::in_memory())).await;
    for _ in 0..5 {
        socket.login("T1").unwrap();
    }
    socket.wait_for(ConnectionState::Open, WAIT).await.unwrap();
    service.wait_for_frames(1, WAIT).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(service.connections(), 1);
    assert_eq!(service.frames().len(), 1);

    socket.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_endpoint_stays_closed() {
    let socket = spawn_socket(
        format!("ws://127.0.0.1:{}/", unused_port()),
        Arc::new(SessionTokens::in_memory()),
    )
    .await;

    socket.login("T1").unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    socket.wait_for(ConnectionState::Closed, WAIT).await.unwrap();

    let snapshot = socket.snapshot().await.unwrap();
    assert_eq!(snapshot.attempt, 1);
    assert_eq!(snapshot.registered_token, None);

    socket.shutdown().await;
}
