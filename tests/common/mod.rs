//! Common test utilities: in-process stand-ins for the backend services

#![allow(dead_code)]

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Requests seen by the fake autocomplete endpoint
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub params: HashMap<String, String>,
    pub authorization: Option<String>,
}

#[derive(Default)]
pub struct AutocompleteBackend {
    pub requests: Mutex<Vec<SeenRequest>>,
    /// Respond with 500 for every request
    pub failing: bool,
}

impl AutocompleteBackend {
    pub fn requests(&self) -> Vec<SeenRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn autocomplete(
    State(backend): State<Arc<AutocompleteBackend>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    backend.requests.lock().unwrap().push(SeenRequest {
        params: params.clone(),
        authorization,
    });

    if backend.failing {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "Failed to get autocomplete, please try again later."})),
        );
    }

    let query = params.get("query").cloned().unwrap_or_default();
    let topn: usize = params
        .get("topn")
        .and_then(|n| n.parse().ok())
        .unwrap_or(7);

    let titles = ["My Note", "My Notebook", "Notes on Rust", "Mythology"];
    let suggestions: Vec<Value> = titles
        .iter()
        .enumerate()
        .filter(|(_, title)| {
            title
                .to_lowercase()
                .contains(query.trim().to_lowercase().as_str())
        })
        .take(topn)
        .map(|(i, title)| {
            let id = format!("sub{}", i);
            json!({"label": title, "id": id, "url": format!("/submissions/{}", id)})
        })
        .collect();

    (StatusCode::OK, Json(json!({ "suggestions": suggestions })))
}

/// Start a fake REST backend; returns its API base URL
pub async fn start_autocomplete_backend(backend: Arc<AutocompleteBackend>) -> String {
    let app = Router::new()
        .route("/api/search/autocomplete", get(autocomplete))
        .with_state(backend);

    let addr = serve(app).await;
    format!("http://{}/api/", addr)
}

/// Frames received by the fake realtime service, plus "close" markers
#[derive(Default)]
pub struct RealtimeService {
    pub frames: Mutex<Vec<String>>,
    pub connections: Mutex<usize>,
}

impl RealtimeService {
    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().unwrap().clone()
    }

    pub fn connections(&self) -> usize {
        *self.connections.lock().unwrap()
    }

    /// Poll until `n` frames were recorded
    pub async fn wait_for_frames(&self, n: usize, timeout: Duration) -> Vec<String> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let frames = self.frames();
            if frames.len() >= n || tokio::time::Instant::now() >= deadline {
                return frames;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

async fn realtime(
    ws: WebSocketUpgrade,
    State(service): State<Arc<RealtimeService>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(mut socket: WebSocket, service: Arc<RealtimeService>) {
    *service.connections.lock().unwrap() += 1;

    while let Some(Ok(message)) = socket.recv().await {
        match message {
            Message::Text(text) => {
                service.frames.lock().unwrap().push(text.clone());

                let parsed: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
                if parsed["type"] == "register" {
                    let notification = json!({
                        "type": "notification",
                        "data": {
                            "notify_msg": "Someone replied to your submission",
                            "notify_timestamp": "2024-03-01T10:00:00",
                            "notify_type": "reply",
                            "notify_read": false,
                            "notify_delivered": false
                        }
                    });
                    if socket
                        .send(Message::Text(notification.to_string()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            }
            Message::Close(_) => {
                service.frames.lock().unwrap().push("close".to_string());
                break;
            }
            _ => {}
        }
    }
}

/// Start a fake realtime service; returns its ws:// URL
pub async fn start_realtime_service(service: Arc<RealtimeService>) -> String {
    let app = Router::new().route("/", get(realtime)).with_state(service);
    let addr = serve(app).await;
    format!("ws://{}/", addr)
}

/// A local port with nothing listening on it
pub fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
