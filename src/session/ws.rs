//! WebSocket connector built on tokio-tungstenite

use crate::error::Result;
use crate::session::transport::{Connector, EventSink, TransportEvent, TransportHandle};
use async_trait::async_trait;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connector for `ws://` and `wss://` endpoints
#[derive(Debug, Default, Clone)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

/// Write half of a WebSocket plus its reader task
pub struct WsHandle {
    sink: SplitSink<WsStream, Message>,
    reader: JoinHandle<()>,
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str, events: EventSink) -> Result<Box<dyn TransportHandle>> {
        debug!("Connecting to realtime endpoint {}", url);
        let (socket, _response) = tokio_tungstenite::connect_async(url).await?;
        debug!("Realtime connection established");

        let (sink, mut stream) = socket.split();

        let reader = tokio::spawn(async move {
            loop {
                let event = match stream.next().await {
                    Some(Ok(Message::Text(text))) => TransportEvent::Text(text),
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (Some(u16::from(f.code)), f.reason.into_owned()))
                            .unwrap_or((None, String::new()));
                        TransportEvent::Closed { code, reason }
                    }
                    // Ping/pong/binary frames carry nothing for this client
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => TransportEvent::Error(e.to_string()),
                    None => TransportEvent::Closed {
                        code: None,
                        reason: "stream ended".to_string(),
                    },
                };

                let terminal = event.is_terminal();
                events(event);
                if terminal {
                    break;
                }
            }
        });

        Ok(Box::new(WsHandle { sink, reader }))
    }
}

#[async_trait]
impl TransportHandle for WsHandle {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.sink.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        // Sends the close frame and flushes
        self.sink.close().await?;
        Ok(())
    }
}

impl Drop for WsHandle {
    fn drop(&mut self) {
        if !self.reader.is_finished() {
            self.reader.abort();
        }
    }
}
