//! Transport seam for the session socket
//!
//! A [`Connector`] opens one duplex text transport and resolves once it is
//! connected. Everything the transport receives afterwards (text frames,
//! close, error) is pushed into the [`EventSink`] handed to `connect`.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Lifecycle and data signals raised by an open transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Inbound text frame
    Text(String),

    /// Peer closed the connection
    Closed { code: Option<u16>, reason: String },

    /// Transport failed
    Error(String),
}

impl TransportEvent {
    /// Close and error both end the transport
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransportEvent::Text(_))
    }
}

/// Callback receiving transport events
pub type EventSink = Arc<dyn Fn(TransportEvent) + Send + Sync>;

/// Write half of an open transport
#[async_trait]
pub trait TransportHandle: Send + Sync {
    /// Send one text frame
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Close the transport
    async fn close(&mut self) -> Result<()>;
}

/// Factory for transports
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a transport to `url`, resolving once connected
    async fn connect(&self, url: &str, events: EventSink) -> Result<Box<dyn TransportHandle>>;
}
