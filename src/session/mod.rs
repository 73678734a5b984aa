//! Realtime session socket
//!
//! Provides:
//! - A single-owner actor managing one WebSocket per logged-in user
//! - The register/logout wire protocol and inbound notifications
//! - The cookie-like token jar the session token is derived from

pub mod actor;
pub mod protocol;
pub mod tokens;
pub mod transport;
pub mod ws;

pub use actor::{SessionConfig, SessionMessage, SessionSnapshot, SessionSocket, SessionSocketActor};
pub use protocol::{InboundMessage, OutboundMessage};
pub use tokens::{
    CookieEntry, FileTokenStore, MemoryTokenStore, SessionTokens, TokenStore, PRIMARY_TOKEN_KEY,
    SESSION_TOKEN_KEY,
};
pub use transport::{Connector, EventSink, TransportEvent, TransportHandle};
pub use ws::WsConnector;
