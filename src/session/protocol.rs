//! Realtime wire format
//!
//! All frames are JSON text tagged by `type`:
//!
//! ```text
//! client → service   {"type":"register","token":"..."}
//!                    {"type":"logout","token":"..."}
//! service → client   {"type":"notification","data":{...}}
//! ```

use crate::error::Result;
use crate::types::Notification;
use serde::{Deserialize, Serialize};

/// Frames sent by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Register { token: String },
    Logout { token: String },
}

impl OutboundMessage {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Register { .. } => "register",
            OutboundMessage::Logout { .. } => "logout",
        }
    }
}

/// Frames pushed by the service
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    Notification { data: Notification },
}

/// Parse an inbound text frame; `None` for frames this client does not model
pub fn parse_inbound(text: &str) -> Option<InboundMessage> {
    serde_json::from_str(text).ok()
}
