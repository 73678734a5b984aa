//! Core data types shared by the editor and the session socket

use serde::{Deserialize, Serialize};
use std::fmt;

/// A candidate entity returned by the autocomplete endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Opaque submission identifier
    pub id: String,

    /// Display string (the submission title)
    pub label: String,

    /// Canonical submission URL, when the backend provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Suggestion {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            url: None,
        }
    }
}

/// Body of a successful autocomplete response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestionResponse {
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

/// An unresolved `[[term]]` marker found in editor text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionQuery {
    /// Inner term, without brackets
    pub term: String,

    /// Byte range of the whole marker (brackets included) in the source text
    pub span: std::ops::Range<usize>,
}

/// Authentication state as observed by the surrounding application
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub logged_in: bool,

    /// Primary auth token (the `token` cookie)
    pub token: Option<String>,
}

impl AuthState {
    pub fn logged_in(token: impl Into<String>) -> Self {
        Self {
            logged_in: true,
            token: Some(token.into()),
        }
    }

    pub fn logged_out() -> Self {
        Self::default()
    }

    /// Token usable for opening a session, if any
    ///
    /// Blank tokens count as absent; others are returned exactly as given.
    pub fn usable_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Lifecycle state of the realtime session connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Closed => "closed",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
        };
        write!(f, "{}", s)
    }
}

/// Notification pushed by the realtime service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub notify_msg: String,

    /// Timestamp as sent by the service (not normalized)
    #[serde(default)]
    pub notify_timestamp: serde_json::Value,

    #[serde(default)]
    pub notify_type: Option<String>,

    #[serde(default)]
    pub notify_read: bool,

    #[serde(default)]
    pub notify_delivered: bool,
}
