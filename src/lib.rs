//! TextData - Client Core for Community Search and Note Sharing
//!
//! The client-side orchestration shared by the TextData website and browser
//! extension:
//! - Mention auto-linking in the submission editor (`[[term]]` → link)
//! - Header search-bar autocomplete
//! - The realtime session socket (register on login, logout on logout)
//!
//! Search ranking, recommendations and storage live in the backend; this
//! crate only talks to it over HTTP and WebSocket.
//!
//! # Example
//!
//! ```ignore
//! use textdata_core::{ClientConfig, HttpSuggestionClient, LinkBuilder, MentionLinker};
//!
//! #[tokio::main]
//! async fn main() -> textdata_core::Result<()> {
//!     let config = ClientConfig::load()?;
//!     let client = HttpSuggestionClient::new(&config)?;
//!     client.set_token(Some("token".to_string()));
//!
//!     let mut linker = MentionLinker::new(
//!         LinkBuilder::new(&config.website_url),
//!         config.autocomplete_topn,
//!     );
//!     linker.on_text_changed("see [[my not]]", &client).await;
//!     linker.apply_index(0);
//!     println!("{}", linker.text());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod editor;
pub mod error;
pub mod search_bar;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use api::{HttpSuggestionClient, SuggestionSource};
pub use config::{ClientConfig, ReconnectPolicy};
pub use editor::{LinkBuilder, MentionLinker, MentionScan, SuggestionPanel, TextChange};
pub use error::{Result, TextdataError};
pub use search_bar::SearchBarSuggester;
pub use session::{SessionConfig, SessionSocket, SessionTokens, WsConnector};
pub use types::{AuthState, ConnectionState, MentionQuery, Notification, Suggestion};
