//! HTTP clients for the TextData backend
//!
//! Provides:
//! - Autocomplete suggestions for mentions and the search bar

pub mod suggestions;

pub use suggestions::{HttpSuggestionClient, SuggestionSource, AUTOCOMPLETE_ENDPOINT};
