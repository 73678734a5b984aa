//! Header search-bar autocomplete
//!
//! Unlike the editor, the search bar has no marker syntax: it asks for
//! suggestions whenever the input ends with a space (a word was completed)
//! and drops them when the input is emptied.

use crate::api::SuggestionSource;
use crate::types::Suggestion;
use tracing::{debug, warn};

/// What a search-bar input change calls for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// Input is empty: drop current suggestions
    Clear,

    /// A word was just completed: request suggestions
    Fetch,

    /// Mid-word: keep current suggestions
    Keep,
}

/// Classify a search-bar input value
pub fn classify_input(input: &str) -> InputAction {
    if input.is_empty() {
        InputAction::Clear
    } else if input.ends_with(' ') {
        InputAction::Fetch
    } else {
        InputAction::Keep
    }
}

/// Suggestion state for the header search bar
#[derive(Debug, Default)]
pub struct SearchBarSuggester {
    suggestions: Vec<Suggestion>,
}

impl SearchBarSuggester {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    /// Labels in display order
    pub fn labels(&self) -> Vec<&str> {
        self.suggestions.iter().map(|s| s.label.as_str()).collect()
    }

    /// React to a new input value
    pub async fn on_input(&mut self, input: &str, source: &dyn SuggestionSource) -> &[Suggestion] {
        match classify_input(input) {
            InputAction::Clear => self.suggestions.clear(),
            InputAction::Keep => {}
            InputAction::Fetch => match source.autocomplete(input, None).await {
                Ok(suggestions) => {
                    debug!("Search bar received {} suggestions", suggestions.len());
                    self.suggestions = suggestions;
                }
                Err(e) => {
                    warn!("Search bar autocomplete failed: {}", e);
                    self.suggestions.clear();
                }
            },
        }
        &self.suggestions
    }

    /// URL of the first suggestion whose label matches the selected option
    pub fn url_for(&self, label: &str) -> Option<&str> {
        self.suggestions
            .iter()
            .find(|s| s.label == label)
            .and_then(|s| s.url.as_deref())
    }
}
