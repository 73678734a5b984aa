//! Mention linker for the submission editor
//!
//! Tracks the editor text and drives one mention-resolution cycle at a time:
//!
//! ```text
//! text change ──► scan ──► single [[term]] ──► fetch (debounced) ──► suggestions
//!                   │                                                   │
//!                   └─ zero / many markers ──► hint          selection ─┴─► link substitution
//! ```
//!
//! Fetches are split into [`MentionLinker::begin_fetch`] and
//! [`MentionLinker::finish_fetch`] so the caller may await the network
//! without holding the linker. Every issued fetch gets a sequence number;
//! a completion is applied only when it carries the latest one, so a slow
//! response can never overwrite a newer list.

use crate::api::SuggestionSource;
use crate::editor::mention::{replace_first_mention, scan_mentions, LinkBuilder, MentionScan};
use crate::error::Result;
use crate::types::Suggestion;
use tracing::{debug, warn};

/// What the editor shows under the text field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionPanel {
    /// The static mention hint
    Hint,

    /// Suggestions for the current marker (possibly empty)
    Suggestions(Vec<Suggestion>),
}

impl SuggestionPanel {
    pub fn suggestions(&self) -> &[Suggestion] {
        match self {
            SuggestionPanel::Hint => &[],
            SuggestionPanel::Suggestions(list) => list,
        }
    }

    pub fn is_hint(&self) -> bool {
        matches!(self, SuggestionPanel::Hint)
    }
}

/// A fetch issued by the linker and not yet completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFetch {
    pub seq: u64,
    pub term: String,
    pub topn: usize,
}

impl PendingFetch {
    /// Perform the request against `source`
    pub async fn run(self, source: &dyn SuggestionSource) -> FetchOutcome {
        let result = source.autocomplete(&self.term, Some(self.topn)).await;
        FetchOutcome {
            seq: self.seq,
            term: self.term,
            result,
        }
    }
}

/// Completion of a [`PendingFetch`]
#[derive(Debug)]
pub struct FetchOutcome {
    pub seq: u64,
    pub term: String,
    pub result: Result<Vec<Suggestion>>,
}

/// Effect of a text change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextChange {
    /// A single marker was found and a fetch must be run
    Fetch(PendingFetch),

    /// A single marker was found but its term was already fetched or is in flight
    Debounced,

    /// Zero or several markers; the hint is shown
    Hint,
}

/// Editor-side state for mention auto-linking
#[derive(Debug, Clone)]
pub struct MentionLinker {
    text: String,
    char_count: usize,
    panel: SuggestionPanel,
    links: LinkBuilder,
    topn: usize,

    /// Term of the last successful fetch
    last_fetched_term: Option<String>,

    /// Term of the outstanding fetch, if any
    in_flight: Option<String>,

    /// Sequence of the latest issued fetch (or invalidation)
    generation: u64,

    unsaved: bool,
}

impl MentionLinker {
    pub fn new(links: LinkBuilder, topn: usize) -> Self {
        Self::with_text(links, topn, String::new())
    }

    /// Start from existing text (e.g. editing a saved submission)
    pub fn with_text(links: LinkBuilder, topn: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            char_count: text.chars().count(),
            text,
            panel: SuggestionPanel::Hint,
            links,
            topn,
            last_fetched_term: None,
            in_flight: None,
            generation: 0,
            unsaved: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn char_count(&self) -> usize {
        self.char_count
    }

    pub fn panel(&self) -> &SuggestionPanel {
        &self.panel
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Clear the unsaved flag after a successful save
    pub fn mark_saved(&mut self) {
        self.unsaved = false;
    }

    pub fn last_fetched_term(&self) -> Option<&str> {
        self.last_fetched_term.as_deref()
    }

    /// Record new editor text and decide whether suggestions are needed
    pub fn text_changed(&mut self, text: impl Into<String>) -> TextChange {
        self.set_text(text.into());
        self.unsaved = true;

        match scan_mentions(&self.text) {
            MentionScan::Single(query) => match self.begin_fetch(&query.term) {
                Some(pending) => TextChange::Fetch(pending),
                None => TextChange::Debounced,
            },
            MentionScan::None | MentionScan::Multiple(_) => {
                self.invalidate();
                self.panel = SuggestionPanel::Hint;
                TextChange::Hint
            }
        }
    }

    /// Issue a fetch for `term` unless it repeats the last successful one
    /// or the one in flight
    pub fn begin_fetch(&mut self, term: &str) -> Option<PendingFetch> {
        if self.last_fetched_term.as_deref() == Some(term) {
            debug!("Skipping fetch, term already fetched: {:?}", term);
            return None;
        }
        if self.in_flight.as_deref() == Some(term) {
            debug!("Skipping fetch, term already in flight: {:?}", term);
            return None;
        }

        self.generation += 1;
        self.in_flight = Some(term.to_string());

        Some(PendingFetch {
            seq: self.generation,
            term: term.to_string(),
            topn: self.topn,
        })
    }

    /// Apply a completed fetch; returns false when the outcome was stale
    pub fn finish_fetch(&mut self, outcome: FetchOutcome) -> bool {
        if outcome.seq != self.generation {
            debug!(
                "Dropping stale suggestions for {:?} (seq {} < {})",
                outcome.term, outcome.seq, self.generation
            );
            return false;
        }

        self.in_flight = None;

        match outcome.result {
            Ok(suggestions) => {
                debug!(
                    "Applying {} suggestions for {:?}",
                    suggestions.len(),
                    outcome.term
                );
                self.panel = SuggestionPanel::Suggestions(suggestions);
                self.last_fetched_term = Some(outcome.term);
            }
            Err(e) => {
                warn!("Suggestion fetch for {:?} failed: {}", outcome.term, e);
                self.panel = SuggestionPanel::Hint;
            }
        }

        true
    }

    /// Fetch suggestions for `term` in one step; returns whether a request was issued
    pub async fn fetch_suggestions(&mut self, term: &str, source: &dyn SuggestionSource) -> bool {
        match self.begin_fetch(term) {
            Some(pending) => {
                let outcome = pending.run(source).await;
                self.finish_fetch(outcome);
                true
            }
            None => false,
        }
    }

    /// Record new text and, if needed, fetch and apply suggestions in one step
    pub async fn on_text_changed(
        &mut self,
        text: impl Into<String>,
        source: &dyn SuggestionSource,
    ) -> &SuggestionPanel {
        if let TextChange::Fetch(pending) = self.text_changed(text) {
            let outcome = pending.run(source).await;
            self.finish_fetch(outcome);
        }
        &self.panel
    }

    /// Replace the marker with a link to the chosen submission
    pub fn apply_suggestion(&mut self, chosen_id: &str, chosen_label: &str) -> &str {
        let replacement = self.links.link(chosen_id, chosen_label);

        match replace_first_mention(&self.text, &replacement) {
            Some(new_text) => self.set_text(new_text),
            None => debug!("No mention marker left to replace"),
        }

        self.invalidate();
        self.panel = SuggestionPanel::Hint;
        self.last_fetched_term = None;
        self.unsaved = true;

        &self.text
    }

    /// Apply the suggestion at `index` of the current panel
    pub fn apply_index(&mut self, index: usize) -> Option<&str> {
        let chosen = self.panel.suggestions().get(index).cloned()?;
        Some(self.apply_suggestion(&chosen.id, &chosen.label))
    }

    fn set_text(&mut self, text: String) {
        self.char_count = text.chars().count();
        self.text = text;
    }

    /// Make any outstanding fetch stale
    fn invalidate(&mut self) {
        self.generation += 1;
        self.in_flight = None;
    }
}
