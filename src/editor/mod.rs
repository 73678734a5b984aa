//! Submission editor support
//!
//! - `mention`: `[[term]]` marker scanning and link substitution
//! - `linker`: the per-editor suggestion cycle built on top of it

pub mod linker;
pub mod mention;

pub use linker::{FetchOutcome, MentionLinker, PendingFetch, SuggestionPanel, TextChange};
pub use mention::{
    count_mentions, replace_first_mention, scan_mentions, LinkBuilder, MentionScan, MENTION_HINT,
};
