//! Mention marker scanning and link substitution
//!
//! A mention marker is `[[term]]` where `term` is one or more characters
//! other than `]`. The exclusion is done by character class rather than a
//! lazy quantifier so a match can never span two marker pairs. `[[]]` is not
//! a marker.

use crate::types::MentionQuery;
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

/// Static hint shown whenever no single marker is present
pub const MENTION_HINT: &str = "Pro-tip: Type [[search terms]] followed by a space to auto-link a submission that matches your search terms.";

/// Path segment for submission links
pub const SUBMISSIONS_PATH: &str = "submissions";

static MENTION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\]]+)\]\]").expect("Valid mention regex"));

/// Result of scanning editor text for markers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MentionScan {
    /// No marker in the text
    None,

    /// Exactly one marker
    Single(MentionQuery),

    /// Two or more markers (count attached)
    Multiple(usize),
}

impl MentionScan {
    /// The query when exactly one marker exists
    pub fn single(&self) -> Option<&MentionQuery> {
        match self {
            MentionScan::Single(query) => Some(query),
            _ => None,
        }
    }
}

/// Scan `text` for all non-overlapping mention markers
pub fn scan_mentions(text: &str) -> MentionScan {
    let mut captures = MENTION_PATTERN.captures_iter(text);

    let first = match captures.next() {
        Some(caps) => caps,
        None => return MentionScan::None,
    };

    let rest = captures.count();
    if rest > 0 {
        return MentionScan::Multiple(rest + 1);
    }

    // Group 1 always participates in a match
    let (whole, term) = match (first.get(0), first.get(1)) {
        (Some(whole), Some(term)) => (whole, term),
        _ => return MentionScan::None,
    };

    MentionScan::Single(MentionQuery {
        term: term.as_str().to_string(),
        span: whole.range(),
    })
}

/// Count the mention markers in `text`
pub fn count_mentions(text: &str) -> usize {
    MENTION_PATTERN.find_iter(text).count()
}

/// Replace the first marker in `text` with `replacement`
///
/// Returns `None` when `text` holds no marker. The replacement is inserted
/// literally (`$` is not expanded).
pub fn replace_first_mention(text: &str, replacement: &str) -> Option<String> {
    if !MENTION_PATTERN.is_match(text) {
        return None;
    }
    Some(
        MENTION_PATTERN
            .replacen(text, 1, NoExpand(replacement))
            .into_owned(),
    )
}

/// Builds markdown links to submissions on the public website
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBuilder {
    website_url: String,
}

impl LinkBuilder {
    pub fn new(website_url: impl Into<String>) -> Self {
        let website_url = website_url.into();
        Self {
            website_url: website_url.trim_end_matches('/').to_string(),
        }
    }

    /// Canonical URL of a submission
    pub fn submission_url(&self, id: &str) -> String {
        format!("{}/{}/{}", self.website_url, SUBMISSIONS_PATH, id)
    }

    /// Markdown link `[label](<website>/submissions/<id>)`
    pub fn link(&self, id: &str, label: &str) -> String {
        format!("[{}]({})", label, self.submission_url(id))
    }
}
