//! Autocomplete client for the submission search backend
//!
//! Wraps `GET <base>/search/autocomplete?query=<term>&topn=<n>`. The backend
//! owns ranking; this side only shapes the request and classifies the reply.

use crate::config::ClientConfig;
use crate::error::{Result, TextdataError};
use crate::types::{Suggestion, SuggestionResponse};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::RwLock;
use tracing::{debug, warn};

/// Autocomplete endpoint, relative to the API base URL
pub const AUTOCOMPLETE_ENDPOINT: &str = "search/autocomplete";

/// Source of mention suggestions
///
/// Any status other than 200 is reported as `TextdataError::Api`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SuggestionSource: Send + Sync {
    /// Fetch suggestions for `term`; `topn` is omitted from the request when `None`
    async fn autocomplete(&self, term: &str, topn: Option<usize>) -> Result<Vec<Suggestion>>;
}

/// Error body returned by the backend on failure
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// reqwest-backed suggestion source
pub struct HttpSuggestionClient {
    client: reqwest::Client,
    base_url: String,

    /// Primary auth token sent verbatim as the `Authorization` header
    token: RwLock<Option<String>>,
}

impl HttpSuggestionClient {
    /// Create a client from configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self::with_client(client, &config.api_base_url))
    }

    /// Create a client around an existing reqwest client
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Self {
            client,
            base_url,
            token: RwLock::new(None),
        }
    }

    /// Set or clear the primary auth token
    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn current_token(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl SuggestionSource for HttpSuggestionClient {
    async fn autocomplete(&self, term: &str, topn: Option<usize>) -> Result<Vec<Suggestion>> {
        let url = format!("{}{}", self.base_url, AUTOCOMPLETE_ENDPOINT);
        debug!("Requesting suggestions for {:?} (topn={:?})", term, topn);

        let mut request = self.client.get(&url).query(&[("query", term)]);
        if let Some(n) = topn {
            request = request.query(&[("topn", n)]);
        }
        if let Some(token) = self.current_token() {
            request = request.header(reqwest::header::AUTHORIZATION, token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status != StatusCode::OK {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.message)
                .unwrap_or_default();
            warn!("Autocomplete failed with status {}: {}", status, message);
            return Err(TextdataError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: SuggestionResponse = response.json().await?;
        debug!("Received {} suggestions", body.suggestions.len());
        Ok(body.suggestions)
    }
}
