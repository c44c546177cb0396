//! Backend-agnostic types for `websift`.
//!
//! Nothing in here performs IO: the HTTP-backed gateway lives in `websift-local`, and the MCP
//! surface lives in the `websift` binary.

use serde::Serialize;

pub mod validate;

pub use validate::{validate_search_args, ValidationError, Violation};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid parameters: {0}")]
    InvalidParams(#[from] ValidationError),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("{0}")]
    Upstream(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub const DEFAULT_NUM_RESULTS: u8 = 5;
pub const MIN_NUM_RESULTS: u8 = 1;
pub const MAX_NUM_RESULTS: u8 = 10;

/// Bias applied to the upstream search instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Focus {
    #[default]
    Technical,
    Development,
    General,
}

impl Focus {
    pub const ALL: [Focus; 3] = [Focus::Technical, Focus::Development, Focus::General];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Development => "development",
            Self::General => "general",
        }
    }

    /// Exact, case-sensitive match against the wire literals.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == s)
    }

    /// Whether the prompt should ask for code-level accuracy.
    pub fn is_technical(self) -> bool {
        matches!(self, Self::Technical | Self::Development)
    }
}

impl std::fmt::Display for Focus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated search request.
///
/// Only [`validate_search_args`] can build one, so every instance satisfies the range and
/// non-empty constraints; there are no setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    query: String,
    num_results: u8,
    focus: Focus,
}

impl SearchRequest {
    pub(crate) fn new_unchecked(query: String, num_results: u8, focus: Focus) -> Self {
        Self {
            query,
            num_results,
            focus,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn num_results(&self) -> u8 {
        self.num_results
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
    pub domain: String,
}

/// Terminal value of every search: either a result list or an error message, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchOutcome {
    success: bool,
    results: Vec<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_results: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl SearchOutcome {
    pub fn success(results: Vec<SearchResult>) -> Self {
        Self {
            success: true,
            total_results: Some(results.len()),
            results,
            error: None,
        }
    }

    /// An empty message becomes `"Unknown error"` so failures always carry text.
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            message
        };
        Self {
            success: false,
            results: Vec::new(),
            total_results: None,
            error: Some(message),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn total_results(&self) -> Option<usize> {
        self.total_results
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl From<Error> for SearchOutcome {
    fn from(e: Error) -> Self {
        Self::failure(e.to_string())
    }
}

/// Turns a validated request into an outcome. Implementations must not panic or return
/// early with an error: every failure is folded into [`SearchOutcome::failure`].
#[async_trait::async_trait]
pub trait SearchGateway: Send + Sync {
    fn name(&self) -> &'static str;
    async fn search(&self, req: &SearchRequest) -> SearchOutcome;
}
