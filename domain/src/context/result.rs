//! Retrieval result types

use serde::{Deserialize, Serialize};

/// Attribution for one retrieved chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub id: String,
    pub filename: String,
    /// Relevance score in `[0, 1]`
    pub score: f64,
    pub chunk_index: u32,
}

impl SourceRef {
    pub fn new(
        id: impl Into<String>,
        filename: impl Into<String>,
        score: f64,
        chunk_index: u32,
    ) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            score: if score.is_finite() {
                score.clamp(0.0, 1.0)
            } else {
                0.0
            },
            chunk_index,
        }
    }

    /// Short label used in agent source lists, e.g. `gdpr-guide.pdf#3`
    pub fn label(&self) -> String {
        format!("{}#{}", self.filename, self.chunk_index)
    }
}

/// Ranked context returned by the retrieval service
///
/// Cached by value: the cache stores its own clone and hands out clones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextResult {
    pub text: String,
    pub sources: Vec<SourceRef>,
    pub chunks_found: usize,
    /// Set when the retrieval path reported a problem or was unreachable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ContextResult {
    pub fn new(text: impl Into<String>, sources: Vec<SourceRef>) -> Self {
        let chunks_found = sources.len();
        Self {
            text: text.into(),
            sources,
            chunks_found,
            error: None,
        }
    }

    /// Empty result marked as unavailable
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks_found == 0 || self.text.trim().is_empty()
    }

    /// Only clean results with at least one chunk are written to the cache
    pub fn is_cacheable(&self) -> bool {
        self.chunks_found > 0 && self.error.is_none()
    }

    pub fn source_labels(&self) -> Vec<String> {
        self.sources.iter().map(SourceRef::label).collect()
    }
}

/// Where a piece of context came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextOrigin {
    /// Served from the fresh cache tier
    FreshCache,
    /// Fetched from the retrieval service
    Live,
    /// Retrieval failed or was short-circuited; served from the stale tier
    StaleCache,
    /// Nothing available; the agent proceeds without grounding
    Unavailable,
}

impl ContextOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextOrigin::FreshCache => "fresh_cache",
            ContextOrigin::Live => "live",
            ContextOrigin::StaleCache => "stale_cache",
            ContextOrigin::Unavailable => "unavailable",
        }
    }

    /// True when context quality was reduced by a dependency problem
    pub fn is_degraded(&self) -> bool {
        matches!(self, ContextOrigin::StaleCache | ContextOrigin::Unavailable)
    }
}
