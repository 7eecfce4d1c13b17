//! Retrieval port
//!
//! Interface to the external RAG service that returns ranked document
//! chunks for a [`ContextQuery`].

use async_trait::async_trait;
use council_domain::{ContextQuery, ContextResult};
use thiserror::Error;

/// Errors that can occur while querying the retrieval service
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RetrievalError {
    #[error("Retrieval service not configured: {0}")]
    NotConfigured(String),

    #[error("Connection error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    /// The service answered but flagged the result as failed
    #[error("Retrieval service reported: {0}")]
    Upstream(String),
}

impl RetrievalError {
    /// The service rejected this one request (4xx other than 408/429);
    /// not counted against its circuit
    pub fn is_client_error(&self) -> bool {
        matches!(self, RetrievalError::Status { status, .. }
            if (400..500).contains(status) && *status != 408 && *status != 429)
    }
}

/// Retrieval dependency
///
/// A response carrying an error marker is returned as `Ok` with
/// [`ContextResult::error`] set; callers decide how to treat it.
#[async_trait]
pub trait RetrievalPort: Send + Sync {
    async fn query(&self, query: &ContextQuery) -> Result<ContextResult, RetrievalError>;
}
