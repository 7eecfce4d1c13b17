//! RAG service request and response bodies

use council_domain::{ContextQuery, ContextResult, SourceRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(super) struct QueryRequest<'a> {
    pub query: &'a str,
    pub domain: &'a str,
    pub sector: &'a str,
    pub limit: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jurisdictions: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<&'a str>,
}

impl<'a> From<&'a ContextQuery> for QueryRequest<'a> {
    fn from(query: &'a ContextQuery) -> Self {
        Self {
            query: query.text(),
            domain: query.domain(),
            sector: query.sector(),
            limit: query.limit(),
            region: query.region(),
            jurisdictions: (!query.jurisdictions().is_empty()).then(|| query.jurisdictions()),
            document_type: query.document_type(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SourceResponse {
    pub file_id: String,
    pub filename: String,
    pub score: f64,
    #[serde(default)]
    pub chunk_index: u32,
}

#[derive(Debug, Deserialize)]
pub(super) struct QueryResponse {
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub sources: Vec<SourceResponse>,
    #[serde(default)]
    pub chunks_found: usize,
    #[serde(default)]
    pub error: Option<String>,
}

impl From<QueryResponse> for ContextResult {
    fn from(response: QueryResponse) -> Self {
        let sources = response
            .sources
            .into_iter()
            .map(|s| SourceRef::new(s.file_id, s.filename, s.score, s.chunk_index))
            .collect();
        ContextResult {
            text: response.context,
            sources,
            chunks_found: response.chunks_found,
            error: response.error.filter(|e| !e.trim().is_empty()),
        }
    }
}
