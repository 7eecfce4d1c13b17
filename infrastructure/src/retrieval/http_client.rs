//! HTTP client for the RAG service

use super::wire::{QueryRequest, QueryResponse};
use async_trait::async_trait;
use council_application::{RetrievalError, RetrievalPort};
use council_domain::{ContextQuery, ContextResult};
use std::time::Duration;
use tracing::debug;

/// Header carrying the service API key
const API_KEY_HEADER: &str = "X-API-Key";

pub struct HttpRetrievalClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpRetrievalClient {
    /// Create a client for the service at `base_url`.
    ///
    /// `timeout` bounds each request at the transport level.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RetrievalError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(RetrievalError::NotConfigured(
                "retrieval.base_url is empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RetrievalError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/rag/query", base_url),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RetrievalPort for HttpRetrievalClient {
    async fn query(&self, query: &ContextQuery) -> Result<ContextResult, RetrievalError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&QueryRequest::from(query));
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RetrievalError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::Decode(e.to_string()))?;

        debug!(
            "Retrieval {}/{}: {} chunks",
            query.domain(),
            query.sector(),
            body.chunks_found
        );
        Ok(body.into())
    }
}
