//! Retrieval service adapter.
//!
//! [`HttpRetrievalClient`] implements the
//! [`RetrievalPort`](council_application::RetrievalPort) against the RAG
//! service's `POST /rag/query` endpoint.

mod http_client;
mod wire;

pub use http_client::HttpRetrievalClient;
