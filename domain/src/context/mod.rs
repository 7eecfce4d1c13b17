//! Retrieval context domain
//!
//! - [`query::ContextQuery`]: normalized retrieval input, doubling as the cache key
//! - [`result::ContextResult`]: ranked chunks with source attribution
//! - [`result::ContextOrigin`]: which tier or path produced a result

pub mod query;
pub mod result;

pub use query::{ContextQuery, normalize_text};
pub use result::{ContextOrigin, ContextResult, SourceRef};
