//! Retrieval query value object and cache key derivation

use crate::core::agent::AgentId;
use crate::core::request::AdvisoryRequest;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Default number of chunks requested from the retrieval service
pub const DEFAULT_LIMIT: u8 = 5;
/// Upper bound accepted by the retrieval service
pub const MAX_LIMIT: u8 = 20;

/// A normalized retrieval query (Value Object)
///
/// All text fields are normalized on construction, so two logically
/// identical queries compare equal and share a [`cache_key`](Self::cache_key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextQuery {
    text: String,
    domain: String,
    sector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    jurisdictions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    document_type: Option<String>,
    limit: u8,
}

impl ContextQuery {
    pub fn new(text: &str, domain: &str, sector: &str) -> Self {
        Self {
            text: normalize_text(text),
            domain: normalize_text(domain),
            sector: normalize_text(sector),
            region: None,
            jurisdictions: Vec::new(),
            document_type: None,
            limit: DEFAULT_LIMIT,
        }
    }

    /// Build the query an agent issues for a request, scoped to the
    /// agent's retrieval domain.
    pub fn for_agent(agent: AgentId, request: &AdvisoryRequest) -> Self {
        let metadata = request.metadata();
        let mut query = Self::new(
            request.prompt(),
            agent.retrieval_domain().as_str(),
            &metadata.sector,
        )
        .with_jurisdictions(&metadata.jurisdictions);

        if let Some(region) = &metadata.region {
            query = query.with_region(region);
        }
        if let Some(document_type) = &metadata.document_type {
            query = query.with_document_type(document_type);
        }
        query
    }

    pub fn with_region(mut self, region: &str) -> Self {
        let region = normalize_text(region);
        self.region = (!region.is_empty()).then_some(region);
        self
    }

    /// Set the jurisdiction filter. Order and duplicates are irrelevant.
    pub fn with_jurisdictions<I, S>(mut self, jurisdictions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = jurisdictions
            .into_iter()
            .map(|j| normalize_text(j.as_ref()))
            .filter(|j| !j.is_empty())
            .collect();
        normalized.sort();
        normalized.dedup();
        self.jurisdictions = normalized;
        self
    }

    pub fn with_document_type(mut self, document_type: &str) -> Self {
        let document_type = normalize_text(document_type);
        self.document_type = (!document_type.is_empty()).then_some(document_type);
        self
    }

    /// Set the chunk limit, clamped to `1..=MAX_LIMIT`
    pub fn with_limit(mut self, limit: u8) -> Self {
        self.limit = limit.clamp(1, MAX_LIMIT);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn sector(&self) -> &str {
        &self.sector
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn jurisdictions(&self) -> &[String] {
        &self.jurisdictions
    }

    pub fn document_type(&self) -> Option<&str> {
        self.document_type.as_deref()
    }

    pub fn limit(&self) -> u8 {
        self.limit
    }

    /// Stable fingerprint of this query (hex-encoded SHA-256).
    ///
    /// Fields are length-prefixed before hashing so that no two distinct
    /// field combinations produce the same canonical input.
    pub fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        let mut field = |name: &str, value: &str| {
            hasher.update(name.as_bytes());
            hasher.update((value.len() as u64).to_be_bytes());
            hasher.update(value.as_bytes());
        };

        field("q", &self.text);
        field("d", &self.domain);
        field("s", &self.sector);
        field("r", self.region.as_deref().unwrap_or(""));
        field("j#", &self.jurisdictions.len().to_string());
        for jurisdiction in &self.jurisdictions {
            field("j", jurisdiction);
        }
        field("t", self.document_type.as_deref().unwrap_or(""));
        field("l", &self.limit.to_string());

        hex::encode(hasher.finalize())
    }
}

/// Lowercase, trim and collapse internal whitespace runs to one space
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::request::DomainMetadata;

    fn base() -> ContextQuery {
        ContextQuery::new("What market size for vertical SaaS?", "finance", "healthtech")
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Hello \n\t World  "), "hello world");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_key_ignores_case_and_whitespace() {
        let a = base();
        let b = ContextQuery::new(
            "  what MARKET size   for vertical\nSaaS?  ",
            "Finance",
            " HealthTech",
        );
        assert_eq!(a, b);
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_key_ignores_jurisdiction_order() {
        let a = base().with_jurisdictions(["hipaa", "gdpr"]);
        let b = base().with_jurisdictions(["GDPR", "hipaa", "gdpr"]);
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_key_distinguishes_filters() {
        let plain = base();
        assert_ne!(plain.cache_key(), base().with_region("eu").cache_key());
        assert_ne!(plain.cache_key(), base().with_limit(10).cache_key());
        assert_ne!(
            plain.cache_key(),
            ContextQuery::new("What market size for vertical SaaS?", "legal", "healthtech")
                .cache_key()
        );
        assert_ne!(
            base().with_jurisdictions(["gdpr"]).cache_key(),
            base().with_document_type("gdpr").cache_key()
        );
    }

    #[test]
    fn test_key_is_hex_sha256() {
        let key = base().cache_key();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_limit_clamped() {
        assert_eq!(base().with_limit(0).limit(), 1);
        assert_eq!(base().with_limit(50).limit(), MAX_LIMIT);
        assert_eq!(base().limit(), DEFAULT_LIMIT);
    }

    #[test]
    fn test_for_agent_uses_retrieval_domain() {
        let request = AdvisoryRequest::new(
            "Do we need a DPO?",
            DomainMetadata::new("legal", "healthtech")
                .with_region("EU")
                .with_jurisdictions(["HIPAA", "gdpr"]),
        );

        let legal = ContextQuery::for_agent(AgentId::Legal, &request);
        assert_eq!(legal.domain(), "legal");
        assert_eq!(legal.region(), Some("eu"));
        assert_eq!(legal.jurisdictions(), &["gdpr".to_string(), "hipaa".to_string()]);

        let investor = ContextQuery::for_agent(AgentId::Investor, &request);
        assert_eq!(investor.domain(), "finance");
        assert_ne!(legal.cache_key(), investor.cache_key());
    }

    #[test]
    fn test_key_keeps_jurisdiction_boundaries() {
        let joined = base().with_jurisdictions(["eu,us".to_string()]);
        let split = base().with_jurisdictions(["eu".to_string(), "us".to_string()]);
        assert_ne!(joined.cache_key(), split.cache_key());
    }
}
