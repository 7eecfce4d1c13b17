//! Advisory request value object

use super::agent::AgentId;
use super::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Filters describing the business context of a question
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainMetadata {
    /// Primary domain of the question (e.g. "legal", "finance")
    pub domain: String,
    /// Industry sector (e.g. "healthtech", "saas")
    pub sector: String,
    /// Geographic region filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Regulatory frameworks of interest
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub jurisdictions: Vec<String>,
    /// Preferred document type for retrieval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
}

impl DomainMetadata {
    pub fn new(domain: impl Into<String>, sector: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            sector: sector.into(),
            ..Self::default()
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_jurisdictions<I, S>(mut self, jurisdictions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.jurisdictions = jurisdictions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_document_type(mut self, document_type: impl Into<String>) -> Self {
        self.document_type = Some(document_type.into());
        self
    }
}

/// Reference to a user document attached to a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: String,
    pub filename: String,
}

impl DocumentRef {
    pub fn new(id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
        }
    }
}

/// A question submitted to one or more advisory agents (Value Object)
///
/// Built once by the caller and never mutated by the core. Every agent
/// invocation works against its own clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryRequest {
    prompt: String,
    agents: BTreeSet<AgentId>,
    metadata: DomainMetadata,
    #[serde(default)]
    attachments: Vec<DocumentRef>,
}

impl AdvisoryRequest {
    pub fn new(prompt: impl Into<String>, metadata: DomainMetadata) -> Self {
        Self {
            prompt: prompt.into(),
            agents: BTreeSet::new(),
            metadata,
            attachments: Vec::new(),
        }
    }

    pub fn with_agents(mut self, agents: impl IntoIterator<Item = AgentId>) -> Self {
        self.agents.extend(agents);
        self
    }

    pub fn with_attachment(mut self, attachment: DocumentRef) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn agents(&self) -> &BTreeSet<AgentId> {
        &self.agents
    }

    pub fn metadata(&self) -> &DomainMetadata {
        &self.metadata
    }

    pub fn attachments(&self) -> &[DocumentRef] {
        &self.attachments
    }

    /// Reject malformed requests before any external call is made.
    ///
    /// The agent set is not checked here; a council run that names no
    /// agents falls back to it.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.prompt.trim().is_empty() {
            return Err(DomainError::EmptyPrompt);
        }
        if self.metadata.sector.trim().is_empty() {
            return Err(DomainError::MissingField("sector"));
        }
        Ok(())
    }
}
