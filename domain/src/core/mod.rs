//! Core domain concepts shared across all subdomains.
//!
//! - [`agent::AgentId`]: the fixed set of advisory agents
//! - [`request::AdvisoryRequest`]: a validated question with its domain filters
//! - [`error::DomainError`]: domain-level errors

pub mod agent;
pub mod error;
pub mod request;
