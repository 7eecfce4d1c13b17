//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod advisory;
pub mod run_agent;
pub mod run_council;

#[cfg(test)]
pub(crate) mod test_support;
