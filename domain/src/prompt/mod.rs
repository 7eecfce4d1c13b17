//! Prompt domain
//!
//! Templates for the draft, self-critique, cross-critique and synthesis steps.

mod template;

pub use template::PromptTemplate;
