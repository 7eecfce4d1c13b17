//! Prompt templates for the advisory pipeline and the council round

use crate::core::agent::AgentId;
use crate::core::request::DocumentRef;
use crate::util::excerpt;

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// System prompt establishing an advisor's persona
    pub fn agent_system(agent: AgentId) -> String {
        let focus = match agent {
            AgentId::Legal => {
                "Focus on regulatory exposure, licensing, contracts, intellectual property \
                 and data-protection obligations in the relevant jurisdictions."
            }
            AgentId::Finance => {
                "Focus on unit economics, burn rate, runway, pricing and the financial \
                 assumptions a founder must validate."
            }
            AgentId::Investor => {
                "Focus on what an investor would probe: market size, traction, team, \
                 defensibility and the fundraising narrative."
            }
            AgentId::Competitor => {
                "Focus on the competitive landscape: incumbents, substitutes, positioning \
                 and how rivals are likely to respond."
            }
        };

        format!(
            r#"You are the {} on a startup advisory council.
{}
Ground your answer in the provided context when it is relevant and say so when it is missing.
Be concrete and actionable. Do not invent citations."#,
            agent.role(),
            focus
        )
    }

    /// User prompt for the first draft
    pub fn draft_prompt(prompt: &str, context: &str, attachments: &[DocumentRef]) -> String {
        let mut out = String::new();

        if !context.trim().is_empty() {
            out.push_str("Relevant context:\n");
            out.push_str(context.trim());
            out.push_str("\n\n");
        }

        if !attachments.is_empty() {
            out.push_str("Attached documents:\n");
            for doc in attachments {
                out.push_str(&format!("- {} ({})\n", doc.filename, doc.id));
            }
            out.push('\n');
        }

        out.push_str(&format!("Question:\n{}\n\nProvide a clear, well-structured answer.", prompt));
        out
    }

    /// User prompt asking an advisor to grade its own draft
    pub fn self_critique_prompt(prompt: &str, draft: &str) -> String {
        format!(
            r#"Original question: {}

Your draft answer:
{}

Grade the draft for accuracy, completeness and actionability.
Respond with JSON only: {{"score": <integer 1-10>, "feedback": "<what to improve>"}}"#,
            prompt, draft
        )
    }

    /// User prompt asking an advisor to revise its draft using its own feedback
    pub fn refine_prompt(prompt: &str, draft: &str, feedback: &str) -> String {
        format!(
            r#"Original question: {}

Your draft answer:
{}

Reviewer feedback:
{}

Rewrite the answer to address the feedback. Return only the improved answer."#,
            prompt, draft, feedback
        )
    }

    /// System prompt for cross-critique
    pub fn critique_system(critic: AgentId) -> String {
        format!(
            r#"You are the {} reviewing another advisor's answer.
Judge it on accuracy, completeness and practical usefulness for a founder.
Respond with a single JSON object and nothing else."#,
            critic.role()
        )
    }

    /// User prompt for cross-critique of one anonymized response
    pub fn critique_prompt(question: &str, label: &str, response: &str) -> String {
        format!(
            r#"Original question: {}

--- {} ---
{}

Respond with JSON only: {{"score": <integer 1-10>, "feedback": "<one or two sentences>"}}"#,
            question, label, response
        )
    }

    /// System prompt for the synthesis step
    pub fn synthesis_system() -> &'static str {
        r#"You are the chair of a startup advisory council.
Your task is to:
1. Start from the highest-rated answer
2. Fold in the strongest points and corrections from the other advisors
3. Resolve disagreements explicitly
4. Produce one coherent recommendation

Be balanced and concrete. Do not mention scores or the review process."#
    }

    /// User prompt for synthesis.
    ///
    /// `excerpts` are `(label, content)` pairs; each content is cut to
    /// `excerpt_chars` characters.
    pub fn synthesis_prompt(
        question: &str,
        seed: &str,
        feedback: &[String],
        excerpts: &[(String, String)],
        excerpt_chars: usize,
    ) -> String {
        let mut prompt = format!(
            r#"Original question: {}

Highest-rated answer:
{}
"#,
            question, seed
        );

        if !feedback.is_empty() {
            prompt.push_str("\nReviewer feedback:\n");
            for item in feedback.iter().filter(|f| !f.trim().is_empty()) {
                prompt.push_str(&format!("- {}\n", item.trim()));
            }
        }

        if !excerpts.is_empty() {
            prompt.push_str("\nOther advisors:\n");
            for (label, content) in excerpts {
                prompt.push_str(&format!(
                    "\n--- {} ---\n{}\n",
                    label,
                    excerpt(content, excerpt_chars)
                ));
            }
        }

        prompt.push_str("\nWrite the council's final answer.");
        prompt
    }
}
