//! Console output formatter for advisory results

use colored::Colorize;
use council_domain::{AgentOutput, CircuitState, CouncilResult};

/// Formats advisory results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format one advisor's final answer
    pub fn format_agent(output: &AgentOutput) -> String {
        let mut out = String::new();

        out.push_str(&Self::header(&format!("{} answer", output.agent.role())));
        out.push_str("\n\n");
        out.push_str(output.content.trim());
        out.push('\n');

        out.push_str(&Self::section_header("Provenance"));
        out.push_str(&format!(
            "{} {:.0}%\n",
            "Confidence:".cyan().bold(),
            output.confidence * 100.0
        ));
        let metadata = &output.metadata;
        let origin = metadata.context_origin.as_str();
        let origin = if metadata.context_origin.is_degraded() {
            origin.yellow().to_string()
        } else {
            origin.green().to_string()
        };
        out.push_str(&format!(
            "{} {} ({} chunks)\n",
            "Context:".cyan().bold(),
            origin,
            metadata.chunks_found
        ));
        if let Some(score) = metadata.self_critique_score {
            let refined = if metadata.refined { ", refined" } else { "" };
            out.push_str(&format!(
                "{} {}/10{}\n",
                "Self-critique:".cyan().bold(),
                score,
                refined
            ));
        }
        if !metadata.backends.is_empty() {
            out.push_str(&format!(
                "{} {}\n",
                "Backends:".cyan().bold(),
                metadata.backends.join(", ")
            ));
        }
        out.push_str(&Self::sources(&output.sources));
        out.push_str(&Self::footer());
        out
    }

    /// Format a council answer with its provenance
    pub fn format_council(result: &CouncilResult) -> String {
        let metadata = &result.council_metadata;
        let mut out = String::new();

        out.push_str(&Self::header("Startup Council"));
        out.push_str("\n\n");
        out.push_str(result.content.trim());
        out.push('\n');

        out.push_str(&Self::section_header("Council"));
        out.push_str(&format!(
            "{} {}\n",
            "Advisors:".cyan().bold(),
            metadata
                .agents_used
                .iter()
                .map(|a| a.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));
        if !metadata.failed_agents.is_empty() {
            out.push_str(&format!(
                "{} {}\n",
                "Did not answer:".red().bold(),
                metadata
                    .failed_agents
                    .iter()
                    .map(|a| a.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        out.push_str(&format!(
            "{} {} critiques, consensus {:.1}/10 (confidence {:.0}%)\n",
            "Review:".cyan().bold(),
            metadata.critique_count,
            metadata.consensus_score,
            result.confidence * 100.0
        ));
        let seed = format!("seeded by {}", metadata.seed_agent);
        if metadata.synthesized {
            out.push_str(&format!("{} {}\n", "Synthesis:".cyan().bold(), seed));
        } else {
            out.push_str(&format!(
                "{} {} ({})\n",
                "Synthesis:".cyan().bold(),
                "failed, showing top-rated answer".yellow(),
                seed
            ));
        }
        out.push_str(&Self::sources(&result.sources));
        out.push_str(&Self::footer());
        out
    }

    /// Format as JSON
    pub fn format_json<T: serde::Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }

    /// One line per circuit that is not closed
    pub fn format_circuits(snapshot: &[(String, CircuitState)]) -> Option<String> {
        let lines: Vec<String> = snapshot
            .iter()
            .filter(|(_, state)| *state != CircuitState::Closed)
            .map(|(name, state)| format!("  {} {}", name, state.as_str().yellow()))
            .collect();
        (!lines.is_empty()).then(|| {
            format!("{}\n{}\n", "Degraded dependencies:".yellow().bold(), lines.join("\n"))
        })
    }

    fn sources(sources: &[String]) -> String {
        if sources.is_empty() {
            return format!("{} {}\n", "Sources:".cyan().bold(), "none".dimmed());
        }
        let mut out = format!("{}\n", "Sources:".cyan().bold());
        for source in sources {
            out.push_str(&format!("  * {}\n", source));
        }
        out
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("{}\n", "=".repeat(60).cyan())
    }
}
