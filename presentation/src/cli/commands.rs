//! CLI command definitions

use clap::{Parser, ValueEnum};
use council_domain::{AdvisoryRequest, AgentId, DocumentRef, DomainMetadata};
use std::path::PathBuf;

/// Output format for advisory results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable answer with provenance
    Text,
    /// JSON output
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
    }
}

/// CLI arguments for startup-council
#[derive(Parser, Debug)]
#[command(name = "startup-council")]
#[command(author, version, about = "Startup advisory council - domain advisors critique and merge their answers")]
#[command(long_about = r#"
Startup Council answers a founder's question with one or more advisors
(legal, finance, investor, competitor), each grounded in retrieved documents.

With one advisor the answer comes straight from its pipeline
(draft, self-critique, refine). With two or more, the advisors answer
independently, anonymously critique each other, and the best answer is
synthesized with the others' strongest points.

Configuration files are loaded from (in priority order):
1. COUNCIL_* environment variables (COUNCIL_COUNCIL__CRITIQUE_CONCURRENCY=2)
2. --config <path>     Explicit config file
3. ./council.toml      Project-level config
4. ~/.config/startup-council/config.toml   Global config

Example:
  startup-council --sector healthtech -a legal "Do we need HIPAA compliance for a wellness app?"
  startup-council --sector saas -a finance -a investor "Is 18 months of runway enough to raise an A?"
  startup-council --sector fintech --council "How do we price against Stripe?"
"#)]
pub struct Cli {
    /// The question to put to the advisors
    pub prompt: Option<String>,

    /// Advisor to consult (can be specified multiple times)
    #[arg(short, long = "agent", value_name = "AGENT", value_parser = parse_agent)]
    pub agents: Vec<AgentId>,

    /// Run a council; with no --agent, every advisor takes part
    #[arg(long)]
    pub council: bool,

    /// Primary domain of the question
    #[arg(long, default_value = "finance")]
    pub domain: String,

    /// Industry sector used to filter retrieved documents
    #[arg(long, default_value = "general")]
    pub sector: String,

    /// Geographic region filter
    #[arg(long)]
    pub region: Option<String>,

    /// Regulatory framework filter (can be specified multiple times)
    #[arg(long = "jurisdiction", value_name = "NAME")]
    pub jurisdictions: Vec<String>,

    /// Preferred document type for retrieval
    #[arg(long)]
    pub document_type: Option<String>,

    /// Attached document as ID=FILENAME (can be specified multiple times)
    #[arg(long = "attach", value_name = "ID=FILENAME", value_parser = parse_attachment)]
    pub attachments: Vec<DocumentRef>,

    /// Model backend to try first for a single advisor (gemini, openai)
    #[arg(long, value_name = "BACKEND")]
    pub backend: Option<String>,

    /// Skip the self-critique and refine passes
    #[arg(long)]
    pub no_self_critique: bool,

    /// Output format (defaults to the config file, then text)
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Write a daily rolling log file into this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Append a JSONL transcript of council events to this file
    #[arg(long, value_name = "PATH")]
    pub transcript: Option<PathBuf>,
}

/// What the command line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Single(AgentId),
    Council(Vec<AgentId>),
}

impl Cli {
    /// One advisor without `--council` runs alone; anything else is a council
    pub fn run_mode(&self) -> RunMode {
        match (self.agents.as_slice(), self.council) {
            ([agent], false) => RunMode::Single(*agent),
            ([], _) => RunMode::Council(AgentId::all().to_vec()),
            (agents, _) => RunMode::Council(agents.to_vec()),
        }
    }

    /// Build the request from the prompt and metadata flags
    pub fn request(&self, prompt: &str) -> AdvisoryRequest {
        let mut metadata = DomainMetadata::new(&self.domain, &self.sector)
            .with_jurisdictions(self.jurisdictions.iter().cloned());
        if let Some(region) = &self.region {
            metadata = metadata.with_region(region);
        }
        if let Some(document_type) = &self.document_type {
            metadata = metadata.with_document_type(document_type);
        }

        let agents = match self.run_mode() {
            RunMode::Single(agent) => vec![agent],
            RunMode::Council(agents) => agents,
        };
        self.attachments.iter().cloned().fold(
            AdvisoryRequest::new(prompt, metadata).with_agents(agents),
            AdvisoryRequest::with_attachment,
        )
    }
}

fn parse_agent(s: &str) -> Result<AgentId, String> {
    s.parse::<AgentId>().map_err(|e| e.to_string())
}

fn parse_attachment(s: &str) -> Result<DocumentRef, String> {
    match s.split_once('=') {
        Some((id, filename)) if !id.trim().is_empty() && !filename.trim().is_empty() => {
            Ok(DocumentRef::new(id.trim(), filename.trim()))
        }
        _ => Err(format!("expected ID=FILENAME, got '{}'", s)),
    }
}
