//! CLI entrypoint for startup-council
//!
//! Loads configuration, wires the retrieval client, model backends and
//! resilience services into an [`AdvisoryService`], then runs one advisor
//! or a full council.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use council_application::{
    AdvisoryService, BackendKind, CircuitBreakerRegistry, Clock, ContextCache, ContextProvider,
    CouncilLogger, ModelInvoker, NoProgress, ProgressNotifier, SystemClock,
};
use council_infrastructure::{
    ConfigLoader, FileConfig, HttpRetrievalClient, JsonlCouncilLogger, build_backend_registry,
};
use council_presentation::{
    Cli, ConsoleFormatter, OutputFormat, ProgressReporter, RunMode, SimpleProgress,
};
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        for line in ConfigLoader::describe_sources(cli.config.as_deref()) {
            println!("{}", line);
        }
        return Ok(());
    }

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_tracing(cli.verbose, cli.log_dir.as_deref());

    info!("Starting startup-council");

    let config = load_config(&cli)?;
    check_config(&config)?;

    if cli.no_color || !config.output.color {
        colored::control::set_override(false);
    }

    let prompt = match cli.prompt.as_deref().map(str::trim) {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => bail!("A question is required. Run with --help for usage."),
    };
    let backend = cli
        .backend
        .as_deref()
        .map(str::parse::<BackendKind>)
        .transpose()
        .map_err(|e| anyhow!("--backend: {}", e))?;
    let format = cli
        .output
        .or_else(|| config.output.format.as_deref().and_then(|f| f.parse().ok()))
        .unwrap_or(OutputFormat::Text);

    // === Dependency Injection ===
    let token = CancellationToken::new();
    spawn_ctrl_c_handler(token.clone());
    let service = build_service(&cli, &config)?.with_cancellation(token);

    let show_progress = !cli.quiet && format == OutputFormat::Text;
    let request = cli.request(&prompt);

    let output = match cli.run_mode() {
        RunMode::Single(agent) => {
            info!("Running {} advisor", agent);
            let result = service.run_single_agent_on(agent, request, backend).await?;
            match format {
                OutputFormat::Text => ConsoleFormatter::format_agent(&result),
                OutputFormat::Json => ConsoleFormatter::format_json(&result),
            }
        }
        RunMode::Council(agents) => {
            if backend.is_some() {
                warn!("--backend only applies to a single advisor; ignoring it for the council");
            }
            info!("Running council with {} advisors", agents.len());
            let progress: Box<dyn ProgressNotifier> = if !show_progress {
                Box::new(NoProgress)
            } else if std::io::stderr().is_terminal() {
                Box::new(ProgressReporter::new())
            } else {
                Box::new(SimpleProgress)
            };
            let result = service
                .run_council_with_progress(agents, request, progress.as_ref())
                .await?;
            match format {
                OutputFormat::Text => ConsoleFormatter::format_council(&result),
                OutputFormat::Json => ConsoleFormatter::format_json(&result),
            }
        }
    };

    println!("{}", output);

    if format == OutputFormat::Text
        && let Some(report) = ConsoleFormatter::format_circuits(&service.circuit_snapshot())
    {
        eprintln!("{}", report);
    }

    Ok(())
}

/// Console logging to stderr, plus a daily rolling file when `log_dir` is set.
///
/// `RUST_LOG` overrides the level chosen by `-v`.
fn init_tracing(verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "startup-council.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();

    guard
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    if cli.no_config {
        info!("Configuration files disabled, using defaults");
        return Ok(ConfigLoader::load_defaults());
    }
    ConfigLoader::load(cli.config.as_deref())
        .map_err(|e| anyhow!("Failed to load configuration: {}", e))
}

/// Log warnings and fail on errors
fn check_config(config: &FileConfig) -> Result<()> {
    let issues = config.validate();
    let mut errors = 0;
    for issue in &issues {
        if issue.is_error() {
            error!("Config: {}", issue.message);
            errors += 1;
        } else {
            warn!("Config: {}", issue.message);
        }
    }
    if errors > 0 {
        let messages: Vec<&str> = issues
            .iter()
            .filter(|i| i.is_error())
            .map(|i| i.message.as_str())
            .collect();
        bail!("Invalid configuration:\n  {}", messages.join("\n  "));
    }
    Ok(())
}

fn build_service(cli: &Cli, config: &FileConfig) -> Result<AdvisoryService> {
    // Issues from these conversions were already reported by `check_config`
    let (cache_settings, _) = config.cache.to_settings();
    let (policy, _) = config.circuit_breaker.to_policy();
    let (pipeline, _) = config.pipeline.to_params(config.retrieval.limit);
    let (council, _) = config.council.to_params();
    let self_critique = pipeline.self_critique && !cli.no_self_critique;
    let pipeline = pipeline.with_self_critique(self_critique);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let breakers = Arc::new(CircuitBreakerRegistry::new(policy, clock.clone()));
    let cache = Arc::new(ContextCache::new(cache_settings, clock));

    let retrieval = HttpRetrievalClient::new(
        &config.retrieval.base_url,
        config.retrieval.resolve_api_key(),
        config.retrieval.timeout(),
    )
    .context("Failed to create retrieval client")?;
    info!("Retrieval service at {}", retrieval.endpoint());
    let context = Arc::new(ContextProvider::new(
        Arc::new(retrieval),
        cache,
        breakers.clone(),
        config.retrieval.timeout(),
    ));

    let (registry, _) = build_backend_registry(&config.models, config.pipeline.model_timeout());
    if registry.is_empty() {
        warn!("No model backend has credentials; every advisor call will fail");
    }
    let invoker = Arc::new(ModelInvoker::new(
        Arc::new(registry),
        breakers.clone(),
        config.pipeline.model_timeout(),
    ));

    let mut service = AdvisoryService::new(context, invoker, breakers, pipeline, council);

    let transcript = cli.transcript.as_ref().or(config.output.transcript.as_ref());
    if let Some(path) = transcript {
        match JsonlCouncilLogger::new(path) {
            Some(logger) => {
                info!("Writing council transcript to {}", logger.path().display());
                let logger: Arc<dyn CouncilLogger> = Arc::new(logger);
                service = service.with_logger(logger);
            }
            None => warn!("Could not open transcript file {}", path.display()),
        }
    }

    Ok(service)
}

fn spawn_ctrl_c_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            token.cancel();
        }
    });
}
