//! CLI for the Issue Fixer.
//!
//! This tool scans a repository's open issues, asks a language model for a
//! fix to each and opens a review request with the result.

use clap::Parser;
use issue_fixer::{
    load_config, CredentialInputs, IssueOutcome, LlmConfig, RepositoryId, RunReport, Runner,
    RunnerConfig, RunnerError,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Issue Fixer - Propose LLM-generated fixes for open issues.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Repository to scan, as `owner/name`.
    #[arg(long, env = "ISSUE_FIXER_REPOSITORY")]
    repository: String,

    /// Path to the config file. A missing file means defaults.
    #[arg(long, default_value = "issue-fixer.toml")]
    config: PathBuf,

    /// Source-control access token.
    #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
    source_token: Option<String>,

    /// Language-model backend key.
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    model_key: Option<String>,

    /// Model as `provider:model`; replaces the `[llm]` section.
    #[arg(long, env = "ISSUE_FIXER_MODEL")]
    model: Option<String>,

    /// Only process issues carrying this label. Repeatable.
    #[arg(long = "label")]
    labels: Vec<String>,

    /// Maximum number of issues to process.
    #[arg(long)]
    max_issues: Option<usize>,

    /// Maximum issues processed concurrently.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Commit fixes locally without pushing or opening review requests.
    #[arg(long)]
    dry_run: bool,

    /// Check the model answers before fetching issues.
    #[arg(long)]
    probe_model: bool,

    /// Write the run report as JSON to this path.
    #[arg(long)]
    report_json: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    // octocrab and the model clients share one rustls provider.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let args = Args::parse();
    let report_path = args.report_json.clone();

    match run(args).await {
        Ok(report) => {
            print_summary(&report);
            if let Some(path) = report_path {
                if let Err(e) = write_report(&report, &path) {
                    error!(path = %path.display(), error = %e, "Failed to write report");
                    return ExitCode::from(2);
                }
                info!(path = %path.display(), "Wrote report");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Critical failure");
            ExitCode::from(2)
        }
    }
}

/// Initializes tracing with environment filter support.
///
/// Sets up the global tracing subscriber with:
/// - Compact log formatting (single-line output)
/// - Log level filtering via `RUST_LOG` env var (defaults to "info")
fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// Main execution logic.
async fn run(args: Args) -> Result<RunReport, RunnerError> {
    let repository: RepositoryId = args.repository.parse()?;

    let mut config = load_config(&args.config)?;
    if let Some(spec) = &args.model {
        config.llm = Some(LlmConfig::from_spec(spec)?);
    }
    if !args.labels.is_empty() {
        config.run.labels = args.labels;
    }
    if let Some(max_issues) = args.max_issues {
        config.run.max_issues = Some(max_issues);
    }
    if let Some(concurrency) = args.concurrency {
        config.run.concurrency = concurrency;
    }
    config.validate(&args.config)?;

    let credentials = CredentialInputs {
        source_token: args.source_token,
        model_key: args.model_key,
    };
    let config = RunnerConfig::new(repository, credentials, config)
        .with_dry_run(args.dry_run)
        .with_probe_model(args.probe_model);

    let runner = Runner::new(config)?;
    runner.run().await
}

fn write_report(report: &RunReport, path: &std::path::Path) -> std::io::Result<()> {
    let json = report.to_json().map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}

/// Prints the final run summary.
fn print_summary(report: &RunReport) {
    println!("\nSummary for {}:", report.repository);
    println!(
        "  Mode: {}",
        if report.dry_run { "Dry Run" } else { "Live" }
    );
    println!("  Proposals opened: {}", report.done);
    println!("  Issues skipped: {}", report.skipped);
    println!("  Issues failed: {}", report.failed);

    for entry in &report.issues {
        let status = match &entry.outcome {
            IssueOutcome::Done { proposal } => format!("done: {}", proposal.url),
            IssueOutcome::Skipped { reason } => format!("skipped: {reason}"),
            IssueOutcome::Failed { stage, reason } => format!("failed at {stage}: {reason}"),
        };
        println!("  #{} {} - {status}", entry.number, entry.title);
    }
}
