//! CLI for the offline generation pass.
//!
//! # Usage
//!
//! ```bash
//! # Generate implementations for every directive in the given files
//! pw-generate src/widgets.rs src/panels.rs
//!
//! # Report what would be dispatched, without touching the network
//! pw-generate src/widgets.rs --dry-run
//!
//! # Drop cache entries no longer addressed by any directive
//! pw-generate src/**/*.rs --prune
//! ```
//!
//! # Environment
//!
//! `ANTHROPIC_API_KEY` is required (except with `--dry-run`); a local env
//! file can provide it.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use pw_client::{load_env_file, ClaudeClient, ClaudeConfig};
use pw_generate::{scan_only, GenerateConfig, GenerationPass};

/// Generate implementations for `use prompt:` directives and persist them
/// into the cache consumed by the injection pass.
#[derive(Parser)]
#[command(name = "pw-generate", version)]
struct Args {
    /// Source files to scan.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Cache file shared with the injection pass.
    #[arg(long, default_value = ".promptweld.cache")]
    cache: PathBuf,

    /// Env file consulted for credentials before the process environment
    /// default of `.env`.
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Model identifier override.
    #[arg(long)]
    model: Option<String>,

    /// Max tokens per generation request.
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Drop cache entries not addressed by this run's scan. Only safe when
    /// every file sharing the cache is listed.
    #[arg(long)]
    prune: bool,

    /// Scan and report only; no requests, no cache writes.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let env_path = args.env_file.clone().unwrap_or_else(|| PathBuf::from(".env"));
    if let Err(err) = load_env_file(&env_path) {
        tracing::warn!(path = %env_path.display(), %err, "env file unreadable");
    }

    if args.dry_run {
        let report = scan_only(&args.files, &args.cache);
        println!("{}", report.format_summary());
        return ExitCode::SUCCESS;
    }

    let mut client_config = match ClaudeConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {}", err);
            eprintln!();
            eprintln!("Make sure ANTHROPIC_API_KEY is set:");
            eprintln!("  export ANTHROPIC_API_KEY=sk-ant-...");
            return ExitCode::FAILURE;
        }
    };
    if let Some(model) = args.model {
        client_config.model = model;
    }
    if let Some(max_tokens) = args.max_tokens {
        client_config.max_tokens = max_tokens;
    }

    let pass = GenerationPass::new(
        ClaudeClient::new(client_config),
        GenerateConfig {
            cache_path: args.cache,
            prune: args.prune,
        },
    );

    match pass.run(&args.files).await {
        Ok(report) => {
            println!("{}", report.format_summary());
            if report.total_failed() > 0 {
                // Failures wrote nothing; the next run retries them.
                tracing::warn!(failed = report.total_failed(), "some directives failed");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
