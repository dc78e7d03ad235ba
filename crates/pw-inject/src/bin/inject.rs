//! CLI for the compile-time injection pass.
//!
//! Runs synchronously with no network access: reads a source file and the
//! persisted cache, splices cached generated bodies in, and prints the
//! rewritten source. A file that fails to parse passes through unchanged.
//!
//! # Usage
//!
//! ```bash
//! pw-inject src/widgets.rs --cache .promptweld.cache
//! pw-inject src/widgets.rs --cache .promptweld.cache --output src/widgets.rs
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use pw_cache::Cache;
use pw_core::SymbolTable;
use pw_inject::{inject_source, render, InjectorConfig};

/// Splice cached generated bodies into a Rust source file.
#[derive(Parser)]
#[command(name = "pw-inject", version)]
struct Args {
    /// Source file to rewrite.
    file: PathBuf,

    /// Cache file produced by the generation pass.
    #[arg(long, default_value = ".promptweld.cache")]
    cache: PathBuf,

    /// Symbol table TOML extending the builtin known exports.
    #[arg(long)]
    symbols: Option<PathBuf>,

    /// Plugin configuration JSON (no options currently recognized).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output path; stdout when omitted.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let source = match std::fs::read_to_string(&args.file) {
        Ok(source) => source,
        Err(err) => {
            tracing::error!(file = %args.file.display(), %err, "failed to read source");
            return ExitCode::FAILURE;
        }
    };

    let symbols = match &args.symbols {
        Some(path) => match SymbolTable::load(path) {
            Ok(table) => table,
            Err(err) => {
                tracing::error!(%err, "failed to load symbol table");
                return ExitCode::FAILURE;
            }
        },
        None => SymbolTable::builtin(),
    };

    let config = match &args.config {
        Some(path) => {
            let text = match std::fs::read_to_string(path) {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!(%err, "failed to read config");
                    return ExitCode::FAILURE;
                }
            };
            match InjectorConfig::from_json(&text) {
                Ok(config) => config,
                Err(err) => {
                    tracing::error!(%err, "invalid config");
                    return ExitCode::FAILURE;
                }
            }
        }
        None => InjectorConfig::default(),
    };

    let cache = Cache::load(&args.cache);

    let output = match inject_source(&source, &cache, &symbols, &config) {
        Ok(outcome) => {
            tracing::info!(
                replaced = outcome.replaced,
                missing = outcome.missing,
                reparse_failures = outcome.reparse_failures,
                imports_added = outcome.imports_added,
                "injection complete"
            );
            render(&outcome.file)
        }
        Err(err) => {
            // Zero-directive policy: an unparseable file passes through.
            tracing::warn!(file = %args.file.display(), %err, "source did not parse, passing through");
            source
        }
    };

    match &args.output {
        Some(path) => {
            if let Err(err) = std::fs::write(path, output) {
                tracing::error!(path = %path.display(), %err, "failed to write output");
                return ExitCode::FAILURE;
            }
        }
        None => print!("{}", output),
    }

    ExitCode::SUCCESS
}
