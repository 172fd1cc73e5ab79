//! Orthospec CLI
//!
//! Structural checks for orthography specifications:
//! - loading `spec_v1` documents and building the pattern graph
//! - separator counting and union consistency
//! - entry-point field mapping reports (text/JSON)

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod check;

/// Log filter for the CLI. Falls back to `RUST_LOG`, then `warn`.
const ORTHOSPEC_LOG_ENV: &str = "ORTHOSPEC_LOG";

#[derive(Parser)]
#[command(name = "orthospec")]
#[command(
    author,
    version,
    about = "Orthospec: structural checks for orthography specifications"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check `spec_v1` orthography documents.
    Check {
        #[command(subcommand)]
        command: CheckCommands,
    },
}

#[derive(Subcommand)]
enum CheckCommands {
    /// Load a document and build its pattern graph.
    Parse {
        /// Input `spec_v1` JSON file.
        input: PathBuf,
    },

    /// Analyze a document and fail on errors.
    Validate {
        /// Input `spec_v1` JSON file.
        input: PathBuf,
        /// Fail on warnings too.
        #[arg(long)]
        strict: bool,
    },

    /// Render the full analysis report.
    ///
    /// Exits non-zero when the specification is rejected (unless `--no-fail`
    /// is set).
    Report {
        /// Input `spec_v1` JSON file.
        input: PathBuf,
        /// Output report path (defaults to stdout).
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Output format: json|text
        #[arg(long, default_value = "text")]
        format: String,
        /// Reject on warnings too.
        #[arg(long)]
        strict: bool,
        /// Always exit 0 (still prints the report).
        #[arg(long)]
        no_fail: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(ORTHOSPEC_LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { command } => match command {
            CheckCommands::Parse { input } => {
                check::cmd_parse(&input)?;
            }
            CheckCommands::Validate { input, strict } => {
                check::cmd_validate(&input, strict)?;
            }
            CheckCommands::Report {
                input,
                out,
                format,
                strict,
                no_fail,
            } => {
                check::cmd_report(&input, out.as_ref(), &format, strict, no_fail)?;
            }
        },
    }

    Ok(())
}
