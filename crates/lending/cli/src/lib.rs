//! CEDI Loan CLI - command-line interface for the lending engine
//!
//! This CLI gives operators and developers a terminal interface to:
//! - Price loans for any principal and term
//! - Check principals against level limits
//! - Explore and replay loan status transitions
//! - Normalize backend config payloads
//! - Inspect and submit loans against a running backend

use clap::{Parser, Subcommand};
use std::ffi::OsString;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lending_client::{HttpLoanApi, DEFAULT_API_URL};

mod commands;
mod error;
mod output;

use commands::{config, level, loans, quote, status};
pub use error::{CliError, CliResult};

/// CEDI Loan CLI application
#[derive(Parser)]
#[command(name = "cedi-loan")]
#[command(about = "CEDI Loan - fee, limit, and loan status CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (table, json, yaml)
    #[arg(short, long, default_value = "table", global = true)]
    output: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Quote fees and total repayment
    Quote(quote::QuoteArgs),

    /// Check level limits
    Level {
        #[command(subcommand)]
        command: level::LevelCommands,
    },

    /// Loan status lifecycle and transitions
    Status {
        #[command(subcommand)]
        command: status::StatusCommands,
    },

    /// Rate configuration
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },

    /// Loans on a running backend
    Loans {
        /// Backend API base URL
        #[arg(long, env = "CEDI_API_URL", default_value = DEFAULT_API_URL)]
        api_url: String,

        /// Bearer token
        #[arg(long, env = "CEDI_API_TOKEN", hide_env_values = true)]
        token: Option<String>,

        #[command(subcommand)]
        command: loans::LoansCommands,
    },
}

/// Run using the current process arguments.
pub async fn run() -> CliResult<()> {
    run_with_args(std::env::args_os()).await
}

/// Run using the provided argument iterator.
pub async fn run_with_args<I, T>(args: I) -> CliResult<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    // Initialize tracing; logs go to stderr so JSON/YAML output stays clean
    let filter = if cli.verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .try_init();

    // Execute command
    match cli.command {
        Commands::Quote(args) => quote::execute(args, cli.output).await,
        Commands::Level { command } => level::execute(command, cli.output).await,
        Commands::Status { command } => status::execute(command, cli.output).await,
        Commands::Config { command } => config::execute(command, cli.output).await,
        Commands::Loans {
            api_url,
            token,
            command,
        } => {
            let api = match token {
                Some(token) => HttpLoanApi::new(api_url).with_token(token),
                None => HttpLoanApi::new(api_url),
            };
            loans::execute(command, api, cli.output).await
        }
    }
}
