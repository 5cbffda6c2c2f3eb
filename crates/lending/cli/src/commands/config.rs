//! Lending config commands

use clap::Subcommand;
use colored::Colorize;

use lending_client::{LendingConfig, RateSource};
use lending_engine::scaled_fee_rates;

use crate::commands::load_config;
use crate::error::CliResult;
use crate::output::{cedis, emit, OutputFormat};

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Normalize a backend config payload into a rate table
    Normalize {
        /// Path to config JSON file
        file: String,
    },

    /// Show the built-in rate policy
    Defaults,
}

/// Execute config command
pub async fn execute(command: ConfigCommands, format: OutputFormat) -> CliResult<()> {
    let config = match command {
        ConfigCommands::Normalize { file } => load_config(Some(&file))?,
        ConfigCommands::Defaults => load_config(None)?,
    };
    if emit(&config, format)? {
        return Ok(());
    }
    print_config(&config);
    Ok(())
}

pub(crate) fn print_config(config: &LendingConfig) {
    let source = match config.rate_source {
        RateSource::Canonical => "built-in policy".green(),
        RateSource::Backend => "backend config".yellow(),
    };
    println!("{} ({})", "Lending Config".bold().cyan(), source);
    println!("{}", "=".repeat(70));
    println!(
        "  Loan amount: {} - {}",
        cedis(config.min_loan_amount),
        cedis(config.max_loan_amount)
    );
    let terms: Vec<String> = config
        .loan_terms_available
        .iter()
        .map(|t| t.label())
        .collect();
    println!("  Terms: {}", terms.join(", "));
    println!();
    println!(
        "  {:<8} {:>9} {:>9} {:>9} {:>11} {:>9}",
        "Term".bold(),
        "Interest",
        "Service",
        "Admin",
        "Commitment",
        "Total"
    );
    for term in config.rate_table.terms() {
        let Ok(rates) = config.rate_table.resolve(term) else {
            continue;
        };
        let (service, admin, commitment) = scaled_fee_rates(&rates);
        let admin_label = if rates.admin_fee_flat > 0.0 {
            format!("{:.2}%+{}", admin, rates.admin_fee_flat)
        } else {
            format!("{:.2}%", admin)
        };
        println!(
            "  {:<8} {:>8.2}% {:>8.2}% {:>9} {:>10.2}% {:>8.2}%",
            term.label(),
            rates.interest_rate_pct,
            service,
            admin_label,
            commitment,
            rates.interest_rate_pct + service + admin + commitment
        );
    }
}
