//! Level limit commands

use clap::Subcommand;
use colored::Colorize;
use serde::Serialize;

use lending_engine::LevelLimitValidator;
use lending_types::{LoanLevel, TermDays};

use crate::error::CliResult;
use crate::output::{cedis, emit, OutputFormat};

/// Level subcommands
#[derive(Subcommand)]
pub enum LevelCommands {
    /// Check a principal (and optionally a term) against level bounds
    Validate {
        /// Principal in GHS
        amount: f64,
        /// Level minimum
        #[arg(long, default_value = "100")]
        min: f64,
        /// Level maximum
        #[arg(long, default_value = "5000")]
        max: f64,
        /// Requested term
        #[arg(short, long)]
        term: Option<TermDays>,
        /// Terms the level offers (all when omitted)
        #[arg(long, value_delimiter = ',')]
        terms: Vec<TermDays>,
    },

    /// Clamp a slider value into level bounds
    Clamp {
        amount: f64,
        #[arg(long, default_value = "100")]
        min: f64,
        #[arg(long, default_value = "5000")]
        max: f64,
    },
}

#[derive(Serialize)]
struct ValidationReport {
    amount: f64,
    min: f64,
    max: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    term: Option<TermDays>,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Execute level command
pub async fn execute(command: LevelCommands, format: OutputFormat) -> CliResult<()> {
    match command {
        LevelCommands::Validate {
            amount,
            min,
            max,
            term,
            terms,
        } => {
            let level = LoanLevel::new(0, "cli", min, max).with_terms(terms);
            validate(amount, term, &level, format)
        }
        LevelCommands::Clamp { amount, min, max } => {
            let level = LoanLevel::new(0, "cli", min, max);
            let clamped = LevelLimitValidator::clamp(amount, &level);
            if !emit(&serde_json::json!({ "amount": amount, "clamped": clamped }), format)? {
                println!("{} → {}", cedis(amount).dimmed(), cedis(clamped).bold());
            }
            Ok(())
        }
    }
}

fn validate(
    amount: f64,
    term: Option<TermDays>,
    level: &LoanLevel,
    format: OutputFormat,
) -> CliResult<()> {
    let result = match term {
        Some(term) => LevelLimitValidator::validate_request(amount, term, level),
        None => LevelLimitValidator::validate(amount, level),
    };

    let report = ValidationReport {
        amount,
        min: level.min_amount,
        max: level.max_amount,
        term,
        valid: result.is_ok(),
        code: result.as_ref().err().map(|e| e.code()),
        error: result.as_ref().err().map(|e| e.to_string()),
    };

    if emit(&report, format)? {
        return Ok(());
    }

    match result {
        Ok(()) => {
            println!(
                "{} {} is within {} - {}",
                "✓".green().bold(),
                cedis(amount).bold(),
                cedis(level.min_amount),
                cedis(level.max_amount)
            );
        }
        Err(e) => {
            println!("{} Request rejected", "✗".red().bold());
            println!();
            println!("  Error: {} ({})", e, e.code().yellow());
        }
    }
    Ok(())
}
