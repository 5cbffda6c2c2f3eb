//! Loan status commands

use clap::Subcommand;
use colored::Colorize;
use serde::Serialize;

use lending_engine::{LoanStatusMachine, LoanTracker};
use lending_types::{LoanEvent, LoanState, LoanStatus, StatusChange};

use crate::error::{CliError, CliResult};
use crate::output::{emit, OutputFormat};

/// Status subcommands
#[derive(Subcommand)]
pub enum StatusCommands {
    /// Show the loan lifecycle
    Lifecycle,

    /// Show valid transitions from a state
    Transitions {
        /// Starting state (none, pending, under_review, ...)
        from: String,
    },

    /// Replay server events from `none` and print the resulting history
    ///
    /// Events are status names, `payment:<remaining balance>`, or `reset`.
    Replay {
        #[arg(required = true)]
        events: Vec<String>,
    },
}

/// Execute status command
pub async fn execute(command: StatusCommands, format: OutputFormat) -> CliResult<()> {
    match command {
        StatusCommands::Lifecycle => show_lifecycle(format),
        StatusCommands::Transitions { from } => show_transitions(&from, format),
        StatusCommands::Replay { events } => replay(&events, format),
    }
}

fn describe(status: LoanStatus) -> &'static str {
    match status {
        LoanStatus::Pending => "Submitted, awaiting review",
        LoanStatus::UnderReview => "Being reviewed",
        LoanStatus::Approved => "Approved, awaiting disbursement",
        LoanStatus::Rejected => "Declined; the user may apply again",
        LoanStatus::Disbursed => "Funds sent to mobile money",
        LoanStatus::Active => "Repayment in progress",
        LoanStatus::Completed => "Fully repaid; the user may apply again",
    }
}

fn show_lifecycle(format: OutputFormat) -> CliResult<()> {
    let states: Vec<_> = LoanStatus::ALL
        .iter()
        .map(|status| {
            serde_json::json!({
                "state": status.as_str(),
                "description": describe(*status),
                "blocks_new_application": status.blocks_new_application(),
            })
        })
        .collect();

    if emit(&states, format)? {
        return Ok(());
    }

    println!("{}", "Loan Lifecycle".bold().cyan());
    println!("{}", "=".repeat(60));
    println!();
    println!(
        "  {} → {} → {} → {} → {} → {} → {}",
        "none".dimmed(),
        "pending".yellow(),
        "under_review".blue(),
        "approved".green(),
        "disbursed".cyan(),
        "active".green().bold(),
        "completed".white()
    );
    println!();
    println!("  Alternative ending:");
    println!("    {} (declined at review)", "rejected".red());
    println!();
    for status in LoanStatus::ALL {
        println!("  {}: {}", status.as_str().bold(), describe(status).dimmed());
    }
    Ok(())
}

fn parse_state(raw: &str) -> CliResult<LoanState> {
    LoanState::try_from(raw.to_string())
        .map_err(|_| CliError::InvalidArgument(format!("Unknown status: {}", raw)))
}

fn show_transitions(from: &str, format: OutputFormat) -> CliResult<()> {
    let state = parse_state(from)?;
    let transitions: Vec<String> = LoanStatusMachine::valid_transitions(state)
        .into_iter()
        .map(String::from)
        .collect();

    let json = serde_json::json!({
        "from": state.as_str(),
        "valid_transitions": transitions,
    });
    if emit(&json, format)? {
        return Ok(());
    }

    println!(
        "{} from {}:",
        "Valid transitions".bold().cyan(),
        state.as_str().bold().yellow()
    );
    println!();
    if transitions.is_empty() {
        println!("  {}", "None".dimmed());
    } else {
        for t in transitions {
            println!("  → {}", t.green());
        }
    }
    Ok(())
}

fn parse_event(raw: &str) -> CliResult<LoanEvent> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("reset") {
        return Ok(LoanEvent::Reset);
    }
    if let Some(balance) = raw.strip_prefix("payment:") {
        let remaining_balance = balance.parse().map_err(|_| {
            CliError::InvalidArgument(format!("Invalid remaining balance: {}", balance))
        })?;
        return Ok(LoanEvent::PaymentReceived { remaining_balance });
    }
    Ok(LoanEvent::StatusAsserted {
        status: LoanStatus::parse(raw)?,
    })
}

#[derive(Serialize)]
struct ReplayReport {
    state: LoanState,
    history: Vec<StatusChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn replay(events: &[String], format: OutputFormat) -> CliResult<()> {
    let mut tracker = LoanTracker::new();
    let mut error = None;

    for raw in events {
        // First entry moves out of `none` as a submission.
        let event = match parse_event(raw)? {
            LoanEvent::StatusAsserted { status } if tracker.state().is_none() => {
                LoanEvent::Submitted { status }
            }
            event => event,
        };
        if let Err(e) = tracker.apply(&event) {
            error = Some(format!("{} at '{}': {}", e.code(), raw, e));
            break;
        }
    }

    let report = ReplayReport {
        state: tracker.state(),
        history: tracker.history().to_vec(),
        error,
    };
    if emit(&report, format)? {
        return Ok(());
    }

    println!("{}", "Status History".bold().cyan());
    println!("{}", "=".repeat(60));
    for change in &report.history {
        println!(
            "  {} → {}  {}",
            change.from.as_str().dimmed(),
            change.to.as_str().green(),
            change.reason.dimmed()
        );
    }
    println!();
    println!("  Final state: {}", report.state.as_str().bold());
    if let Some(error) = &report.error {
        println!("  {} {}", "✗".red().bold(), error);
    }
    Ok(())
}
