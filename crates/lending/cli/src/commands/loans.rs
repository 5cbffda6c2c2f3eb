//! Remote loan commands, against a running CEDI backend

use clap::Subcommand;
use colored::Colorize;
use tracing::debug;

use lending_client::{
    HttpLoanApi, LoanApi, LoanApplication, LoanRecord, LoanService, PaymentRecord,
};
use lending_types::{LoanLevel, TermDays};

use crate::commands::config::print_config;
use crate::error::CliResult;
use crate::output::{cedis, emit, OutputFormat};

/// Loans subcommands
#[derive(Subcommand)]
pub enum LoansCommands {
    /// List the user's loans
    List,

    /// Show the user's current loan state
    Status,

    /// Show one loan
    Show {
        /// Loan id
        loan_id: String,
    },

    /// Show the user's level and the level ladder
    Levels,

    /// Fetch and normalize the backend config
    Config,

    /// Submit a loan application
    Apply {
        /// Principal in GHS
        amount: f64,
        /// Term in days
        #[arg(short, long, default_value = "7")]
        term: TermDays,
        /// What the loan is for
        #[arg(short, long)]
        purpose: Option<String>,
        /// Accept the loan terms and conditions
        #[arg(long)]
        accept_terms: bool,
    },

    /// Start a mobile money repayment on the current loan
    Pay {
        /// Amount in GHS
        amount: f64,
        /// Mobile money number to charge
        #[arg(long)]
        phone: Option<String>,
    },

    /// List past repayments
    Payments,
}

/// Execute loans command
pub async fn execute(
    command: LoansCommands,
    api: HttpLoanApi,
    format: OutputFormat,
) -> CliResult<()> {
    debug!(base_url = api.base_url(), "Using loan backend");
    match command {
        LoansCommands::List => {
            let loans = api.my_loans().await?.loans;
            if !emit(&loans, format)? {
                print_loans(&loans);
            }
        }
        LoansCommands::Status => {
            let mut service = LoanService::new(api);
            let state = service.sync().await?;
            let json = serde_json::json!({
                "state": state,
                "loan_id": service.tracker().loan_id(),
                "can_apply": service.tracker().ensure_can_apply().is_ok(),
            });
            if !emit(&json, format)? {
                println!("{} {}", "Loan state:".bold().cyan(), state.as_str().bold());
                if let Some(id) = service.tracker().loan_id() {
                    println!("  Loan: {}", id);
                }
                if state.has_active_loan() {
                    println!("  {}", "A loan is in progress; new applications are blocked".yellow());
                }
            }
        }
        LoansCommands::Show { loan_id } => {
            let loan = api.loan(&loan_id).await?;
            if !emit(&loan, format)? {
                print_loans(std::slice::from_ref(&loan));
                if let Some(balance) = loan.remaining_balance {
                    println!("  Remaining balance: {}", cedis(balance));
                }
            }
        }
        LoansCommands::Levels => {
            let service = LoanService::new(api);
            let current = service.api().current_level().await?;
            let levels = service.api().loan_levels().await?;
            let eligible = service.eligible_level().await?;
            let json = serde_json::json!({
                "current": current,
                "eligible": eligible,
                "levels": levels,
            });
            if !emit(&json, format)? {
                print_levels(&current.current_level, eligible.as_ref(), &levels);
                println!("Completed loans: {}", current.completed_loans);
            }
        }
        LoansCommands::Config => {
            let mut service = LoanService::new(api);
            let config = service.config().await?;
            if !emit(&config, format)? {
                print_config(&config);
            }
        }
        LoansCommands::Apply {
            amount,
            term,
            purpose,
            accept_terms,
        } => {
            let mut service = LoanService::new(api);
            service.sync().await?;

            let mut application = LoanApplication::new(amount, term);
            if let Some(purpose) = purpose {
                application = application.with_purpose(purpose);
            }
            if accept_terms {
                application = application.accept_terms();
            }

            let outcome = service.apply(application).await?;
            if !emit(&outcome, format)? {
                println!("{} Application submitted", "✓".green().bold());
                println!();
                println!("  Loan: {}", outcome.loan.id);
                println!("  Status: {}", outcome.state.as_str().bold());
                println!("  Repay: {}", cedis(outcome.quote.total_repayment));
                println!(
                    "  Due: {}",
                    outcome.quote.due_date.format("%Y-%m-%d")
                );
                if let Some(message) = outcome.message {
                    println!("  {}", message.dimmed());
                }
            }
        }
        LoansCommands::Pay { amount, phone } => {
            let mut service = LoanService::new(api);
            service.sync().await?;
            let response = service.pay(amount, phone).await?;
            if !emit(&response, format)? {
                println!("{} Repayment started", "✓".green().bold());
                println!();
                println!("  Payment: {}", response.payment.id);
                println!("  Amount: {}", cedis(response.payment.amount));
                println!("  Status: {}", response.payment.status.bold());
                if let Some(message) = response.message {
                    println!("  {}", message.dimmed());
                }
            }
        }
        LoansCommands::Payments => {
            let payments = api.payment_history().await?.payments;
            if !emit(&payments, format)? {
                print_payments(&payments);
            }
        }
    }
    Ok(())
}

fn print_levels(current: &LoanLevel, eligible: Option<&LoanLevel>, levels: &[LoanLevel]) {
    println!("{}", "Loan levels".bold().cyan());
    println!("{}", "=".repeat(70));
    for level in levels {
        let marker = if level.level_number == current.level_number {
            "current".green().bold()
        } else if eligible.map(|e| e.level_number) == Some(level.level_number) {
            "eligible".yellow()
        } else {
            "".normal()
        };
        println!(
            "  {:>2} {:<12} {} - {} after {} loan(s) {}",
            level.level_number,
            level.name,
            cedis(level.min_amount),
            cedis(level.max_amount),
            level.min_loans_required,
            marker
        );
    }
    println!();
}

fn print_payments(payments: &[PaymentRecord]) {
    if payments.is_empty() {
        println!("{}", "No payments found.".dimmed());
        return;
    }
    println!("{}", "Payments".bold().cyan());
    println!("{}", "=".repeat(70));
    for payment in payments {
        let at = payment
            .created_at
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} {} {} loan {} {}",
            payment.id.bold(),
            format!("[{}]", payment.status),
            cedis(payment.amount),
            payment.loan_id.as_deref().unwrap_or("-"),
            at.dimmed()
        );
    }
    println!();
    println!("Total: {} payment(s)", payments.len());
}

fn print_loans(loans: &[LoanRecord]) {
    if loans.is_empty() {
        println!("{}", "No loans found.".dimmed());
        return;
    }
    println!("{}", "Loans".bold().cyan());
    println!("{}", "=".repeat(70));
    for loan in loans {
        let status = match loan.status() {
            Ok(status) if status.blocks_new_application() => loan.status.green(),
            Ok(_) => loan.status.normal(),
            Err(_) => loan.status.red(),
        };
        let due = loan
            .due_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} {} {} due {}",
            loan.id.bold(),
            format!("[{}]", status),
            cedis(loan.amount),
            due.dimmed()
        );
    }
    println!();
    println!("Total: {} loan(s)", loans.len());
}
