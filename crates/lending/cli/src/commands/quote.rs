//! Fee quote command

use chrono::Utc;
use clap::Args;
use colored::Colorize;

use lending_types::{LoanQuote, TermDays};

use crate::commands::load_config;
use crate::error::CliResult;
use crate::output::{cedis, emit, OutputFormat};

/// Arguments for `cedi-loan quote`
#[derive(Args)]
pub struct QuoteArgs {
    /// Principal in GHS
    pub amount: f64,

    /// Term in days (7, 14, 30)
    #[arg(short, long, default_value = "7")]
    pub term: TermDays,

    /// Quote every available term side by side
    #[arg(long)]
    pub all_terms: bool,

    /// Config JSON file (a `/config` response or its `data` member)
    #[arg(short, long)]
    pub config: Option<String>,
}

/// Execute quote command
pub async fn execute(args: QuoteArgs, format: OutputFormat) -> CliResult<()> {
    let config = load_config(args.config.as_deref())?;
    let calculator = config.calculator();
    let now = Utc::now();

    let quotes = if args.all_terms {
        calculator.quote_terms(args.amount, &config.loan_terms_available, now)
    } else {
        vec![calculator.quote_at(args.amount, args.term, now)?]
    };

    if args.all_terms {
        if emit(&quotes, format)? {
            return Ok(());
        }
    } else if let Some(quote) = quotes.first() {
        if emit(quote, format)? {
            return Ok(());
        }
    }

    for quote in &quotes {
        print_quote(quote);
    }
    Ok(())
}

fn print_quote(quote: &LoanQuote) {
    println!(
        "{} {} over {}",
        "Loan Quote:".bold().cyan(),
        cedis(quote.principal).bold(),
        quote.term.label()
    );
    println!("{}", "=".repeat(50));
    for (label, amount) in quote.fee_lines() {
        println!("  {:<22} {:>16}", label, cedis(amount));
    }
    println!("  {}", "-".repeat(39).dimmed());
    println!(
        "  {:<22} {:>16}  ({:.0}%)",
        "Total Fees",
        cedis(quote.total_fees),
        quote.total_fee_rate_pct()
    );
    println!(
        "  {:<22} {:>16}",
        "Total Repayment".bold(),
        cedis(quote.total_repayment).green().bold()
    );
    println!(
        "  {:<22} {:>16}",
        "Due Date",
        quote.due_date.format("%Y-%m-%d").to_string()
    );
    println!();
}
