use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use lendfolio_core::schedule::{self, LoanTerms, RepaymentInput};

use crate::input;

/// Arguments for installment schedule derivation
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to a JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Flat interest rate over the loan term (e.g. 12 = 12%)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Number of monthly installments
    #[arg(long)]
    pub periods: Option<u32>,

    /// Origination date (YYYY-MM-DD); installments start one month later
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Installments already received
    #[arg(long, default_value_t = 0)]
    pub payments_received: u32,

    /// Evaluate overdue status as of this date
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let repayment: RepaymentInput = match input::read_input(&args.input)? {
        Some(parsed) => parsed,
        None => RepaymentInput {
            terms: LoanTerms {
                principal: args
                    .principal
                    .ok_or("--principal is required (or provide --input)")?,
                interest_rate: args.rate.ok_or("--rate is required (or provide --input)")?,
                periods: args
                    .periods
                    .ok_or("--periods is required (or provide --input)")?,
                start_date: args
                    .start_date
                    .ok_or("--start-date is required (or provide --input)")?,
            },
            payments_received: args.payments_received,
            as_of: args.as_of,
        },
    };

    let result = schedule::model_repayment(&repayment)?;
    Ok(serde_json::to_value(&result)?)
}
