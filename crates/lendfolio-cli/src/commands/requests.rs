use chrono::{Local, NaiveDate};
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use lendfolio_core::ledger::{self, ApprovalTerms, CreditRequest};

use crate::input;

/// Arguments for credit request approval
#[derive(Args)]
pub struct ApproveArgs {
    /// Path to a JSON/YAML file with the credit request
    #[arg(long)]
    pub input: Option<String>,

    /// Override the reference interest rate
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Override the loan duration in months
    #[arg(long)]
    pub duration: Option<u32>,

    /// Origination date; defaults to the current date
    #[arg(long)]
    pub today: Option<NaiveDate>,
}

/// Arguments for credit request rejection
#[derive(Args)]
pub struct RejectArgs {
    /// Path to a JSON/YAML file with the credit request
    #[arg(long)]
    pub input: Option<String>,
}

fn read_request(path: &Option<String>) -> Result<CreditRequest, Box<dyn std::error::Error>> {
    input::read_input(path)?
        .ok_or_else(|| "Provide --input or pipe a credit request on stdin".into())
}

pub fn run_approve(args: ApproveArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request = read_request(&args.input)?;
    let terms = ApprovalTerms {
        interest_rate: args.rate,
        duration: args.duration,
    };
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    let loan = ledger::approve(&mut request, &terms, today)?;
    Ok(serde_json::json!({
        "request": serde_json::to_value(&request)?,
        "loan": serde_json::to_value(&loan)?,
    }))
}

pub fn run_reject(args: RejectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request = read_request(&args.input)?;
    ledger::reject(&mut request)?;
    Ok(serde_json::json!({
        "request": serde_json::to_value(&request)?,
    }))
}
