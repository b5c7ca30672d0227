use clap::Args;
use serde_json::Value;

use lendfolio_core::portfolio::{
    self, LoanStatus, PortfolioFilter, PortfolioLoan, SortKey, SortOrder,
};
use lendfolio_core::taxonomy::RiskLevel;

use crate::input;

/// Arguments for portfolio statistics
#[derive(Args)]
pub struct StatsArgs {
    /// Path to a JSON/YAML file with a loan array
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for the filtered/sorted portfolio view
#[derive(Args)]
pub struct FilterArgs {
    /// Path to a JSON/YAML file with a loan array
    #[arg(long)]
    pub input: Option<String>,

    /// Loan status filter: all, active, late, completed, defaulted
    #[arg(long, default_value = "all")]
    pub status: String,

    /// Risk band filter: all, excellent, good, poor, terrible
    #[arg(long, default_value = "all")]
    pub risk_category: String,

    /// Sort key: amount, rate, payment_date, risk
    #[arg(long, default_value = "amount")]
    pub sort_by: String,

    /// Sort order: asc, desc
    #[arg(long, default_value = "asc")]
    pub order: String,
}

fn read_loans(path: &Option<String>) -> Result<Vec<PortfolioLoan>, Box<dyn std::error::Error>> {
    input::read_input(path)?
        .ok_or_else(|| "Provide --input or pipe a loan array on stdin".into())
}

fn parse_status(s: &str) -> Result<Option<LoanStatus>, Box<dyn std::error::Error>> {
    match s.to_lowercase().as_str() {
        "all" => Ok(None),
        "active" => Ok(Some(LoanStatus::Active)),
        "late" => Ok(Some(LoanStatus::Late)),
        "completed" => Ok(Some(LoanStatus::Completed)),
        "defaulted" => Ok(Some(LoanStatus::Defaulted)),
        other => Err(format!(
            "Unknown status '{}'. Use: all, active, late, completed, defaulted",
            other
        )
        .into()),
    }
}

fn parse_category(s: &str) -> Result<Option<RiskLevel>, Box<dyn std::error::Error>> {
    if s.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    Ok(Some(s.parse::<RiskLevel>()?))
}

fn parse_sort_key(s: &str) -> Result<SortKey, Box<dyn std::error::Error>> {
    match s.to_lowercase().as_str() {
        "amount" => Ok(SortKey::Amount),
        "rate" => Ok(SortKey::Rate),
        "payment_date" => Ok(SortKey::PaymentDate),
        "risk" => Ok(SortKey::Risk),
        other => Err(format!(
            "Unknown sort key '{}'. Use: amount, rate, payment_date, risk",
            other
        )
        .into()),
    }
}

fn parse_order(s: &str) -> Result<SortOrder, Box<dyn std::error::Error>> {
    match s.to_lowercase().as_str() {
        "asc" => Ok(SortOrder::Asc),
        "desc" => Ok(SortOrder::Desc),
        other => Err(format!("Unknown sort order '{}'. Use: asc, desc", other).into()),
    }
}

pub fn run_stats(args: StatsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loans = read_loans(&args.input)?;
    let result = portfolio::analyze_portfolio(&loans)?;
    Ok(serde_json::to_value(&result)?)
}

pub fn run_filter(args: FilterArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loans = read_loans(&args.input)?;
    let filter = PortfolioFilter {
        status: parse_status(&args.status)?,
        risk_category: parse_category(&args.risk_category)?,
        sort_by: parse_sort_key(&args.sort_by)?,
        sort_order: parse_order(&args.order)?,
    };

    let view = portfolio::filter_and_sort(&loans, &filter);
    Ok(serde_json::to_value(&view)?)
}
