use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use lendfolio_core::pool::{self, DiversificationLevel, PoolDistribution, PoolInput};

use crate::input;

/// Arguments for distribution validation
#[derive(Args)]
pub struct ValidateArgs {
    /// Path to a JSON/YAML file with a distribution array
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for expected-return calculation
#[derive(Args)]
pub struct ExpectedReturnArgs {
    /// Path to a JSON/YAML file with a distribution array
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for preset-driven distribution seeding
#[derive(Args)]
pub struct AutoDistributeArgs {
    /// Diversification level: low, medium, high
    #[arg(long)]
    pub level: DiversificationLevelArg,

    /// Pool total amount, used to derive per-band loan caps
    #[arg(long)]
    pub total: Decimal,
}

/// Arguments for the full pool model
#[derive(Args)]
pub struct PoolArgs {
    /// Path to a JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Pool total amount
    #[arg(long)]
    pub total: Option<Decimal>,

    /// Diversification preset when no explicit distributions are given
    #[arg(long)]
    pub level: Option<DiversificationLevelArg>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum DiversificationLevelArg {
    Low,
    Medium,
    High,
}

impl From<DiversificationLevelArg> for DiversificationLevel {
    fn from(arg: DiversificationLevelArg) -> Self {
        match arg {
            DiversificationLevelArg::Low => DiversificationLevel::Low,
            DiversificationLevelArg::Medium => DiversificationLevel::Medium,
            DiversificationLevelArg::High => DiversificationLevel::High,
        }
    }
}

fn read_distributions(
    path: &Option<String>,
) -> Result<Vec<PoolDistribution>, Box<dyn std::error::Error>> {
    input::read_input(path)?
        .ok_or_else(|| "Provide --input or pipe a distribution array on stdin".into())
}

pub fn run_validate(args: ValidateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let distributions = read_distributions(&args.input)?;
    pool::validate_distribution(&distributions)?;

    let total: Decimal = distributions.iter().map(|d| d.percentage).sum();
    Ok(serde_json::json!({
        "valid": true,
        "entries": distributions.len(),
        "percentage_total": total.to_string(),
        "expected_return": pool::expected_return(&distributions).to_string(),
    }))
}

pub fn run_expected_return(args: ExpectedReturnArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let distributions = read_distributions(&args.input)?;
    Ok(serde_json::json!({
        "expected_return": pool::expected_return(&distributions).to_string(),
        "entries": distributions.len(),
    }))
}

pub fn run_auto_distribute(args: AutoDistributeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let distributions = pool::auto_distribute(args.level.into(), args.total);
    Ok(serde_json::json!({
        "distributions": serde_json::to_value(&distributions)?,
        "expected_return": pool::expected_return(&distributions).to_string(),
    }))
}

pub fn run_pool(args: PoolArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let pool_input: PoolInput = match input::read_input(&args.input)? {
        Some(parsed) => parsed,
        None => PoolInput {
            total_amount: args.total.ok_or("--total is required (or provide --input)")?,
            distributions: None,
            diversification_level: Some(
                args.level
                    .ok_or("--level is required (or provide --input)")?
                    .into(),
            ),
        },
    };

    let result = pool::model_pool(&pool_input)?;
    Ok(serde_json::to_value(&result)?)
}
