use clap::Args;
use serde_json::Value;

use lendfolio_core::fixtures::DemoPortfolio;

/// Arguments for seeded demo data generation
#[derive(Args)]
pub struct SampleArgs {
    /// Seed driving every generated record; same seed, same output
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of resolved loans to generate
    #[arg(long, default_value_t = 8)]
    pub loans: usize,
}

pub fn run_sample(args: SampleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let demo = DemoPortfolio::seeded(args.seed, args.loans)?;
    Ok(serde_json::to_value(&demo)?)
}
