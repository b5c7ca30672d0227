use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use lendfolio_core::taxonomy;

/// Arguments for risk classification
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ClassifyArgs {
    /// Borrower credit score (0-100)
    #[arg(long)]
    pub score: Decimal,

    /// Clamp out-of-range scores to the nearest band instead of failing
    #[arg(long)]
    pub clamp: bool,
}

pub fn run_classify(args: ClassifyArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let category = if args.clamp {
        taxonomy::classify_clamped(args.score)
    } else {
        taxonomy::classify(args.score)?
    };

    Ok(serde_json::json!({
        "score": args.score.to_string(),
        "category": category.name,
        "label": category.label,
        "score_range": [category.min_score.to_string(), category.max_score.to_string()],
        "default_interest_rate": category.default_interest_rate.to_string(),
        "description": category.description,
    }))
}
