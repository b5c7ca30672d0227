//! Risk band taxonomy: the static partition of borrower credit scores
//! into four bands, each carrying a preset interest rate.
//!
//! Scores live in [0, 100]. The four bands are contiguous and
//! non-overlapping, so every in-domain score maps to exactly one band.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LendingError;
use crate::types::{Rate, Score};
use crate::LendingResult;

const SCORE_MIN: Decimal = Decimal::ZERO;
const SCORE_MAX: Decimal = dec!(100);

/// The four credit-risk bands, strongest first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Excellent,
    Good,
    Poor,
    Terrible,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Excellent,
        RiskLevel::Good,
        RiskLevel::Poor,
        RiskLevel::Terrible,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Excellent => "excellent",
            RiskLevel::Good => "good",
            RiskLevel::Poor => "poor",
            RiskLevel::Terrible => "terrible",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = LendingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "excellent" => Ok(RiskLevel::Excellent),
            "good" => Ok(RiskLevel::Good),
            "poor" => Ok(RiskLevel::Poor),
            "terrible" => Ok(RiskLevel::Terrible),
            other => Err(LendingError::NotFound {
                entity: "risk category".into(),
                id: other.into(),
            }),
        }
    }
}

/// One band of the taxonomy. Immutable; the full table is a module
/// constant.
#[derive(Debug, Clone, Serialize)]
pub struct RiskCategory {
    pub name: RiskLevel,
    pub label: &'static str,
    pub min_score: Decimal,
    pub max_score: Decimal,
    pub default_interest_rate: Rate,
    pub description: &'static str,
}

const CATEGORIES: [RiskCategory; 4] = [
    RiskCategory {
        name: RiskLevel::Excellent,
        label: "Excellent",
        min_score: dec!(80),
        max_score: dec!(100),
        default_interest_rate: dec!(8),
        description: "Borrowers with an excellent credit history",
    },
    RiskCategory {
        name: RiskLevel::Good,
        label: "Good",
        min_score: dec!(50),
        max_score: dec!(79),
        default_interest_rate: dec!(12),
        description: "Borrowers with moderate risk",
    },
    RiskCategory {
        name: RiskLevel::Poor,
        label: "Poor",
        min_score: dec!(30),
        max_score: dec!(49),
        default_interest_rate: dec!(18),
        description: "Borrowers with high risk",
    },
    RiskCategory {
        name: RiskLevel::Terrible,
        label: "Terrible",
        min_score: dec!(0),
        max_score: dec!(29),
        default_interest_rate: dec!(25),
        description: "Borrowers with very high risk",
    },
];

/// The full taxonomy, strongest band first.
pub fn categories() -> &'static [RiskCategory; 4] {
    &CATEGORIES
}

/// Map a score onto its band. Rejects scores outside [0, 100]; see
/// [`classify_clamped`] for the clamping variant used when materializing
/// loans from already-validated requests.
pub fn classify(score: Score) -> LendingResult<&'static RiskCategory> {
    if score < SCORE_MIN || score > SCORE_MAX {
        return Err(LendingError::ScoreOutOfRange { score });
    }
    Ok(band_for(score))
}

/// Map a score onto its band, clamping out-of-domain values to the
/// nearest bound first. Never fails.
pub fn classify_clamped(score: Score) -> &'static RiskCategory {
    band_for(score.clamp(SCORE_MIN, SCORE_MAX))
}

/// Preset rate used to seed a new pool distribution entry before the
/// lender customizes it.
pub fn default_rate(level: RiskLevel) -> Rate {
    CATEGORIES
        .iter()
        .find(|c| c.name == level)
        .map(|c| c.default_interest_rate)
        .unwrap_or(dec!(10))
}

// Bands are ordered by descending floor, so the first band whose floor
// the score reaches is the match. Fractional scores between two integer
// bounds (e.g. 79.5) land in the band below the upper floor.
fn band_for(score: Score) -> &'static RiskCategory {
    CATEGORIES
        .iter()
        .find(|c| score >= c.min_score)
        .unwrap_or(&CATEGORIES[3])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
