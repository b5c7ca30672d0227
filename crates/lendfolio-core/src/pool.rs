//! Pool allocation: how a lender's committed capital is divided across
//! risk bands, and the lifecycle of the resulting investment pool.

use std::time::Instant;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LendingError;
use crate::store::LendingStore;
use crate::taxonomy::{self, RiskLevel};
use crate::types::{with_metadata, ComputationOutput, Money, Percent, Rate};
use crate::LendingResult;

/// Slack allowed on the percentage sum before a pool can be confirmed.
pub const PERCENTAGE_TOLERANCE: Decimal = dec!(0.1);

const HUNDRED: Decimal = dec!(100);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Coarse preset controlling how concentrated a pool's allocation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiversificationLevel {
    Low,
    Medium,
    High,
}

impl DiversificationLevel {
    /// Fixed preset weights over excellent/good/poor/terrible. Lookup
    /// tables, not computed optimizations.
    fn weights(self) -> [Percent; 4] {
        match self {
            DiversificationLevel::Low => [dec!(60), dec!(40), dec!(0), dec!(0)],
            DiversificationLevel::Medium => [dec!(40), dec!(35), dec!(20), dec!(5)],
            DiversificationLevel::High => [dec!(25), dec!(30), dec!(30), dec!(15)],
        }
    }
}

/// One band's share of a pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolDistribution {
    pub risk_category: RiskLevel,
    pub percentage: Percent,
    pub interest_rate: Rate,
    pub max_loan_amount: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolStatus {
    Draft,
    Active,
    Funded,
    Closed,
}

/// A lender's pre-committed capital allocation. `available_amount` is
/// drawn down by loan origination and reaches zero when the pool is
/// fully deployed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentPool {
    pub id: String,
    pub lender_id: String,
    pub name: String,
    pub total_amount: Money,
    pub available_amount: Money,
    pub distributions: Vec<PoolDistribution>,
    pub status: PoolStatus,
    pub created_at: NaiveDate,
    pub expected_return: Rate,
    pub diversification_level: DiversificationLevel,
    pub auto_invest: bool,
}

/// Parameters for opening a pool. Distributions may be omitted to take
/// the diversification preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolRequest {
    pub id: String,
    pub lender_id: String,
    pub name: String,
    pub total_amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distributions: Option<Vec<PoolDistribution>>,
    pub diversification_level: DiversificationLevel,
    #[serde(default)]
    pub auto_invest: bool,
}

/// Input for the pool model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolInput {
    pub total_amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distributions: Option<Vec<PoolDistribution>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diversification_level: Option<DiversificationLevel>,
}

/// One band of the pool projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandProjection {
    pub risk_category: RiskLevel,
    pub percentage: Percent,
    pub interest_rate: Rate,
    /// Capital committed to this band.
    pub allocation_amount: Money,
    pub max_loan_amount: Money,
}

/// Output of the pool model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolProjection {
    pub total_amount: Money,
    pub expected_return: Rate,
    pub bands: Vec<BandProjection>,
}

// ---------------------------------------------------------------------------
// Pure computation
// ---------------------------------------------------------------------------

/// Check a distribution before pool confirmation: every percentage in
/// [0, 100], at most one entry per band, and a sum of 100 within
/// tolerance.
pub fn validate_distribution(distributions: &[PoolDistribution]) -> LendingResult<()> {
    let mut seen: Vec<RiskLevel> = Vec::with_capacity(distributions.len());
    for dist in distributions {
        if dist.percentage < Decimal::ZERO || dist.percentage > HUNDRED {
            return Err(LendingError::InvalidPercentage {
                category: dist.risk_category.to_string(),
                percentage: dist.percentage,
            });
        }
        if seen.contains(&dist.risk_category) {
            return Err(LendingError::DuplicateCategory {
                category: dist.risk_category.to_string(),
            });
        }
        seen.push(dist.risk_category);
    }

    let total: Percent = distributions.iter().map(|d| d.percentage).sum();
    if (total - HUNDRED).abs() > PERCENTAGE_TOLERANCE {
        return Err(LendingError::UnbalancedDistribution {
            total,
            tolerance: PERCENTAGE_TOLERANCE,
        });
    }

    Ok(())
}

/// The pool's headline return: the percentage-weighted average of the
/// per-band rates. Recomputed whenever any entry changes.
pub fn expected_return(distributions: &[PoolDistribution]) -> Rate {
    distributions
        .iter()
        .map(|d| d.percentage / HUNDRED * d.interest_rate)
        .sum()
}

/// Seed a full four-band distribution from a diversification preset.
/// Every band is present (zero-weighted where the preset excludes it),
/// carrying the taxonomy default rate and the default per-band cap.
pub fn auto_distribute(level: DiversificationLevel, pool_total: Money) -> Vec<PoolDistribution> {
    RiskLevel::ALL
        .iter()
        .zip(level.weights())
        .map(|(&risk_category, percentage)| PoolDistribution {
            risk_category,
            percentage,
            interest_rate: taxonomy::default_rate(risk_category),
            max_loan_amount: default_max_loan_amount(risk_category, pool_total),
        })
        .collect()
}

/// Default cap on a single loan drawn from the band: a fraction of the
/// pool total, bounded by a fixed absolute ceiling.
pub fn default_max_loan_amount(level: RiskLevel, pool_total: Money) -> Money {
    let (fraction, cap) = match level {
        RiskLevel::Excellent => (dec!(0.30), dec!(50000)),
        RiskLevel::Good => (dec!(0.20), dec!(30000)),
        RiskLevel::Poor => (dec!(0.15), dec!(20000)),
        RiskLevel::Terrible => (dec!(0.10), dec!(10000)),
    };
    (pool_total * fraction).min(cap)
}

/// Full pool model: validation, expected return, and per-band amounts.
pub fn model_pool(input: &PoolInput) -> LendingResult<ComputationOutput<PoolProjection>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.total_amount <= Decimal::ZERO {
        return Err(LendingError::InvalidTerm {
            field: "total_amount".into(),
            reason: "Pool total must be positive".into(),
        });
    }

    let distributions = match (&input.distributions, input.diversification_level) {
        (Some(dists), _) => dists.clone(),
        (None, Some(level)) => auto_distribute(level, input.total_amount),
        (None, None) => {
            return Err(LendingError::InvalidTerm {
                field: "distributions".into(),
                reason: "Provide distributions or a diversification level".into(),
            })
        }
    };

    validate_distribution(&distributions)?;

    let total_pct: Percent = distributions.iter().map(|d| d.percentage).sum();
    if total_pct != HUNDRED {
        warnings.push(format!(
            "Percentages sum to {}, within tolerance of 100",
            total_pct
        ));
    }

    let bands = distributions
        .iter()
        .map(|d| BandProjection {
            risk_category: d.risk_category,
            percentage: d.percentage,
            interest_rate: d.interest_rate,
            allocation_amount: (input.total_amount * d.percentage / HUNDRED).round_dp(2),
            max_loan_amount: d.max_loan_amount,
        })
        .collect();

    let projection = PoolProjection {
        total_amount: input.total_amount,
        expected_return: expected_return(&distributions),
        bands,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Risk-band pool allocation — weighted expected return and band caps",
        &serde_json::json!({
            "total_amount": input.total_amount.to_string(),
            "bands": distributions.len(),
        }),
        warnings,
        elapsed,
        projection,
    ))
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Open a pool against the lender's balance: validate the distribution,
/// debit `total_amount` exactly once, and persist the pool as `active`
/// with its full amount available. Validation precedes the debit, so a
/// failure leaves the store untouched.
pub fn open_pool<S: LendingStore + ?Sized>(
    store: &mut S,
    request: PoolRequest,
    created_at: NaiveDate,
) -> LendingResult<InvestmentPool> {
    if request.total_amount <= Decimal::ZERO {
        return Err(LendingError::InvalidTerm {
            field: "total_amount".into(),
            reason: "Pool total must be positive".into(),
        });
    }

    let distributions = match request.distributions {
        Some(dists) => dists,
        None => auto_distribute(request.diversification_level, request.total_amount),
    };
    validate_distribution(&distributions)?;

    store.debit(&request.lender_id, request.total_amount)?;

    let pool = InvestmentPool {
        id: request.id,
        lender_id: request.lender_id,
        name: request.name,
        total_amount: request.total_amount,
        available_amount: request.total_amount,
        expected_return: expected_return(&distributions),
        distributions,
        status: PoolStatus::Active,
        created_at,
        diversification_level: request.diversification_level,
        auto_invest: request.auto_invest,
    };
    store.insert_pool(pool.clone());

    Ok(pool)
}

/// Draw committed capital out of an active pool during loan
/// origination; the pool becomes `funded` once fully deployed.
pub fn draw_down(pool: &mut InvestmentPool, amount: Money) -> LendingResult<()> {
    if pool.status != PoolStatus::Active {
        return Err(LendingError::InvalidState {
            entity: "pool".into(),
            id: pool.id.clone(),
            expected: "active".into(),
            actual: format!("{:?}", pool.status).to_lowercase(),
        });
    }
    if amount <= Decimal::ZERO {
        return Err(LendingError::InvalidTerm {
            field: "amount".into(),
            reason: "Draw-down amount must be positive".into(),
        });
    }
    if amount > pool.available_amount {
        return Err(LendingError::InsufficientFunds {
            lender_id: pool.lender_id.clone(),
            required: amount,
            available: pool.available_amount,
        });
    }

    pool.available_amount -= amount;
    if pool.available_amount.is_zero() {
        pool.status = PoolStatus::Funded;
    }
    Ok(())
}

/// Close a fully-deployed pool once its constituent loans resolve.
pub fn close_pool(pool: &mut InvestmentPool) -> LendingResult<()> {
    if pool.status != PoolStatus::Funded {
        return Err(LendingError::InvalidState {
            entity: "pool".into(),
            id: pool.id.clone(),
            expected: "funded".into(),
            actual: format!("{:?}", pool.status).to_lowercase(),
        });
    }
    pool.status = PoolStatus::Closed;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, LendingStore};
    use rust_decimal_macros::dec;

    fn entry(category: RiskLevel, percentage: Decimal, rate: Decimal) -> PoolDistribution {
        PoolDistribution {
            risk_category: category,
            percentage,
            interest_rate: rate,
            max_loan_amount: dec!(10000),
        }
    }

    fn sixty_forty() -> Vec<PoolDistribution> {
        vec![
            entry(RiskLevel::Excellent, dec!(60), dec!(8)),
            entry(RiskLevel::Good, dec!(40), dec!(12)),
        ]
    }

    // -----------------------------------------------------------------------
    // 1. Reference scenario: 60/40 at 8/12 yields 9.6
    // -----------------------------------------------------------------------
    #[test]
    fn test_expected_return_reference() {
        assert_eq!(expected_return(&sixty_forty()), dec!(9.6));
    }

    // -----------------------------------------------------------------------
    // 2. Expected return is linear in rates and order-invariant
    // -----------------------------------------------------------------------
    #[test]
    fn test_expected_return_linear_and_order_invariant() {
        let base = sixty_forty();
        let scaled: Vec<PoolDistribution> = base
            .iter()
            .map(|d| PoolDistribution {
                interest_rate: d.interest_rate * dec!(3),
                ..d.clone()
            })
            .collect();
        assert_eq!(expected_return(&scaled), expected_return(&base) * dec!(3));

        let mut reversed = base.clone();
        reversed.reverse();
        assert_eq!(expected_return(&reversed), expected_return(&base));
    }

    // -----------------------------------------------------------------------
    // 3. Validation accepts exact sums regardless of entry count
    // -----------------------------------------------------------------------
    #[test]
    fn test_validation_accepts_exact_sums() {
        assert!(validate_distribution(&sixty_forty()).is_ok());

        let four_way = vec![
            entry(RiskLevel::Excellent, dec!(25), dec!(8)),
            entry(RiskLevel::Good, dec!(30), dec!(12)),
            entry(RiskLevel::Poor, dec!(30), dec!(18)),
            entry(RiskLevel::Terrible, dec!(15), dec!(25)),
        ];
        assert!(validate_distribution(&four_way).is_ok());

        let single = vec![entry(RiskLevel::Good, dec!(100), dec!(12))];
        assert!(validate_distribution(&single).is_ok());
    }

    // -----------------------------------------------------------------------
    // 4. Tolerance: 100 ± 0.1 passes, beyond fails
    // -----------------------------------------------------------------------
    #[test]
    fn test_validation_tolerance() {
        let near = vec![
            entry(RiskLevel::Excellent, dec!(60.05), dec!(8)),
            entry(RiskLevel::Good, dec!(40.00), dec!(12)),
        ];
        assert!(validate_distribution(&near).is_ok());

        let off = vec![
            entry(RiskLevel::Excellent, dec!(60.2), dec!(8)),
            entry(RiskLevel::Good, dec!(40), dec!(12)),
        ];
        match validate_distribution(&off) {
            Err(LendingError::UnbalancedDistribution { total, .. }) => {
                assert_eq!(total, dec!(100.2))
            }
            other => panic!("Expected UnbalancedDistribution, got {:?}", other),
        }
    }

    // -----------------------------------------------------------------------
    // 5. Out-of-bounds percentages are rejected per entry
    // -----------------------------------------------------------------------
    #[test]
    fn test_validation_percentage_bounds() {
        let negative = vec![
            entry(RiskLevel::Excellent, dec!(-5), dec!(8)),
            entry(RiskLevel::Good, dec!(105), dec!(12)),
        ];
        match validate_distribution(&negative) {
            Err(LendingError::InvalidPercentage { percentage, .. }) => {
                assert_eq!(percentage, dec!(-5))
            }
            other => panic!("Expected InvalidPercentage, got {:?}", other),
        }
    }

    // -----------------------------------------------------------------------
    // 6. Duplicate bands are rejected
    // -----------------------------------------------------------------------
    #[test]
    fn test_validation_duplicate_band() {
        let doubled = vec![
            entry(RiskLevel::Good, dec!(50), dec!(12)),
            entry(RiskLevel::Good, dec!(50), dec!(14)),
        ];
        assert!(matches!(
            validate_distribution(&doubled),
            Err(LendingError::DuplicateCategory { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // 7. Presets: weights, default rates, validity
    // -----------------------------------------------------------------------
    #[test]
    fn test_auto_distribute_presets() {
        let low = auto_distribute(DiversificationLevel::Low, dec!(50000));
        let weights: Vec<Decimal> = low.iter().map(|d| d.percentage).collect();
        assert_eq!(weights, [dec!(60), dec!(40), dec!(0), dec!(0)]);
        assert_eq!(low[0].interest_rate, dec!(8));
        assert_eq!(low[3].interest_rate, dec!(25));

        let medium = auto_distribute(DiversificationLevel::Medium, dec!(50000));
        let weights: Vec<Decimal> = medium.iter().map(|d| d.percentage).collect();
        assert_eq!(weights, [dec!(40), dec!(35), dec!(20), dec!(5)]);

        let high = auto_distribute(DiversificationLevel::High, dec!(50000));
        let weights: Vec<Decimal> = high.iter().map(|d| d.percentage).collect();
        assert_eq!(weights, [dec!(25), dec!(30), dec!(30), dec!(15)]);

        // Every preset is itself a valid distribution
        for dists in [low, medium, high] {
            validate_distribution(&dists).unwrap();
        }
    }

    // -----------------------------------------------------------------------
    // 8. Per-band caps: fraction of pool bounded by the absolute cap
    // -----------------------------------------------------------------------
    #[test]
    fn test_default_max_loan_amount() {
        // Small pool: the fraction binds
        assert_eq!(
            default_max_loan_amount(RiskLevel::Excellent, dec!(100000)),
            dec!(30000)
        );
        // Large pool: the ceiling binds
        assert_eq!(
            default_max_loan_amount(RiskLevel::Excellent, dec!(1000000)),
            dec!(50000)
        );
        assert_eq!(
            default_max_loan_amount(RiskLevel::Terrible, dec!(50000)),
            dec!(5000)
        );
        assert_eq!(
            default_max_loan_amount(RiskLevel::Terrible, dec!(500000)),
            dec!(10000)
        );
    }

    // -----------------------------------------------------------------------
    // 9. Pool model: band amounts and expected return
    // -----------------------------------------------------------------------
    #[test]
    fn test_model_pool() {
        let input = PoolInput {
            total_amount: dec!(20000),
            distributions: Some(sixty_forty()),
            diversification_level: None,
        };
        let result = model_pool(&input).unwrap();
        let projection = &result.result;

        assert_eq!(projection.expected_return, dec!(9.6));
        assert_eq!(projection.bands[0].allocation_amount, dec!(12000));
        assert_eq!(projection.bands[1].allocation_amount, dec!(8000));
        assert!(result.warnings.is_empty());
    }

    // -----------------------------------------------------------------------
    // 10. Pool model warns when the sum is inside tolerance but not 100
    // -----------------------------------------------------------------------
    #[test]
    fn test_model_pool_tolerance_warning() {
        let input = PoolInput {
            total_amount: dec!(10000),
            distributions: Some(vec![
                entry(RiskLevel::Excellent, dec!(60.05), dec!(8)),
                entry(RiskLevel::Good, dec!(40), dec!(12)),
            ]),
            diversification_level: None,
        };
        let result = model_pool(&input).unwrap();
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("within tolerance")));
    }

    // -----------------------------------------------------------------------
    // 11. Opening a pool debits the lender exactly once
    // -----------------------------------------------------------------------
    #[test]
    fn test_open_pool_debits_balance() {
        let mut store = InMemoryStore::default();
        store.credit("lender_01", dec!(30000));

        let pool = open_pool(
            &mut store,
            PoolRequest {
                id: "pool_01".into(),
                lender_id: "lender_01".into(),
                name: "Balanced".into(),
                total_amount: dec!(20000),
                distributions: None,
                diversification_level: DiversificationLevel::Medium,
                auto_invest: true,
            },
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        )
        .unwrap();

        assert_eq!(store.balance("lender_01"), dec!(10000));
        assert_eq!(pool.status, PoolStatus::Active);
        assert_eq!(pool.available_amount, dec!(20000));
        assert_eq!(pool.distributions.len(), 4);
        assert!(store.pool("pool_01").is_some());
    }

    // -----------------------------------------------------------------------
    // 12. Insufficient balance fails without mutating the store
    // -----------------------------------------------------------------------
    #[test]
    fn test_open_pool_insufficient_funds() {
        let mut store = InMemoryStore::default();
        store.credit("lender_01", dec!(5000));

        let err = open_pool(
            &mut store,
            PoolRequest {
                id: "pool_02".into(),
                lender_id: "lender_01".into(),
                name: "Too big".into(),
                total_amount: dec!(20000),
                distributions: None,
                diversification_level: DiversificationLevel::Low,
                auto_invest: false,
            },
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        )
        .unwrap_err();

        assert!(matches!(err, LendingError::InsufficientFunds { .. }));
        assert_eq!(store.balance("lender_01"), dec!(5000));
        assert!(store.pool("pool_02").is_none());
    }

    // -----------------------------------------------------------------------
    // 13. Draw-down funds the pool at zero and closes from funded
    // -----------------------------------------------------------------------
    #[test]
    fn test_draw_down_lifecycle() {
        let mut store = InMemoryStore::default();
        store.credit("lender_01", dec!(10000));
        let mut pool = open_pool(
            &mut store,
            PoolRequest {
                id: "pool_03".into(),
                lender_id: "lender_01".into(),
                name: "Lifecycle".into(),
                total_amount: dec!(10000),
                distributions: None,
                diversification_level: DiversificationLevel::High,
                auto_invest: false,
            },
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        )
        .unwrap();

        draw_down(&mut pool, dec!(6000)).unwrap();
        assert_eq!(pool.available_amount, dec!(4000));
        assert_eq!(pool.status, PoolStatus::Active);

        // Over-draw fails
        assert!(matches!(
            draw_down(&mut pool, dec!(5000)),
            Err(LendingError::InsufficientFunds { .. })
        ));

        draw_down(&mut pool, dec!(4000)).unwrap();
        assert_eq!(pool.status, PoolStatus::Funded);

        // Funded pools accept no further draws
        assert!(matches!(
            draw_down(&mut pool, dec!(1)),
            Err(LendingError::InvalidState { .. })
        ));

        close_pool(&mut pool).unwrap();
        assert_eq!(pool.status, PoolStatus::Closed);
        assert!(close_pool(&mut pool).is_err());
    }
}
