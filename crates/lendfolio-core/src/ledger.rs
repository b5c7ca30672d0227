//! Credit request ledger: one-way resolution of borrower requests and
//! their conversion into portfolio loans.
//!
//! A request is acted upon exactly once. Approving or rejecting an
//! already-resolved request fails; it never silently succeeds.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LendingError;
use crate::pool;
use crate::portfolio::{LoanStatus, PaymentRecord, PaymentStatus, PortfolioLoan};
use crate::schedule::{self, LoanTerms};
use crate::store::LendingStore;
use crate::taxonomy;
use crate::types::{Currency, Money, Rate, Score};
use crate::LendingResult;

/// Reference rate applied when the lender does not override terms.
pub const DEFAULT_APPROVAL_RATE: Rate = dec!(15);
/// Reference term length when the request does not carry one.
pub const DEFAULT_APPROVAL_PERIODS: u32 = 12;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

/// A borrower's application for credit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditRequest {
    pub id: String,
    pub borrower_id: String,
    pub borrower_name: String,
    pub amount: Money,
    #[serde(default)]
    pub currency: Currency,
    /// Requested term length in months; 0 means "no preference".
    pub duration: u32,
    pub risk_score: Score,
    pub status: RequestStatus,
    #[serde(default)]
    pub documents: Vec<String>,
    pub request_date: NaiveDate,
}

/// Optional overrides applied at approval time. Absent fields fall back
/// to the request's own duration and the reference rate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApprovalTerms {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

/// Outcome of a store-level request resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub request_id: String,
    pub status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan: Option<PortfolioLoan>,
    /// Pool that auto-invested into the loan, when one matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funded_by: Option<String>,
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Approve a pending request and materialize the loan its terms define.
/// The borrower's band is fixed here, from the request's risk score, and
/// never changes afterwards.
pub fn approve(
    request: &mut CreditRequest,
    terms: &ApprovalTerms,
    today: NaiveDate,
) -> LendingResult<PortfolioLoan> {
    require_pending(request)?;

    let duration = terms.duration.unwrap_or(if request.duration > 0 {
        request.duration
    } else {
        DEFAULT_APPROVAL_PERIODS
    });
    let interest_rate = terms.interest_rate.unwrap_or(DEFAULT_APPROVAL_RATE);

    let loan_terms = LoanTerms {
        principal: request.amount,
        interest_rate,
        periods: duration,
        start_date: today,
    };
    let installments = schedule::generate_schedule(&loan_terms)?;
    let category = taxonomy::classify_clamped(request.risk_score);

    let loan_id = format!("loan_{}", request.id);
    let payment_history = installments
        .iter()
        .map(|i| PaymentRecord {
            id: format!("pay_{}_{}", loan_id, i.number),
            loan_id: loan_id.clone(),
            amount: i.amount,
            due_date: i.due_date,
            paid_date: None,
            status: PaymentStatus::Pending,
            late_fees: None,
        })
        .collect();

    let loan = PortfolioLoan {
        id: loan_id,
        borrower_id: request.borrower_id.clone(),
        borrower_name: request.borrower_name.clone(),
        borrower_score: request.risk_score,
        amount: request.amount,
        currency: request.currency.clone(),
        interest_rate,
        duration,
        start_date: today,
        next_payment_date: Some(installments[0].due_date),
        status: LoanStatus::Active,
        payments_received: 0,
        total_payments: duration,
        monthly_payment: installments[0].amount,
        total_interest_earned: Money::ZERO,
        risk_category: category.name,
        investment_pool_id: None,
        payment_history,
    };

    request.status = RequestStatus::Approved;
    Ok(loan)
}

/// Reject a pending request. One-way; a resolved request stays resolved.
pub fn reject(request: &mut CreditRequest) -> LendingResult<()> {
    require_pending(request)?;
    request.status = RequestStatus::Rejected;
    Ok(())
}

fn require_pending(request: &CreditRequest) -> LendingResult<()> {
    if request.status != RequestStatus::Pending {
        return Err(LendingError::InvalidState {
            entity: "credit request".into(),
            id: request.id.clone(),
            expected: "pending".into(),
            actual: request.status.as_str().into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Store-level resolution
// ---------------------------------------------------------------------------

/// Resolve a request held in the store, all-or-nothing. Approval
/// persists the new loan and then tries auto-invest matching: the first
/// active auto-invest pool whose distribution covers the borrower's band
/// (non-zero weight, cap at or above the loan amount, enough capital
/// available) funds the loan. No match leaves the loan unfunded;
/// matching never fails the resolution.
pub fn resolve_request<S: LendingStore + ?Sized>(
    store: &mut S,
    request_id: &str,
    decision: Decision,
    terms: &ApprovalTerms,
    today: NaiveDate,
) -> LendingResult<Resolution> {
    let request = store
        .request_mut(request_id)
        .ok_or_else(|| LendingError::NotFound {
            entity: "credit request".into(),
            id: request_id.into(),
        })?;

    match decision {
        Decision::Reject => {
            reject(request)?;
            Ok(Resolution {
                request_id: request_id.into(),
                status: RequestStatus::Rejected,
                loan: None,
                funded_by: None,
            })
        }
        Decision::Approve => {
            let mut loan = approve(request, terms, today)?;
            let funded_by = match_auto_invest(store, &mut loan)?;
            store.insert_loan(loan.clone());
            Ok(Resolution {
                request_id: request_id.into(),
                status: RequestStatus::Approved,
                loan: Some(loan),
                funded_by,
            })
        }
    }
}

/// First-fit auto-invest matching over the store's pools, in insertion
/// order.
fn match_auto_invest<S: LendingStore + ?Sized>(
    store: &mut S,
    loan: &mut PortfolioLoan,
) -> LendingResult<Option<String>> {
    let candidate = store
        .pools()
        .iter()
        .find(|p| {
            p.auto_invest
                && p.status == pool::PoolStatus::Active
                && p.available_amount >= loan.amount
                && p.distributions.iter().any(|d| {
                    d.risk_category == loan.risk_category
                        && d.percentage > Money::ZERO
                        && d.max_loan_amount >= loan.amount
                })
        })
        .map(|p| p.id.clone());

    let Some(pool_id) = candidate else {
        return Ok(None);
    };

    // The candidate was just read from the store; the draw-down can
    // still fail only on a logic error, which should propagate.
    let matched = store.pool_mut(&pool_id).ok_or_else(|| LendingError::NotFound {
        entity: "pool".into(),
        id: pool_id.clone(),
    })?;
    pool::draw_down(matched, loan.amount)?;
    loan.investment_pool_id = Some(pool_id.clone());

    Ok(Some(pool_id))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{DiversificationLevel, PoolRequest};
    use crate::store::{InMemoryStore, LendingStore};
    use crate::taxonomy::RiskLevel;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
    }

    fn pending_request(id: &str, amount: Decimal, duration: u32, score: Decimal) -> CreditRequest {
        CreditRequest {
            id: id.into(),
            borrower_id: format!("borrower_{id}"),
            borrower_name: format!("Borrower {id}"),
            amount,
            currency: Currency::BRL,
            duration,
            risk_score: score,
            status: RequestStatus::Pending,
            documents: vec!["payslip".into(), "id".into()],
            request_date: NaiveDate::from_ymd_opt(2025, 6, 28).unwrap(),
        }
    }

    // -----------------------------------------------------------------------
    // 1. Approval materializes a loan from the request's terms
    // -----------------------------------------------------------------------
    #[test]
    fn test_approve_materializes_loan() {
        let mut request = pending_request("req_001", dec!(2400), 12, dec!(85));
        let loan = approve(&mut request, &ApprovalTerms::default(), today()).unwrap();

        assert_eq!(request.status, RequestStatus::Approved);
        assert_eq!(loan.amount, dec!(2400));
        assert_eq!(loan.interest_rate, DEFAULT_APPROVAL_RATE);
        assert_eq!(loan.duration, 12);
        assert_eq!(loan.total_payments, 12);
        assert_eq!(loan.payments_received, 0);
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.risk_category, RiskLevel::Excellent);
        assert_eq!(
            loan.next_payment_date,
            Some(NaiveDate::from_ymd_opt(2025, 8, 1).unwrap())
        );
        // 2400/12 + (2400*15%)/12 = 200 + 30
        assert_eq!(loan.monthly_payment, dec!(230));
        assert_eq!(loan.total_interest_earned, Decimal::ZERO);

        // Pending payment records mirror the schedule
        assert_eq!(loan.payment_history.len(), 12);
        assert!(loan
            .payment_history
            .iter()
            .all(|p| p.status == PaymentStatus::Pending && p.paid_date.is_none()));
    }

    // -----------------------------------------------------------------------
    // 2. Resolution is exactly-once in both directions
    // -----------------------------------------------------------------------
    #[test]
    fn test_double_resolution_fails() {
        let mut request = pending_request("req_002", dec!(1000), 6, dec!(55));
        approve(&mut request, &ApprovalTerms::default(), today()).unwrap();

        match approve(&mut request, &ApprovalTerms::default(), today()) {
            Err(LendingError::InvalidState { actual, .. }) => assert_eq!(actual, "approved"),
            other => panic!("Expected InvalidState, got {:?}", other),
        }
        assert!(reject(&mut request).is_err());

        let mut request = pending_request("req_003", dec!(1000), 6, dec!(55));
        reject(&mut request).unwrap();
        assert_eq!(request.status, RequestStatus::Rejected);
        assert!(reject(&mut request).is_err());
        assert!(approve(&mut request, &ApprovalTerms::default(), today()).is_err());
    }

    // -----------------------------------------------------------------------
    // 3. Term fallbacks: zero duration takes the reference 12 periods
    // -----------------------------------------------------------------------
    #[test]
    fn test_reference_terms() {
        let mut request = pending_request("req_004", dec!(5000), 0, dec!(60));
        let loan = approve(&mut request, &ApprovalTerms::default(), today()).unwrap();
        assert_eq!(loan.duration, DEFAULT_APPROVAL_PERIODS);
        assert_eq!(loan.interest_rate, DEFAULT_APPROVAL_RATE);
    }

    // -----------------------------------------------------------------------
    // 4. Explicit overrides win over both defaults
    // -----------------------------------------------------------------------
    #[test]
    fn test_term_overrides() {
        let mut request = pending_request("req_005", dec!(5000), 18, dec!(60));
        let terms = ApprovalTerms {
            interest_rate: Some(dec!(11)),
            duration: Some(24),
        };
        let loan = approve(&mut request, &terms, today()).unwrap();
        assert_eq!(loan.interest_rate, dec!(11));
        assert_eq!(loan.duration, 24);
    }

    // -----------------------------------------------------------------------
    // 5. The band is fixed from the score at approval
    // -----------------------------------------------------------------------
    #[test]
    fn test_band_fixed_from_score() {
        for (score, expected) in [
            (dec!(90), RiskLevel::Excellent),
            (dec!(55), RiskLevel::Good),
            (dec!(35), RiskLevel::Poor),
            (dec!(10), RiskLevel::Terrible),
        ] {
            let mut request = pending_request("req_006", dec!(1000), 6, score);
            let loan = approve(&mut request, &ApprovalTerms::default(), today()).unwrap();
            assert_eq!(loan.risk_category, expected, "score {}", score);
        }
    }

    // -----------------------------------------------------------------------
    // 6. Store resolution: approve persists the loan
    // -----------------------------------------------------------------------
    #[test]
    fn test_resolve_request_approve() {
        let mut store = InMemoryStore::default();
        store.insert_request(pending_request("req_007", dec!(2000), 12, dec!(75)));

        let resolution = resolve_request(
            &mut store,
            "req_007",
            Decision::Approve,
            &ApprovalTerms::default(),
            today(),
        )
        .unwrap();

        assert_eq!(resolution.status, RequestStatus::Approved);
        assert!(resolution.loan.is_some());
        assert_eq!(resolution.funded_by, None);
        assert_eq!(store.loans().len(), 1);
        assert_eq!(
            store.request("req_007").unwrap().status,
            RequestStatus::Approved
        );

        // Second resolution fails and adds nothing
        assert!(resolve_request(
            &mut store,
            "req_007",
            Decision::Approve,
            &ApprovalTerms::default(),
            today(),
        )
        .is_err());
        assert_eq!(store.loans().len(), 1);
    }

    // -----------------------------------------------------------------------
    // 7. Unknown request ids surface NotFound
    // -----------------------------------------------------------------------
    #[test]
    fn test_resolve_unknown_request() {
        let mut store = InMemoryStore::default();
        let err = resolve_request(
            &mut store,
            "req_missing",
            Decision::Reject,
            &ApprovalTerms::default(),
            today(),
        )
        .unwrap_err();
        assert!(matches!(err, LendingError::NotFound { .. }));
    }

    // -----------------------------------------------------------------------
    // 8. Auto-invest: first eligible pool funds the loan
    // -----------------------------------------------------------------------
    #[test]
    fn test_auto_invest_first_fit() {
        let mut store = InMemoryStore::default();
        store.credit("lender_01", dec!(60000));

        // Low diversification: no poor/terrible weight
        pool::open_pool(
            &mut store,
            PoolRequest {
                id: "pool_a".into(),
                lender_id: "lender_01".into(),
                name: "Conservative".into(),
                total_amount: dec!(20000),
                distributions: None,
                diversification_level: DiversificationLevel::Low,
                auto_invest: true,
            },
            today(),
        )
        .unwrap();
        pool::open_pool(
            &mut store,
            PoolRequest {
                id: "pool_b".into(),
                lender_id: "lender_01".into(),
                name: "Broad".into(),
                total_amount: dec!(40000),
                distributions: None,
                diversification_level: DiversificationLevel::High,
                auto_invest: true,
            },
            today(),
        )
        .unwrap();

        // Poor-band borrower: pool_a has zero poor weight, pool_b matches
        store.insert_request(pending_request("req_008", dec!(3000), 12, dec!(40)));
        let resolution = resolve_request(
            &mut store,
            "req_008",
            Decision::Approve,
            &ApprovalTerms::default(),
            today(),
        )
        .unwrap();

        assert_eq!(resolution.funded_by.as_deref(), Some("pool_b"));
        let loan = resolution.loan.unwrap();
        assert_eq!(loan.investment_pool_id.as_deref(), Some("pool_b"));
        assert_eq!(
            store.pool("pool_b").unwrap().available_amount,
            dec!(37000)
        );
        assert_eq!(
            store.pool("pool_a").unwrap().available_amount,
            dec!(20000)
        );

        // Excellent-band borrower: pool_a is first in insertion order
        store.insert_request(pending_request("req_009", dec!(4000), 12, dec!(95)));
        let resolution = resolve_request(
            &mut store,
            "req_009",
            Decision::Approve,
            &ApprovalTerms::default(),
            today(),
        )
        .unwrap();
        assert_eq!(resolution.funded_by.as_deref(), Some("pool_a"));
    }

    // -----------------------------------------------------------------------
    // 9. Auto-invest: no eligible pool leaves the loan unfunded
    // -----------------------------------------------------------------------
    #[test]
    fn test_auto_invest_no_match() {
        let mut store = InMemoryStore::default();
        store.credit("lender_01", dec!(20000));
        pool::open_pool(
            &mut store,
            PoolRequest {
                id: "pool_manual".into(),
                lender_id: "lender_01".into(),
                name: "Manual".into(),
                total_amount: dec!(20000),
                distributions: None,
                diversification_level: DiversificationLevel::High,
                auto_invest: false,
            },
            today(),
        )
        .unwrap();

        store.insert_request(pending_request("req_010", dec!(3000), 12, dec!(40)));
        let resolution = resolve_request(
            &mut store,
            "req_010",
            Decision::Approve,
            &ApprovalTerms::default(),
            today(),
        )
        .unwrap();

        assert_eq!(resolution.funded_by, None);
        assert_eq!(resolution.loan.unwrap().investment_pool_id, None);
    }

    // -----------------------------------------------------------------------
    // 10. Auto-invest respects the per-band cap
    // -----------------------------------------------------------------------
    #[test]
    fn test_auto_invest_band_cap() {
        let mut store = InMemoryStore::default();
        store.credit("lender_01", dec!(20000));
        // Terrible-band cap: min(20000 * 0.10, 10000) = 2000
        pool::open_pool(
            &mut store,
            PoolRequest {
                id: "pool_c".into(),
                lender_id: "lender_01".into(),
                name: "Capped".into(),
                total_amount: dec!(20000),
                distributions: None,
                diversification_level: DiversificationLevel::High,
                auto_invest: true,
            },
            today(),
        )
        .unwrap();

        store.insert_request(pending_request("req_011", dec!(2500), 12, dec!(5)));
        let resolution = resolve_request(
            &mut store,
            "req_011",
            Decision::Approve,
            &ApprovalTerms::default(),
            today(),
        )
        .unwrap();
        assert_eq!(resolution.funded_by, None, "cap should block the match");

        store.insert_request(pending_request("req_012", dec!(2000), 12, dec!(5)));
        let resolution = resolve_request(
            &mut store,
            "req_012",
            Decision::Approve,
            &ApprovalTerms::default(),
            today(),
        )
        .unwrap();
        assert_eq!(resolution.funded_by.as_deref(), Some("pool_c"));
    }
}
