//! Portfolio aggregation: summary statistics and filtered/sorted views
//! over a lender's loan collection, plus the per-loan payment bookkeeping
//! those statistics are derived from.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LendingError;
use crate::schedule::{self, LoanTerms};
use crate::taxonomy::RiskLevel;
use crate::types::{with_metadata, ComputationOutput, Currency, Money, Percent, Rate, Score};
use crate::LendingResult;

const HUNDRED: Decimal = dec!(100);

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Late,
    Completed,
    Defaulted,
}

impl LoanStatus {
    /// Legal moves in the loan state machine. `completed` and
    /// `defaulted` are terminal; `late` loans can cure back to `active`.
    pub fn can_transition(self, to: LoanStatus) -> bool {
        use LoanStatus::*;
        matches!(
            (self, to),
            (Active, Late) | (Active, Completed) | (Active, Defaulted) | (Late, Active) | (Late, Defaulted)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Late => "late",
            LoanStatus::Completed => "completed",
            LoanStatus::Defaulted => "defaulted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Late,
    Missed,
}

/// One recorded (or scheduled) repayment against a loan. `paid_date` is
/// set only when the record is `paid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub loan_id: String,
    pub amount: Money,
    pub due_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<NaiveDate>,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub late_fees: Option<Money>,
}

/// A loan as seen from the lender's portfolio. `risk_category` is fixed
/// from the borrower score at origination; later re-scoring never
/// reclassifies an existing loan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioLoan {
    pub id: String,
    pub borrower_id: String,
    pub borrower_name: String,
    pub borrower_score: Score,
    pub amount: Money,
    #[serde(default)]
    pub currency: Currency,
    pub interest_rate: Rate,
    /// Term length in months.
    pub duration: u32,
    pub start_date: NaiveDate,
    /// Absent once the loan has no further scheduled payment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_payment_date: Option<NaiveDate>,
    pub status: LoanStatus,
    pub payments_received: u32,
    pub total_payments: u32,
    pub monthly_payment: Money,
    pub total_interest_earned: Money,
    pub risk_category: RiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investment_pool_id: Option<String>,
    #[serde(default)]
    pub payment_history: Vec<PaymentRecord>,
}

impl PortfolioLoan {
    /// The terms this loan's schedule derives from.
    pub fn terms(&self) -> LoanTerms {
        LoanTerms {
            principal: self.amount,
            interest_rate: self.interest_rate,
            periods: self.total_payments,
            start_date: self.start_date,
        }
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Per-band slice of the portfolio.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskBucket {
    pub amount: Money,
    pub percentage: Percent,
    pub loans: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioStats {
    pub total_invested: Money,
    pub total_returns: Money,
    pub active_loans: usize,
    pub completed_loans: usize,
    pub defaulted_loans: usize,
    /// total_returns / total_invested × 100; zero on an empty book.
    pub average_roi: Percent,
    /// Sum of monthly payments across active loans.
    pub monthly_income: Money,
    pub risk_distribution: BTreeMap<RiskLevel, RiskBucket>,
}

/// Aggregate summary statistics over a loan collection. Pure; never
/// divides by zero.
pub fn compute_stats(loans: &[PortfolioLoan]) -> PortfolioStats {
    let total_invested: Money = loans.iter().map(|l| l.amount).sum();
    let total_returns: Money = loans.iter().map(|l| l.total_interest_earned).sum();

    let average_roi = if total_invested > Decimal::ZERO {
        total_returns / total_invested * HUNDRED
    } else {
        Decimal::ZERO
    };

    let monthly_income = loans
        .iter()
        .filter(|l| l.status == LoanStatus::Active)
        .map(|l| l.monthly_payment)
        .sum();

    let mut risk_distribution: BTreeMap<RiskLevel, RiskBucket> = BTreeMap::new();
    for loan in loans {
        let bucket = risk_distribution.entry(loan.risk_category).or_default();
        bucket.amount += loan.amount;
        bucket.loans += 1;
    }
    for bucket in risk_distribution.values_mut() {
        bucket.percentage = if total_invested > Decimal::ZERO {
            bucket.amount / total_invested * HUNDRED
        } else {
            Decimal::ZERO
        };
    }

    PortfolioStats {
        total_invested,
        total_returns,
        active_loans: loans.iter().filter(|l| l.status == LoanStatus::Active).count(),
        completed_loans: loans
            .iter()
            .filter(|l| l.status == LoanStatus::Completed)
            .count(),
        defaulted_loans: loans
            .iter()
            .filter(|l| l.status == LoanStatus::Defaulted)
            .count(),
        average_roi,
        monthly_income,
        risk_distribution,
    }
}

/// Envelope wrapper around [`compute_stats`].
pub fn analyze_portfolio(
    loans: &[PortfolioLoan],
) -> LendingResult<ComputationOutput<PortfolioStats>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if loans.is_empty() {
        warnings.push("Portfolio is empty; all statistics are zero".into());
    }

    let stats = compute_stats(loans);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Portfolio aggregation — totals, ROI, income, risk distribution",
        &serde_json::json!({
            "loan_count": loans.len(),
        }),
        warnings,
        elapsed,
        stats,
    ))
}

// ---------------------------------------------------------------------------
// Filtering and sorting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Amount,
    Rate,
    PaymentDate,
    Risk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// View selection over a loan collection. `None` filters pass everything
/// through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LoanStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_category: Option<RiskLevel>,
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
}

/// Filter, then stably sort, a loan collection. Returns a new vector;
/// the input is never reordered. Loans comparing equal keep their
/// relative input order. Undated loans sort before dated ones ascending.
pub fn filter_and_sort(loans: &[PortfolioLoan], filter: &PortfolioFilter) -> Vec<PortfolioLoan> {
    let mut view: Vec<PortfolioLoan> = loans
        .iter()
        .filter(|l| filter.status.map_or(true, |s| l.status == s))
        .filter(|l| filter.risk_category.map_or(true, |c| l.risk_category == c))
        .cloned()
        .collect();

    view.sort_by(|a, b| {
        let ordering = match filter.sort_by {
            SortKey::Amount => a.amount.cmp(&b.amount),
            SortKey::Rate => a.interest_rate.cmp(&b.interest_rate),
            SortKey::PaymentDate => a.next_payment_date.cmp(&b.next_payment_date),
            SortKey::Risk => a.borrower_score.cmp(&b.borrower_score),
        };
        match filter.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });

    view
}

// ---------------------------------------------------------------------------
// Mutation
// ---------------------------------------------------------------------------

/// Move a loan to a new status, guarding the state machine.
pub fn transition(loan: &mut PortfolioLoan, to: LoanStatus) -> LendingResult<()> {
    if !loan.status.can_transition(to) {
        return Err(LendingError::InvalidState {
            entity: "loan".into(),
            id: loan.id.clone(),
            expected: format!("a state with a legal move to {}", to.as_str()),
            actual: loan.status.as_str().into(),
        });
    }
    loan.status = to;
    Ok(())
}

/// Record receipt of the next scheduled installment.
///
/// Settles the installment's pending history record in place (or appends
/// one when the history was not pre-materialized), bumps the
/// payments-received counter and interest earned, advances the next
/// payment date, completes the loan on the final installment, and cures
/// a `late` loan back to `active`. Fails without mutating when the loan
/// is already resolved; a payment is counted at most once per
/// installment.
pub fn record_payment(loan: &mut PortfolioLoan, as_of: NaiveDate) -> LendingResult<PaymentRecord> {
    if loan.status == LoanStatus::Completed || loan.status == LoanStatus::Defaulted {
        return Err(LendingError::InvalidState {
            entity: "loan".into(),
            id: loan.id.clone(),
            expected: "active or late".into(),
            actual: loan.status.as_str().into(),
        });
    }
    if loan.payments_received >= loan.total_payments {
        return Err(LendingError::InvalidState {
            entity: "loan".into(),
            id: loan.id.clone(),
            expected: format!("fewer than {} payments received", loan.total_payments),
            actual: format!("{}", loan.payments_received),
        });
    }

    let schedule = schedule::generate_schedule(&loan.terms())?;
    let number = loan.payments_received + 1;
    let installment = &schedule[(number - 1) as usize];

    let paid_late = installment.due_date < as_of;
    let late_fees = if paid_late {
        Some(schedule::LATE_FEE)
    } else {
        None
    };

    let record = PaymentRecord {
        id: format!("pay_{}_{}", loan.id, number),
        loan_id: loan.id.clone(),
        amount: installment.amount + late_fees.unwrap_or(Decimal::ZERO),
        due_date: installment.due_date,
        paid_date: Some(as_of),
        status: if paid_late {
            PaymentStatus::Late
        } else {
            PaymentStatus::Paid
        },
        late_fees,
    };

    loan.payments_received = number;
    loan.total_interest_earned += installment.interest;
    match loan.payment_history.iter_mut().find(|p| p.id == record.id) {
        Some(pending) => *pending = record.clone(),
        None => loan.payment_history.push(record.clone()),
    }

    if number == loan.total_payments {
        loan.next_payment_date = None;
        loan.status = LoanStatus::Completed;
    } else {
        loan.next_payment_date = Some(schedule[number as usize].due_date);
        if loan.status == LoanStatus::Late {
            loan.status = LoanStatus::Active;
        }
    }

    Ok(record)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
