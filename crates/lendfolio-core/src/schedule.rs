//! Installment schedule derivation.
//!
//! Repayment uses equal-principal, flat-rate pricing: the quoted rate is
//! the total interest charge as a share of principal, spread evenly
//! across installments. This is deliberately NOT declining-balance
//! amortization; downstream accounting depends on the flat split.

use std::time::Instant;

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LendingError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::LendingResult;

/// Flat fee added to each overdue installment, in currency units.
pub const LATE_FEE: Money = dec!(50);

const HUNDRED: Decimal = dec!(100);
/// Money is kept at two decimal places throughout the schedule.
const MONEY_DP: u32 = 2;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The terms a schedule is derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    /// Flat rate: total interest as a percentage of principal.
    pub interest_rate: Rate,
    pub periods: u32,
    /// Origination date; the first installment falls one month later.
    pub start_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallmentStatus {
    Pending,
    Paid,
    Overdue,
}

/// One scheduled repayment unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installment {
    /// 1-based position in the schedule.
    pub number: u32,
    pub due_date: NaiveDate,
    pub principal: Money,
    pub interest: Money,
    pub late_fee: Money,
    /// principal + interest + late_fee.
    pub amount: Money,
    pub status: InstallmentStatus,
}

/// Input for the repayment model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepaymentInput {
    #[serde(flatten)]
    pub terms: LoanTerms,
    /// Installments already received; drives status derivation.
    #[serde(default)]
    pub payments_received: u32,
    /// Date overdue checks are evaluated against. Statuses stay pending
    /// past the paid prefix when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<NaiveDate>,
}

/// Output of the repayment model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepaymentOutput {
    pub schedule: Vec<Installment>,
    /// Payment due each period, before late fees.
    pub monthly_payment: Money,
    pub total_interest: Money,
    /// principal + total interest, excluding late fees.
    pub total_repayable: Money,
    pub overdue_installments: u32,
    pub accrued_late_fees: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Derive the full installment schedule for the given terms. All
/// installments come back `pending` with no late fees; use
/// [`schedule_with_status`] to overlay payment state.
///
/// Pure: the same terms always reproduce the same dates and amounts.
pub fn generate_schedule(terms: &LoanTerms) -> LendingResult<Vec<Installment>> {
    validate_terms(terms)?;

    let n = Decimal::from(terms.periods);
    let last = Decimal::from(terms.periods - 1);

    let principal_share = (terms.principal / n).round_dp(MONEY_DP);
    let interest_total = total_interest(terms);
    let interest_share = (interest_total / n).round_dp(MONEY_DP);

    let mut schedule = Vec::with_capacity(terms.periods as usize);
    for number in 1..=terms.periods {
        let due_date = due_date_for(terms.start_date, number)?;

        // The final installment absorbs the rounding remainder so the
        // schedule sums exactly to principal and to the flat charge.
        let (principal, interest) = if number == terms.periods {
            (
                terms.principal - principal_share * last,
                interest_total - interest_share * last,
            )
        } else {
            (principal_share, interest_share)
        };

        schedule.push(Installment {
            number,
            due_date,
            principal,
            interest,
            late_fee: Decimal::ZERO,
            amount: principal + interest,
            status: InstallmentStatus::Pending,
        });
    }

    Ok(schedule)
}

/// Derive the schedule and overlay statuses from a payments-received
/// counter: the first `payments_received` installments are `paid`; later
/// installments due strictly before `as_of` are `overdue` and carry the
/// flat late fee.
///
/// Status is derived, not stored: recomputing is idempotent.
pub fn schedule_with_status(
    terms: &LoanTerms,
    payments_received: u32,
    as_of: NaiveDate,
) -> LendingResult<Vec<Installment>> {
    if payments_received > terms.periods {
        return Err(LendingError::InvalidTerm {
            field: "payments_received".into(),
            reason: format!(
                "{} payments received exceeds {} periods",
                payments_received, terms.periods
            ),
        });
    }

    let mut schedule = generate_schedule(terms)?;
    for installment in &mut schedule {
        if installment.number <= payments_received {
            installment.status = InstallmentStatus::Paid;
        } else if installment.due_date < as_of {
            installment.status = InstallmentStatus::Overdue;
            installment.late_fee = LATE_FEE;
            installment.amount += LATE_FEE;
        }
    }

    Ok(schedule)
}

/// The per-period payment before late fees.
pub fn monthly_payment(terms: &LoanTerms) -> LendingResult<Money> {
    validate_terms(terms)?;
    let n = Decimal::from(terms.periods);
    Ok((terms.principal / n).round_dp(MONEY_DP) + (total_interest(terms) / n).round_dp(MONEY_DP))
}

/// The flat interest charge over the life of the loan.
pub fn total_interest(terms: &LoanTerms) -> Money {
    (terms.principal * terms.interest_rate / HUNDRED).round_dp(MONEY_DP)
}

/// Full repayment model: schedule, aggregates, and derived statuses.
pub fn model_repayment(
    input: &RepaymentInput,
) -> LendingResult<ComputationOutput<RepaymentOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let schedule = match input.as_of {
        Some(as_of) => schedule_with_status(&input.terms, input.payments_received, as_of)?,
        None => {
            let mut schedule = generate_schedule(&input.terms)?;
            if input.payments_received > input.terms.periods {
                return Err(LendingError::InvalidTerm {
                    field: "payments_received".into(),
                    reason: format!(
                        "{} payments received exceeds {} periods",
                        input.payments_received, input.terms.periods
                    ),
                });
            }
            for installment in &mut schedule {
                if installment.number <= input.payments_received {
                    installment.status = InstallmentStatus::Paid;
                }
            }
            schedule
        }
    };

    let regular_payment = schedule[0].principal + schedule[0].interest;
    if let Some(final_installment) = schedule.last() {
        let drift = (final_installment.principal + final_installment.interest) - regular_payment;
        if !drift.is_zero() {
            warnings.push(format!(
                "Final installment adjusted by {} to absorb rounding",
                drift
            ));
        }
    }

    let overdue_installments = schedule
        .iter()
        .filter(|i| i.status == InstallmentStatus::Overdue)
        .count() as u32;
    let accrued_late_fees = LATE_FEE * Decimal::from(overdue_installments);
    let interest_total = total_interest(&input.terms);

    let output = RepaymentOutput {
        monthly_payment: regular_payment,
        total_interest: interest_total,
        total_repayable: input.terms.principal + interest_total,
        overdue_installments,
        accrued_late_fees,
        schedule,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Equal-principal flat-rate installment schedule",
        &serde_json::json!({
            "principal": input.terms.principal.to_string(),
            "interest_rate": input.terms.interest_rate.to_string(),
            "periods": input.terms.periods,
            "start_date": input.terms.start_date.to_string(),
            "payments_received": input.payments_received,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Validation / helpers
// ---------------------------------------------------------------------------

fn validate_terms(terms: &LoanTerms) -> LendingResult<()> {
    if terms.periods == 0 {
        return Err(LendingError::InvalidTerm {
            field: "periods".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }
    if terms.principal <= Decimal::ZERO {
        return Err(LendingError::InvalidTerm {
            field: "principal".into(),
            reason: "Principal must be positive".into(),
        });
    }
    if terms.interest_rate < Decimal::ZERO {
        return Err(LendingError::InvalidTerm {
            field: "interest_rate".into(),
            reason: "Interest rate cannot be negative".into(),
        });
    }
    Ok(())
}

/// Due date for the 1-based installment `number`: monthly offsets from
/// the origination date, clamped into shorter months by chrono.
pub(crate) fn due_date_for(start_date: NaiveDate, number: u32) -> LendingResult<NaiveDate> {
    start_date
        .checked_add_months(Months::new(number))
        .ok_or_else(|| LendingError::DateOverflow {
            context: format!("due date for installment {}", number),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
