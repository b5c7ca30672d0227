//! The abstract record store the engine is specified over.
//!
//! Engine operations that mutate state take a store by `&mut` reference;
//! the store owns transactional balance movement. Pure computations
//! never touch it. The in-memory implementation keeps pools, requests
//! and loans in insertion order so matching and iteration are
//! deterministic.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::error::LendingError;
use crate::ledger::CreditRequest;
use crate::pool::InvestmentPool;
use crate::portfolio::PortfolioLoan;
use crate::types::Money;
use crate::LendingResult;

pub trait LendingStore {
    /// Current balance for a lender; zero for unknown lenders.
    fn balance(&self, lender_id: &str) -> Money;

    /// Add funds to a lender's balance.
    fn credit(&mut self, lender_id: &str, amount: Money);

    /// Remove funds from a lender's balance. Fails with
    /// `InsufficientFunds` without mutating when the balance is short.
    fn debit(&mut self, lender_id: &str, amount: Money) -> LendingResult<()>;

    fn insert_pool(&mut self, pool: InvestmentPool);
    fn pools(&self) -> &[InvestmentPool];
    fn pool(&self, id: &str) -> Option<&InvestmentPool>;
    fn pool_mut(&mut self, id: &str) -> Option<&mut InvestmentPool>;

    fn insert_request(&mut self, request: CreditRequest);
    fn requests(&self) -> &[CreditRequest];
    fn request(&self, id: &str) -> Option<&CreditRequest>;
    fn request_mut(&mut self, id: &str) -> Option<&mut CreditRequest>;

    fn insert_loan(&mut self, loan: PortfolioLoan);
    fn loans(&self) -> &[PortfolioLoan];
    fn loan_mut(&mut self, id: &str) -> Option<&mut PortfolioLoan>;
}

/// Vec-backed store for tests, demos and the CLI.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    balances: HashMap<String, Money>,
    pools: Vec<InvestmentPool>,
    requests: Vec<CreditRequest>,
    loans: Vec<PortfolioLoan>,
}

impl LendingStore for InMemoryStore {
    fn balance(&self, lender_id: &str) -> Money {
        self.balances.get(lender_id).copied().unwrap_or(Decimal::ZERO)
    }

    fn credit(&mut self, lender_id: &str, amount: Money) {
        *self.balances.entry(lender_id.to_string()).or_default() += amount;
    }

    fn debit(&mut self, lender_id: &str, amount: Money) -> LendingResult<()> {
        let available = self.balance(lender_id);
        if available < amount {
            return Err(LendingError::InsufficientFunds {
                lender_id: lender_id.to_string(),
                required: amount,
                available,
            });
        }
        self.balances.insert(lender_id.to_string(), available - amount);
        Ok(())
    }

    fn insert_pool(&mut self, pool: InvestmentPool) {
        self.pools.push(pool);
    }

    fn pools(&self) -> &[InvestmentPool] {
        &self.pools
    }

    fn pool(&self, id: &str) -> Option<&InvestmentPool> {
        self.pools.iter().find(|p| p.id == id)
    }

    fn pool_mut(&mut self, id: &str) -> Option<&mut InvestmentPool> {
        self.pools.iter_mut().find(|p| p.id == id)
    }

    fn insert_request(&mut self, request: CreditRequest) {
        self.requests.push(request);
    }

    fn requests(&self) -> &[CreditRequest] {
        &self.requests
    }

    fn request(&self, id: &str) -> Option<&CreditRequest> {
        self.requests.iter().find(|r| r.id == id)
    }

    fn request_mut(&mut self, id: &str) -> Option<&mut CreditRequest> {
        self.requests.iter_mut().find(|r| r.id == id)
    }

    fn insert_loan(&mut self, loan: PortfolioLoan) {
        self.loans.push(loan);
    }

    fn loans(&self) -> &[PortfolioLoan] {
        &self.loans
    }

    fn loan_mut(&mut self, id: &str) -> Option<&mut PortfolioLoan> {
        self.loans.iter_mut().find(|l| l.id == id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    // -----------------------------------------------------------------------
    // 1. Balances: unknown lenders read zero, credits accumulate
    // -----------------------------------------------------------------------
    #[test]
    fn test_balances() {
        let mut store = InMemoryStore::default();
        assert_eq!(store.balance("nobody"), Decimal::ZERO);

        store.credit("lender_01", dec!(1000));
        store.credit("lender_01", dec!(250.50));
        assert_eq!(store.balance("lender_01"), dec!(1250.50));
    }

    // -----------------------------------------------------------------------
    // 2. Debit is transactional: a short balance is left untouched
    // -----------------------------------------------------------------------
    #[test]
    fn test_debit_transactional() {
        let mut store = InMemoryStore::default();
        store.credit("lender_01", dec!(100));

        let err = store.debit("lender_01", dec!(150)).unwrap_err();
        match err {
            LendingError::InsufficientFunds {
                required, available, ..
            } => {
                assert_eq!(required, dec!(150));
                assert_eq!(available, dec!(100));
            }
            other => panic!("Expected InsufficientFunds, got {:?}", other),
        }
        assert_eq!(store.balance("lender_01"), dec!(100));

        store.debit("lender_01", dec!(100)).unwrap();
        assert_eq!(store.balance("lender_01"), Decimal::ZERO);
    }
}
