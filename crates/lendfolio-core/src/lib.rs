pub mod error;
pub mod ledger;
pub mod pool;
pub mod portfolio;
pub mod schedule;
pub mod store;
pub mod taxonomy;
pub mod types;

#[cfg(feature = "fixtures")]
pub mod fixtures;

pub use error::LendingError;
pub use types::*;

/// Standard result type for all lendfolio operations
pub type LendingResult<T> = Result<T, LendingError>;
