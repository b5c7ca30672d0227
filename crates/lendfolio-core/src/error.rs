use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LendingError {
    #[error("Score {score} is outside the taxonomy domain [0, 100]")]
    ScoreOutOfRange { score: Decimal },

    #[error("Invalid term: {field} — {reason}")]
    InvalidTerm { field: String, reason: String },

    #[error("Distribution percentages sum to {total}, expected 100 (±{tolerance})")]
    UnbalancedDistribution { total: Decimal, tolerance: Decimal },

    #[error("Percentage {percentage} for {category} is outside [0, 100]")]
    InvalidPercentage {
        category: String,
        percentage: Decimal,
    },

    #[error("Duplicate distribution entry for {category}")]
    DuplicateCategory { category: String },

    #[error("Invalid state for {entity} {id}: expected {expected}, found {actual}")]
    InvalidState {
        entity: String,
        id: String,
        expected: String,
        actual: String,
    },

    #[error("Insufficient funds for lender {lender_id}: required {required}, available {available}")]
    InsufficientFunds {
        lender_id: String,
        required: Decimal,
        available: Decimal,
    },

    #[error("No {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Date overflow computing {context}")]
    DateOverflow { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for LendingError {
    fn from(e: serde_json::Error) -> Self {
        LendingError::SerializationError(e.to_string())
    }
}
