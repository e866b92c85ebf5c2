use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarkowitzError {
    #[error("Dimension mismatch: {field} — {reason}")]
    DimensionMismatch { field: String, reason: String },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Singular covariance matrix: pivot {pivot} at row {pivot_index} is below tolerance")]
    SingularCovariance { pivot_index: usize, pivot: Decimal },

    #[error("Degenerate frontier: {0}")]
    DegenerateFrontier(String),

    #[error("Covariance matrix is not positive-definite (failed at row {row})")]
    NotPositiveDefinite { row: usize },

    #[error("Numerical overflow in {context}")]
    NumericalOverflow { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for MarkowitzError {
    fn from(e: serde_json::Error) -> Self {
        MarkowitzError::SerializationError(e.to_string())
    }
}
