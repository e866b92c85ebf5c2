use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Numerical thresholds and checks applied on every allocation.
///
/// All fields have defaults, so an input document may omit `options`
/// entirely or override a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorOptions {
    /// LU pivots at or below `tolerance * max|cov_ij|` mark the covariance
    /// matrix as singular.
    pub singularity_tolerance: Decimal,
    /// `A*C - B^2` at or below `tolerance * A*C` marks the frontier as degenerate.
    pub degeneracy_tolerance: Decimal,
    /// Maximum allowed `|cov_ij - cov_ji|`.
    pub symmetry_tolerance: Decimal,
    /// Reject covariance matrices that are invertible but not positive-definite.
    pub require_positive_definite: bool,
}

impl Default for AllocatorOptions {
    fn default() -> Self {
        Self {
            singularity_tolerance: dec!(0.000000000001),
            degeneracy_tolerance: dec!(0.0000000001),
            symmetry_tolerance: dec!(0.0000001),
            require_positive_definite: true,
        }
    }
}
