//! Dense decimal linear algebra used by the allocator.
//!
//! Matrices are row-major `Vec<Vec<Decimal>>`. Everything here works on
//! borrowed input and returns fresh values; nothing is cached between calls.

use rust_decimal::{Decimal, MathematicalOps};
use tracing::trace;

use crate::error::MarkowitzError;
use crate::types::Matrix;
use crate::MarkowitzResult;

// ---------------------------------------------------------------------------
// LU decomposition
// ---------------------------------------------------------------------------

/// LU factorisation `PA = LU` with partial pivoting.
///
/// `L` (unit diagonal, strictly below the diagonal) and `U` (on and above
/// the diagonal) share one matrix. `permutation[i]` is the row of `A` that
/// ended up in row `i` of `PA`.
#[derive(Debug, Clone)]
pub struct LuDecomposition {
    lu: Matrix,
    permutation: Vec<usize>,
}

impl LuDecomposition {
    /// Factorise a square matrix.
    ///
    /// A pivot whose magnitude does not exceed `tolerance * max|a_ij|` marks
    /// the matrix as singular. The test is relative so that rescaling the
    /// input (e.g. daily vs. annual covariances) does not change the verdict.
    #[allow(clippy::needless_range_loop)]
    pub fn factorize(matrix: &[Vec<Decimal>], tolerance: Decimal) -> MarkowitzResult<Self> {
        let n = matrix.len();
        if let Some((i, row)) = matrix.iter().enumerate().find(|(_, r)| r.len() != n) {
            return Err(MarkowitzError::DimensionMismatch {
                field: "matrix".into(),
                reason: format!("Row {} has {} columns, expected {}", i, row.len(), n),
            });
        }

        let scale = max_abs(matrix);
        if scale.is_zero() {
            return Err(MarkowitzError::SingularCovariance {
                pivot_index: 0,
                pivot: Decimal::ZERO,
            });
        }
        let threshold = checked(tolerance.checked_mul(scale), "pivot threshold")?;

        let mut lu: Matrix = matrix.to_vec();
        let mut permutation: Vec<usize> = (0..n).collect();

        for col in 0..n {
            // Partial pivoting
            let mut max_row = col;
            let mut max_val = lu[col][col].abs();
            for row in (col + 1)..n {
                let val = lu[row][col].abs();
                if val > max_val {
                    max_val = val;
                    max_row = row;
                }
            }

            if max_val <= threshold {
                return Err(MarkowitzError::SingularCovariance {
                    pivot_index: col,
                    pivot: max_val,
                });
            }

            if max_row != col {
                lu.swap(col, max_row);
                permutation.swap(col, max_row);
            }

            let pivot_row = lu[col].clone();
            let pivot = pivot_row[col];
            for row in (col + 1)..n {
                let factor = checked(lu[row][col].checked_div(pivot), "LU elimination")?;
                lu[row][col] = factor;
                for k in (col + 1)..n {
                    lu[row][k] = checked(sub_product(lu[row][k], factor, pivot_row[k]), "LU elimination")?;
                }
            }
        }

        trace!(n, "LU factorisation complete");
        Ok(Self { lu, permutation })
    }

    /// Dimension of the factorised matrix.
    pub fn dim(&self) -> usize {
        self.lu.len()
    }

    /// Solve `A x = b` by forward and back substitution.
    pub fn solve(&self, b: &[Decimal]) -> MarkowitzResult<Vec<Decimal>> {
        let n = self.dim();
        if b.len() != n {
            return Err(MarkowitzError::DimensionMismatch {
                field: "rhs".into(),
                reason: format!("Expected {} entries but got {}", n, b.len()),
            });
        }

        // Ly = Pb
        let mut x: Vec<Decimal> = self.permutation.iter().map(|&p| b[p]).collect();
        for i in 0..n {
            let mut acc = x[i];
            for j in 0..i {
                acc = checked(sub_product(acc, self.lu[i][j], x[j]), "forward substitution")?;
            }
            x[i] = acc;
        }

        // Ux = y
        for i in (0..n).rev() {
            let mut acc = x[i];
            for j in (i + 1)..n {
                acc = checked(sub_product(acc, self.lu[i][j], x[j]), "back substitution")?;
            }
            x[i] = checked(acc.checked_div(self.lu[i][i]), "back substitution")?;
        }

        Ok(x)
    }
}

// ---------------------------------------------------------------------------
// Positive-definiteness
// ---------------------------------------------------------------------------

/// Attempt a Cholesky factorisation; fails with the first row whose
/// reduced diagonal is not strictly positive.
#[allow(clippy::needless_range_loop)]
pub fn check_positive_definite(matrix: &[Vec<Decimal>]) -> MarkowitzResult<()> {
    let n = matrix.len();
    let mut l: Matrix = vec![vec![Decimal::ZERO; n]; n];

    for j in 0..n {
        let mut diag = matrix[j][j];
        for k in 0..j {
            diag = checked(sub_product(diag, l[j][k], l[j][k]), "Cholesky diagonal")?;
        }
        if diag <= Decimal::ZERO {
            return Err(MarkowitzError::NotPositiveDefinite { row: j });
        }
        let l_jj = diag
            .sqrt()
            .ok_or(MarkowitzError::NotPositiveDefinite { row: j })?;
        l[j][j] = l_jj;

        for i in (j + 1)..n {
            let mut s = matrix[i][j];
            for k in 0..j {
                s = checked(sub_product(s, l[i][k], l[j][k]), "Cholesky column")?;
            }
            l[i][j] = checked(s.checked_div(l_jj), "Cholesky column")?;
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Vector helpers
// ---------------------------------------------------------------------------

/// Dot product that reports overflow instead of panicking.
pub fn checked_dot(a: &[Decimal], b: &[Decimal], context: &str) -> MarkowitzResult<Decimal> {
    a.iter().zip(b.iter()).try_fold(Decimal::ZERO, |acc, (x, y)| {
        checked(x.checked_mul(*y).and_then(|p| acc.checked_add(p)), context)
    })
}

/// Matrix-vector multiplication.
pub fn mat_vec_multiply(
    mat: &[Vec<Decimal>],
    v: &[Decimal],
    context: &str,
) -> MarkowitzResult<Vec<Decimal>> {
    mat.iter().map(|row| checked_dot(row, v, context)).collect()
}

/// `v' M v`.
pub fn quadratic_form(mat: &[Vec<Decimal>], v: &[Decimal], context: &str) -> MarkowitzResult<Decimal> {
    checked_dot(v, &mat_vec_multiply(mat, v, context)?, context)
}

/// Largest absolute entry.
pub fn max_abs(mat: &[Vec<Decimal>]) -> Decimal {
    mat.iter()
        .flat_map(|row| row.iter())
        .map(|v| v.abs())
        .fold(Decimal::ZERO, Decimal::max)
}

/// `acc - a * b`, `None` on overflow.
fn sub_product(acc: Decimal, a: Decimal, b: Decimal) -> Option<Decimal> {
    a.checked_mul(b).and_then(|p| acc.checked_sub(p))
}

/// Lift a `checked_*` result, naming the stage that overflowed.
pub(crate) fn checked(value: Option<Decimal>, context: &str) -> MarkowitzResult<Decimal> {
    value.ok_or_else(|| MarkowitzError::NumericalOverflow {
        context: context.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
