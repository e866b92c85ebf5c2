use rust_decimal::Decimal;

use super::options::AllocatorOptions;
use crate::error::MarkowitzError;
use crate::MarkowitzResult;

/// Shape and sanity checks run before any numeric work. Returns N.
pub(crate) fn validate_problem(
    expected_returns: &[Decimal],
    covariance_matrix: &[Vec<Decimal>],
    options: &AllocatorOptions,
) -> MarkowitzResult<usize> {
    let n = expected_returns.len();

    if covariance_matrix.len() != n {
        return Err(MarkowitzError::DimensionMismatch {
            field: "covariance_matrix".into(),
            reason: format!(
                "Expected {}x{} matrix for {} expected returns but got {} rows",
                n,
                n,
                n,
                covariance_matrix.len()
            ),
        });
    }
    for (i, row) in covariance_matrix.iter().enumerate() {
        if row.len() != n {
            return Err(MarkowitzError::DimensionMismatch {
                field: "covariance_matrix".into(),
                reason: format!("Row {} has {} columns, expected {}", i, row.len(), n),
            });
        }
    }

    // Two equality constraints need at least two assets to leave a free direction.
    if n < 2 {
        return Err(MarkowitzError::DegenerateFrontier(format!(
            "At least two assets are required, got {}",
            n
        )));
    }

    validate_covariance_matrix(covariance_matrix, n, options.symmetry_tolerance)?;
    Ok(n)
}

pub(crate) fn validate_asset_names(names: Option<&[String]>, n: usize) -> MarkowitzResult<()> {
    if let Some(names) = names {
        if names.len() != n {
            return Err(MarkowitzError::DimensionMismatch {
                field: "asset_names".into(),
                reason: format!("Expected {} names but got {}", n, names.len()),
            });
        }
    }
    Ok(())
}

#[allow(clippy::needless_range_loop)]
fn validate_covariance_matrix(
    cov: &[Vec<Decimal>],
    n: usize,
    tolerance: Decimal,
) -> MarkowitzResult<()> {
    for i in 0..n {
        if cov[i][i] <= Decimal::ZERO {
            return Err(MarkowitzError::InvalidInput {
                field: "covariance_matrix".into(),
                reason: format!("Variance at [{},{}] must be positive, got {}", i, i, cov[i][i]),
            });
        }
        for j in (i + 1)..n {
            // A difference too large to represent is asymmetric as well.
            let asymmetric = cov[i][j]
                .checked_sub(cov[j][i])
                .map_or(true, |diff| diff.abs() > tolerance);
            if asymmetric {
                return Err(MarkowitzError::InvalidInput {
                    field: "covariance_matrix".into(),
                    reason: format!(
                        "Not symmetric: [{},{}]={} != [{},{}]={}",
                        i, j, cov[i][j], j, i, cov[j][i]
                    ),
                });
            }
        }
    }
    Ok(())
}
