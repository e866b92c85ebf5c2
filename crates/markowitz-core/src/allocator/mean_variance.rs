use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use super::options::AllocatorOptions;
use super::validation::{validate_asset_names, validate_problem};
use crate::error::MarkowitzError;
use crate::linalg::{
    check_positive_definite, checked, checked_dot, mat_vec_multiply, quadratic_form,
    LuDecomposition,
};
use crate::types::{with_metadata, ComputationOutput, Matrix, Rate};
use crate::MarkowitzResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Portfolio weights together with the return and variance they realise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// One weight per asset; sums to one, may be negative (short).
    pub weights: Vec<Decimal>,
    /// mu' w
    pub realized_return: Rate,
    /// w' Sigma w
    pub realized_variance: Decimal,
}

/// Scalars that pin down the whole minimum-variance frontier.
///
/// With `x = Sigma^-1 mu` and `y = Sigma^-1 1`: `A = mu'x`, `B = mu'y`,
/// `C = 1'y`, `D = AC - B^2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierCoefficients {
    pub a: Decimal,
    pub b: Decimal,
    pub c: Decimal,
    pub d: Decimal,
    /// Return of the global minimum-variance portfolio, `B / C`.
    pub min_variance_return: Rate,
    /// Variance of the global minimum-variance portfolio, `1 / C`.
    pub min_variance: Decimal,
}

impl FrontierCoefficients {
    /// Minimum attainable variance at `target_return`:
    /// `(C r^2 - 2 B r + A) / D`.
    pub fn frontier_variance(&self, target_return: Rate) -> MarkowitzResult<Decimal> {
        let r = target_return;
        let quadratic = self.c.checked_mul(r).and_then(|cr| cr.checked_mul(r));
        let linear = Decimal::TWO.checked_mul(self.b).and_then(|b2| b2.checked_mul(r));
        checked(
            quadratic
                .zip(linear)
                .and_then(|(q, l)| q.checked_sub(l))
                .and_then(|num| num.checked_add(self.a))
                .and_then(|num| num.checked_div(self.d)),
            "frontier variance",
        )
    }
}

/// Input to the enveloped allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationInput {
    /// Asset identifiers; `asset_1..asset_N` when omitted.
    #[serde(default)]
    pub asset_names: Option<Vec<String>>,
    /// Expected return per asset.
    pub expected_returns: Vec<Rate>,
    /// N x N covariance matrix.
    pub covariance_matrix: Matrix,
    /// Desired portfolio return.
    pub target_return: Rate,
    #[serde(default)]
    pub options: AllocatorOptions,
}

/// A single asset weight with its share of return and variance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetWeight {
    pub name: String,
    pub weight: Decimal,
    /// Weight times expected return.
    pub contribution_to_return: Decimal,
    /// Weight times (Sigma w)_i; these sum to the portfolio variance.
    pub contribution_to_variance: Decimal,
}

/// Output of the enveloped allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationOutput {
    pub weights: Vec<AssetWeight>,
    pub realized_return: Rate,
    pub realized_variance: Decimal,
    /// Standard deviation, sqrt of the realized variance.
    pub realized_risk: Decimal,
    /// realized_return - target_return
    pub return_error: Decimal,
    pub coefficients: FrontierCoefficients,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Minimum-variance weights achieving `target_return` under the budget
/// constraint, short positions allowed.
///
/// Closed form of the Lagrangian solution:
/// `w = Sigma^-1 [ (r C - B) mu + (A - r B) 1 ] / D`.
pub fn allocate(
    expected_returns: &[Rate],
    covariance_matrix: &[Vec<Decimal>],
    target_return: Rate,
    options: &AllocatorOptions,
) -> MarkowitzResult<Allocation> {
    let system = FrontierSystem::build(expected_returns, covariance_matrix, options)?;
    let weights = system.weights_for(target_return)?;
    realize(weights, expected_returns, covariance_matrix)
}

/// Frontier scalars A, B, C, D for a return vector and covariance matrix.
pub fn frontier_coefficients(
    expected_returns: &[Rate],
    covariance_matrix: &[Vec<Decimal>],
    options: &AllocatorOptions,
) -> MarkowitzResult<FrontierCoefficients> {
    FrontierSystem::build(expected_returns, covariance_matrix, options).map(|s| s.coefficients)
}

/// Global minimum-variance portfolio, `w = Sigma^-1 1 / C`.
pub fn global_minimum_variance(
    expected_returns: &[Rate],
    covariance_matrix: &[Vec<Decimal>],
    options: &AllocatorOptions,
) -> MarkowitzResult<Allocation> {
    let system = FrontierSystem::build(expected_returns, covariance_matrix, options)?;
    let weights = system.min_variance_weights()?;
    realize(weights, expected_returns, covariance_matrix)
}

/// Allocate for a target return and wrap the result with per-asset
/// contributions, frontier coefficients and warnings.
pub fn allocate_portfolio(
    input: &AllocationInput,
) -> MarkowitzResult<ComputationOutput<AllocationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let mu = &input.expected_returns;
    let sigma = &input.covariance_matrix;
    let target = input.target_return;

    let system = FrontierSystem::build(mu, sigma, &input.options)?;
    let n = mu.len();
    validate_asset_names(input.asset_names.as_deref(), n)?;

    let allocation = realize(system.weights_for(target)?, mu, sigma)?;
    let names = asset_labels(input.asset_names.as_deref(), n);

    let sigma_w = mat_vec_multiply(sigma, &allocation.weights, "Sigma w")?;
    let weights: Vec<AssetWeight> = names
        .into_iter()
        .zip(allocation.weights.iter())
        .enumerate()
        .map(|(i, (name, &w))| -> MarkowitzResult<AssetWeight> {
            Ok(AssetWeight {
                name,
                weight: w,
                contribution_to_return: checked(w.checked_mul(mu[i]), "return contribution")?,
                contribution_to_variance: checked(
                    w.checked_mul(sigma_w[i]),
                    "variance contribution",
                )?,
            })
        })
        .collect::<MarkowitzResult<_>>()?;

    let variance = allocation.realized_variance;
    let realized_risk = if variance > Decimal::ZERO {
        variance.sqrt().unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    // --- Warnings ---
    for aw in &weights {
        if aw.weight < Decimal::ZERO {
            warnings.push(format!(
                "Short position: {} has weight {:.4}",
                aw.name, aw.weight
            ));
        }
    }
    let min_mu = mu.iter().copied().fold(Decimal::MAX, Decimal::min);
    let max_mu = mu.iter().copied().fold(Decimal::MIN, Decimal::max);
    if target < min_mu || target > max_mu {
        warnings.push(format!(
            "Target return {} lies outside the asset return range [{}, {}]; reached through leverage",
            target, min_mu, max_mu
        ));
    }
    if target < system.coefficients.min_variance_return {
        warnings.push(format!(
            "Target return {} is below the global minimum-variance return {:.6}; portfolio is on the inefficient branch",
            target, system.coefficients.min_variance_return
        ));
    }
    if variance < Decimal::ZERO {
        warn!(%variance, "negative realized variance");
        warnings.push(format!(
            "Realized variance {} is negative; covariance matrix is not positive-definite",
            variance
        ));
    }

    let return_error = checked(
        allocation.realized_return.checked_sub(target),
        "return error",
    )?;

    let output = AllocationOutput {
        weights,
        realized_return: allocation.realized_return,
        realized_variance: variance,
        realized_risk,
        return_error,
        coefficients: system.coefficients.clone(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Closed-form Markowitz minimum variance at target return (Lagrange multipliers)",
        &serde_json::json!({
            "n_assets": n,
            "target_return": target.to_string(),
            "budget_constraint": "sum(w) = 1",
            "short_selling": true,
            "require_positive_definite": input.options.require_positive_definite,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Frontier system
// ---------------------------------------------------------------------------

/// One factorisation of Sigma, reused for every target return.
#[derive(Debug, Clone)]
pub(crate) struct FrontierSystem {
    /// Sigma^-1 mu
    sigma_inv_mu: Vec<Decimal>,
    /// Sigma^-1 1
    sigma_inv_ones: Vec<Decimal>,
    pub(crate) coefficients: FrontierCoefficients,
}

impl FrontierSystem {
    pub(crate) fn build(
        expected_returns: &[Rate],
        covariance_matrix: &[Vec<Decimal>],
        options: &AllocatorOptions,
    ) -> MarkowitzResult<Self> {
        let n = validate_problem(expected_returns, covariance_matrix, options)?;

        let lu = LuDecomposition::factorize(covariance_matrix, options.singularity_tolerance)?;
        if options.require_positive_definite {
            check_positive_definite(covariance_matrix)?;
        }

        let ones = vec![Decimal::ONE; n];
        let sigma_inv_mu = lu.solve(expected_returns)?;
        let sigma_inv_ones = lu.solve(&ones)?;

        let a = checked_dot(expected_returns, &sigma_inv_mu, "A = mu' Sigma^-1 mu")?;
        let b = checked_dot(expected_returns, &sigma_inv_ones, "B = mu' Sigma^-1 1")?;
        let c = checked_dot(&ones, &sigma_inv_ones, "C = 1' Sigma^-1 1")?;

        if c <= Decimal::ZERO {
            return Err(MarkowitzError::DegenerateFrontier(format!(
                "1' Sigma^-1 1 = {} must be positive",
                c
            )));
        }

        let ac = checked(a.checked_mul(c), "A * C")?;
        let d = checked(
            b.checked_mul(b).and_then(|bb| ac.checked_sub(bb)),
            "D = A*C - B^2",
        )?;
        let threshold = checked(options.degeneracy_tolerance.checked_mul(ac), "D threshold")?;
        if d <= threshold {
            return Err(MarkowitzError::DegenerateFrontier(format!(
                "A*C - B^2 = {} is not positive; expected returns carry no information beyond the budget constraint",
                d
            )));
        }

        let coefficients = FrontierCoefficients {
            a,
            b,
            c,
            d,
            min_variance_return: checked(b.checked_div(c), "B / C")?,
            min_variance: checked(Decimal::ONE.checked_div(c), "1 / C")?,
        };
        debug!(
            n,
            a = %coefficients.a,
            b = %coefficients.b,
            c = %coefficients.c,
            d = %coefficients.d,
            "frontier coefficients"
        );

        Ok(Self {
            sigma_inv_mu,
            sigma_inv_ones,
            coefficients,
        })
    }

    /// `w = ((r C - B) / D) Sigma^-1 mu + ((A - r B) / D) Sigma^-1 1`
    pub(crate) fn weights_for(&self, target_return: Rate) -> MarkowitzResult<Vec<Decimal>> {
        let FrontierCoefficients { a, b, c, d, .. } = self.coefficients;
        let r = target_return;

        let lambda = checked(
            r.checked_mul(c)
                .and_then(|rc| rc.checked_sub(b))
                .and_then(|num| num.checked_div(d)),
            "return multiplier",
        )?;
        let gamma = checked(
            r.checked_mul(b)
                .and_then(|rb| a.checked_sub(rb))
                .and_then(|num| num.checked_div(d)),
            "budget multiplier",
        )?;

        self.combine(lambda, gamma)
    }

    /// `w = Sigma^-1 1 / C`
    pub(crate) fn min_variance_weights(&self) -> MarkowitzResult<Vec<Decimal>> {
        let inv_c = checked(Decimal::ONE.checked_div(self.coefficients.c), "1 / C")?;
        self.combine(Decimal::ZERO, inv_c)
    }

    fn combine(&self, lambda: Decimal, gamma: Decimal) -> MarkowitzResult<Vec<Decimal>> {
        self.sigma_inv_mu
            .iter()
            .zip(self.sigma_inv_ones.iter())
            .map(|(&x, &y)| {
                checked(
                    lambda
                        .checked_mul(x)
                        .zip(gamma.checked_mul(y))
                        .and_then(|(p, q)| p.checked_add(q)),
                    "portfolio weights",
                )
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn realize(
    weights: Vec<Decimal>,
    expected_returns: &[Rate],
    covariance_matrix: &[Vec<Decimal>],
) -> MarkowitzResult<Allocation> {
    let realized_return = checked_dot(&weights, expected_returns, "realized return")?;
    let realized_variance = quadratic_form(covariance_matrix, &weights, "realized variance")?;
    Ok(Allocation {
        weights,
        realized_return,
        realized_variance,
    })
}

fn asset_labels(names: Option<&[String]>, n: usize) -> Vec<String> {
    match names {
        Some(names) => names.to_vec(),
        None => (1..=n).map(|i| format!("asset_{}", i)).collect(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
