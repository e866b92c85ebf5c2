use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use super::mean_variance::{realize, Allocation, FrontierCoefficients, FrontierSystem};
use super::options::AllocatorOptions;
use crate::error::MarkowitzError;
use crate::linalg::checked;
use crate::types::{with_metadata, ComputationOutput, Matrix, Rate};
use crate::MarkowitzResult;

const DEFAULT_POINTS: u32 = 20;
/// Upper bound on the grid size; every point carries a full weight vector.
pub const MAX_POINTS: u32 = 10_000;

/// Input for tracing the minimum-variance frontier over a return grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierInput {
    pub expected_returns: Vec<Rate>,
    pub covariance_matrix: Matrix,
    /// Lowest target return (default: smallest expected return).
    #[serde(default)]
    pub min_return: Option<Rate>,
    /// Highest target return (default: largest expected return).
    #[serde(default)]
    pub max_return: Option<Rate>,
    /// Number of evenly spaced targets, endpoints included (default 20).
    #[serde(default)]
    pub points: Option<u32>,
    #[serde(default)]
    pub options: AllocatorOptions,
}

/// A single point on the frontier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierPoint {
    pub target_return: Rate,
    pub expected_return: Rate,
    pub variance: Decimal,
    pub risk: Decimal,
    pub weights: Vec<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierOutput {
    pub points: Vec<FrontierPoint>,
    pub coefficients: FrontierCoefficients,
    pub min_variance_portfolio: Allocation,
}

/// Trace the frontier: one factorisation, then the closed form at each
/// grid target.
pub fn trace_frontier(input: &FrontierInput) -> MarkowitzResult<ComputationOutput<FrontierOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let mu = &input.expected_returns;
    let sigma = &input.covariance_matrix;

    let system = FrontierSystem::build(mu, sigma, &input.options)?;

    let num_points = input.points.unwrap_or(DEFAULT_POINTS);
    if !(2..=MAX_POINTS).contains(&num_points) {
        return Err(MarkowitzError::InvalidInput {
            field: "points".into(),
            reason: format!(
                "Frontier points must be between 2 and {}, got {}",
                MAX_POINTS, num_points
            ),
        });
    }

    let lo = input
        .min_return
        .unwrap_or_else(|| mu.iter().copied().fold(Decimal::MAX, Decimal::min));
    let hi = input
        .max_return
        .unwrap_or_else(|| mu.iter().copied().fold(Decimal::MIN, Decimal::max));
    if lo > hi {
        return Err(MarkowitzError::InvalidInput {
            field: "min_return".into(),
            reason: format!("min_return {} exceeds max_return {}", lo, hi),
        });
    }

    let step = checked(
        hi.checked_sub(lo)
            .and_then(|span| span.checked_div(Decimal::from(num_points - 1))),
        "frontier step",
    )?;
    let mut points = Vec::with_capacity(num_points as usize);
    for i in 0..num_points {
        // Pin the last point to `hi` so rounding in `step` cannot overshoot.
        let target = if i == num_points - 1 {
            hi
        } else {
            checked(
                step.checked_mul(Decimal::from(i))
                    .and_then(|offset| lo.checked_add(offset)),
                "frontier target",
            )?
        };
        let alloc = realize(system.weights_for(target)?, mu, sigma)?;
        let risk = if alloc.realized_variance > Decimal::ZERO {
            alloc.realized_variance.sqrt().unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };
        points.push(FrontierPoint {
            target_return: target,
            expected_return: alloc.realized_return,
            variance: alloc.realized_variance,
            risk,
            weights: alloc.weights,
        });
    }

    let min_variance_portfolio = realize(system.min_variance_weights()?, mu, sigma)?;

    let gmv_return = system.coefficients.min_variance_return;
    if hi < gmv_return {
        warnings.push(format!(
            "Entire return range lies below the global minimum-variance return {:.6}; all points are inefficient",
            gmv_return
        ));
    }
    debug!(points = points.len(), %lo, %hi, "frontier traced");

    let output = FrontierOutput {
        points,
        coefficients: system.coefficients.clone(),
        min_variance_portfolio,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Closed-form Markowitz minimum-variance frontier",
        &serde_json::json!({
            "n_assets": mu.len(),
            "min_return": lo.to_string(),
            "max_return": hi.to_string(),
            "points": num_points,
        }),
        warnings,
        elapsed,
        output,
    ))
}
