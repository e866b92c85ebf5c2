use markowitz_core::allocator::frontier::{trace_frontier, FrontierInput};
use markowitz_core::allocator::{
    allocate, allocate_portfolio, frontier_coefficients, global_minimum_variance,
    AllocationInput, AllocatorOptions,
};
use markowitz_core::{Matrix, MarkowitzError};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Fixtures
// ===========================================================================

fn tol() -> Decimal {
    dec!(0.000000001)
}

fn opts() -> AllocatorOptions {
    AllocatorOptions::default()
}

fn covariance(vols: &[Decimal], corr: &[Vec<Decimal>]) -> Matrix {
    let n = vols.len();
    (0..n)
        .map(|i| (0..n).map(|j| corr[i][j] * vols[i] * vols[j]).collect())
        .collect()
}

/// Equity / Bonds / Commodities with mixed correlations.
fn three_asset() -> (Vec<Decimal>, Matrix) {
    let vols = [dec!(0.15), dec!(0.20), dec!(0.25)];
    let corr = vec![
        vec![dec!(1.0), dec!(0.3), dec!(0.1)],
        vec![dec!(0.3), dec!(1.0), dec!(0.5)],
        vec![dec!(0.1), dec!(0.5), dec!(1.0)],
    ];
    (
        vec![dec!(0.10), dec!(0.04), dec!(0.07)],
        covariance(&vols, &corr),
    )
}

fn four_asset() -> (Vec<Decimal>, Matrix) {
    let vols = [dec!(0.12), dec!(0.18), dec!(0.22), dec!(0.30)];
    let corr = vec![
        vec![dec!(1.0), dec!(0.2), dec!(-0.1), dec!(0.3)],
        vec![dec!(0.2), dec!(1.0), dec!(0.4), dec!(0.1)],
        vec![dec!(-0.1), dec!(0.4), dec!(1.0), dec!(0.6)],
        vec![dec!(0.3), dec!(0.1), dec!(0.6), dec!(1.0)],
    ];
    (
        vec![dec!(0.05), dec!(0.08), dec!(0.11), dec!(0.15)],
        covariance(&vols, &corr),
    )
}

fn assert_close(actual: Decimal, expected: Decimal, what: &str) {
    assert!(
        (actual - expected).abs() < tol(),
        "{}: expected {}, got {}",
        what,
        expected,
        actual
    );
}

// ===========================================================================
// Constraint invariants
// ===========================================================================

#[test]
fn test_budget_and_return_invariants() {
    for (mu, cov) in [three_asset(), four_asset()] {
        for target in [dec!(-0.05), dec!(0.0), dec!(0.06), dec!(0.12), dec!(0.40)] {
            let alloc = allocate(&mu, &cov, target, &opts()).unwrap();
            let total: Decimal = alloc.weights.iter().sum();
            assert_close(total, Decimal::ONE, "sum of weights");
            assert_close(alloc.realized_return, target, "realized return");
            assert!(alloc.realized_variance >= Decimal::ZERO);
        }
    }
}

#[test]
fn test_two_asset_scenario() {
    let mu = vec![dec!(0.10), dec!(0.20)];
    let cov = vec![vec![dec!(0.04), dec!(0.00)], vec![dec!(0.00), dec!(0.09)]];

    let k = frontier_coefficients(&mu, &cov, &opts()).unwrap();
    assert!((k.a - dec!(0.6944)).abs() < dec!(0.0001));
    assert!((k.b - dec!(4.7222)).abs() < dec!(0.0001));
    assert!((k.c - dec!(36.1111)).abs() < dec!(0.0001));
    assert!((k.d - dec!(2.7778)).abs() < dec!(0.0001));

    let alloc = allocate(&mu, &cov, dec!(0.15), &opts()).unwrap();
    let total: Decimal = alloc.weights.iter().sum();
    assert!((total - Decimal::ONE).abs() < dec!(0.000001));
    assert!((alloc.realized_return - dec!(0.15)).abs() < dec!(0.000001));
}

// ===========================================================================
// Symmetry and idempotence
// ===========================================================================

#[test]
fn test_permutation_symmetry() {
    let (mu, cov) = three_asset();
    // Swap assets 0 and 2.
    let perm = [2usize, 1, 0];
    let mu_p: Vec<Decimal> = perm.iter().map(|&i| mu[i]).collect();
    let cov_p: Matrix = perm
        .iter()
        .map(|&i| perm.iter().map(|&j| cov[i][j]).collect())
        .collect();

    let target = dec!(0.08);
    let base = allocate(&mu, &cov, target, &opts()).unwrap();
    let swapped = allocate(&mu_p, &cov_p, target, &opts()).unwrap();

    for (k, &i) in perm.iter().enumerate() {
        assert_close(swapped.weights[k], base.weights[i], "permuted weight");
    }
    assert_close(swapped.realized_return, base.realized_return, "return");
    assert_close(swapped.realized_variance, base.realized_variance, "variance");
}

#[test]
fn test_round_trip_target() {
    let (mu, cov) = four_asset();
    let first = allocate(&mu, &cov, dec!(0.09), &opts()).unwrap();
    let second = allocate(&mu, &cov, first.realized_return, &opts()).unwrap();
    for (a, b) in first.weights.iter().zip(second.weights.iter()) {
        assert_close(*a, *b, "round-trip weight");
    }
}

#[test]
fn test_repeated_calls_are_independent() {
    let (mu, cov) = three_asset();
    let a = allocate(&mu, &cov, dec!(0.07), &opts()).unwrap();
    let _ = allocate(&mu, &cov, dec!(0.25), &opts()).unwrap();
    let b = allocate(&mu, &cov, dec!(0.07), &opts()).unwrap();
    assert_eq!(a, b);
}

// ===========================================================================
// Frontier shape
// ===========================================================================

#[test]
fn test_variance_non_decreasing_away_from_min_variance_return() {
    let (mu, cov) = four_asset();
    let k = frontier_coefficients(&mu, &cov, &opts()).unwrap();
    let centre = k.min_variance_return;
    let step = dec!(0.01);

    for direction in [Decimal::ONE, Decimal::NEGATIVE_ONE] {
        let mut previous = Decimal::MIN;
        for i in 0..15 {
            let target = centre + direction * step * Decimal::from(i);
            let alloc = allocate(&mu, &cov, target, &opts()).unwrap();
            assert!(
                alloc.realized_variance >= previous - tol(),
                "variance fell from {} to {} at target {}",
                previous,
                alloc.realized_variance,
                target
            );
            previous = alloc.realized_variance;
        }
    }
}

#[test]
fn test_global_minimum_variance_matches_allocation_at_b_over_c() {
    let (mu, cov) = three_asset();
    let k = frontier_coefficients(&mu, &cov, &opts()).unwrap();
    let gmv = global_minimum_variance(&mu, &cov, &opts()).unwrap();
    let at_centre = allocate(&mu, &cov, k.min_variance_return, &opts()).unwrap();
    for (a, b) in gmv.weights.iter().zip(at_centre.weights.iter()) {
        assert_close(*a, *b, "gmv weight");
    }
    assert_close(gmv.realized_variance, k.min_variance, "gmv variance");
}

// ===========================================================================
// Failure modes
// ===========================================================================

#[test]
fn test_single_asset_rejected() {
    let err = allocate(&[dec!(0.1)], &[vec![dec!(0.04)]], dec!(0.1), &opts()).unwrap_err();
    assert!(matches!(err, MarkowitzError::DegenerateFrontier(_)), "{:?}", err);
}

#[test]
fn test_repeated_asset_is_singular() {
    // Asset 3 duplicates asset 1: identical row and column.
    let mu = vec![dec!(0.10), dec!(0.06), dec!(0.10)];
    let cov = vec![
        vec![dec!(0.04), dec!(0.01), dec!(0.04)],
        vec![dec!(0.01), dec!(0.02), dec!(0.01)],
        vec![dec!(0.04), dec!(0.01), dec!(0.04)],
    ];
    let err = allocate(&mu, &cov, dec!(0.08), &opts()).unwrap_err();
    assert!(
        matches!(err, MarkowitzError::SingularCovariance { .. }),
        "{:?}",
        err
    );
}

#[test]
fn test_singularity_is_scale_invariant() {
    // Collinear but tiny entries: a relative pivot test still catches it.
    let mu = vec![dec!(0.001), dec!(0.002)];
    let cov = vec![
        vec![dec!(0.000001), dec!(0.000002)],
        vec![dec!(0.000002), dec!(0.000004)],
    ];
    let err = allocate(&mu, &cov, dec!(0.0015), &opts()).unwrap_err();
    assert!(matches!(err, MarkowitzError::SingularCovariance { .. }));
}

#[test]
fn test_dimension_mismatch_rejected_first() {
    // Singular as well as mis-shaped: the shape error wins.
    let cov = vec![vec![Decimal::ZERO; 2]; 2];
    let err = allocate(&[dec!(0.1), dec!(0.2), dec!(0.3)], &cov, dec!(0.1), &opts()).unwrap_err();
    assert!(matches!(err, MarkowitzError::DimensionMismatch { .. }));
}

#[test]
fn test_error_messages() {
    let err = allocate(&[dec!(0.1)], &[vec![dec!(0.04)]], dec!(0.1), &opts()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Degenerate frontier: At least two assets are required, got 1"
    );
}

// ===========================================================================
// Badly scaled inputs
// ===========================================================================

fn two_asset_diagonal() -> (Vec<Decimal>, Matrix) {
    (
        vec![dec!(0.10), dec!(0.20)],
        vec![vec![dec!(0.04), dec!(0.00)], vec![dec!(0.00), dec!(0.09)]],
    )
}

fn assert_overflow<T: std::fmt::Debug>(result: Result<T, MarkowitzError>, stage: &str) {
    match result {
        Err(MarkowitzError::NumericalOverflow { context }) => {
            assert!(context.contains(stage), "overflow in {:?}, expected {}", context, stage)
        }
        other => panic!("Expected NumericalOverflow in {}, got {:?}", stage, other),
    }
}

#[test]
fn test_huge_target_overflows_variance() {
    let (mu, cov) = two_asset_diagonal();
    let target = dec!(1000000000000000);
    assert_overflow(allocate(&mu, &cov, target, &opts()), "realized variance");

    let input = AllocationInput {
        asset_names: None,
        expected_returns: mu,
        covariance_matrix: cov,
        target_return: target,
        options: opts(),
    };
    assert_overflow(allocate_portfolio(&input), "realized variance");
}

#[test]
fn test_huge_frontier_range_overflows() {
    let (mu, cov) = two_asset_diagonal();
    let input = FrontierInput {
        expected_returns: mu,
        covariance_matrix: cov,
        min_return: None,
        max_return: Some(dec!(1000000000000000)),
        points: Some(3),
        options: opts(),
    };
    assert_overflow(trace_frontier(&input), "realized variance");
}

#[test]
fn test_frontier_grid_overflows_at_decimal_limits() {
    let (mu, cov) = two_asset_diagonal();
    let input = FrontierInput {
        expected_returns: mu,
        covariance_matrix: cov,
        min_return: Some(Decimal::MIN),
        max_return: Some(Decimal::MAX),
        points: Some(3),
        options: opts(),
    };
    assert_overflow(trace_frontier(&input), "frontier step");
}

#[test]
fn test_covariance_near_decimal_max_overflows_elimination() {
    // Symmetric with a positive diagonal, but eliminating the first column
    // doubles an entry past Decimal::MAX.
    let a = dec!(50000000000000000000000000000);
    let cov = vec![vec![a, a, -a], vec![a, a, a], vec![-a, a, a]];
    let mu = vec![dec!(0.1), dec!(0.2), dec!(0.3)];
    assert_overflow(allocate(&mu, &cov, dec!(0.2), &opts()), "LU elimination");
    assert_overflow(frontier_coefficients(&mu, &cov, &opts()), "LU elimination");
}

#[test]
fn test_huge_expected_returns_overflow_coefficients() {
    let mu = vec![dec!(7000000000000000000000000000), dec!(7500000000000000000000000000)];
    let cov = vec![vec![dec!(1), dec!(0)], vec![dec!(0), dec!(1)]];
    assert_overflow(frontier_coefficients(&mu, &cov, &opts()), "A = mu'");
    assert_overflow(global_minimum_variance(&mu, &cov, &opts()), "A = mu'");
}

#[test]
fn test_frontier_variance_overflows_for_extreme_return() {
    let (mu, cov) = two_asset_diagonal();
    let k = frontier_coefficients(&mu, &cov, &opts()).unwrap();
    assert_overflow(k.frontier_variance(dec!(1000000000000000)), "frontier variance");
    assert!(k.frontier_variance(dec!(0.15)).is_ok());
}
