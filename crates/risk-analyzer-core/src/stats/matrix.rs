use nalgebra::{Cholesky, DMatrix, SymmetricEigen};

use super::descriptive::{correlation, covariance};
use crate::error::RiskError;
use crate::RiskResult;

/// Iteration cap for the symmetric eigen solver.
const EIGEN_MAX_ITERATIONS: usize = 1_000;

/// One eigenvalue with its unit eigenvector and its position in the
/// solver's output.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenPair {
    pub value: f64,
    pub vector: Vec<f64>,
    pub index: usize,
}

fn validate_series(series: &[Vec<f64>], routine: &str) -> RiskResult<usize> {
    let first = series.first().ok_or_else(|| {
        RiskError::InsufficientData(format!("{}: no return series supplied", routine))
    })?;
    let periods = first.len();
    for (i, s) in series.iter().enumerate() {
        if s.len() != periods {
            return Err(RiskError::invalid_parameter(
                "asset_returns",
                format!(
                    "series {} has {} periods, expected {}",
                    i,
                    s.len(),
                    periods
                ),
            ));
        }
    }
    if periods < 2 {
        return Err(RiskError::InsufficientData(format!(
            "{}: at least 2 periods required, got {}",
            routine, periods
        )));
    }
    Ok(periods)
}

/// Sample covariance matrix of per-asset return series (one Vec per asset).
pub fn covariance_matrix(series: &[Vec<f64>]) -> RiskResult<Vec<Vec<f64>>> {
    validate_series(series, "covariance_matrix")?;
    let n = series.len();
    let mut cov = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            let c = covariance(&series[i], &series[j]);
            cov[i][j] = c;
            cov[j][i] = c;
        }
    }
    Ok(cov)
}

/// Pearson correlation matrix. The diagonal is set to exactly 1.0 rather
/// than recomputed.
pub fn correlation_matrix(series: &[Vec<f64>]) -> RiskResult<Vec<Vec<f64>>> {
    validate_series(series, "correlation_matrix")?;
    let n = series.len();
    let mut corr = vec![vec![0.0; n]; n];
    for i in 0..n {
        corr[i][i] = 1.0;
        for j in (i + 1)..n {
            let c = correlation(&series[i], &series[j]);
            corr[i][j] = c;
            corr[j][i] = c;
        }
    }
    Ok(corr)
}

fn to_dmatrix(m: &[Vec<f64>]) -> RiskResult<DMatrix<f64>> {
    let n = m.len();
    if n == 0 || m.iter().any(|row| row.len() != n) {
        return Err(RiskError::invalid_parameter(
            "matrix",
            "must be square and non-empty",
        ));
    }
    Ok(DMatrix::from_fn(n, n, |i, j| m[i][j]))
}

/// Lower-triangular L with L * L^T = `m`.
pub fn cholesky_lower(m: &[Vec<f64>]) -> RiskResult<Vec<Vec<f64>>> {
    let dm = to_dmatrix(m)?;
    let n = dm.nrows();
    let chol = Cholesky::new(dm).ok_or_else(|| {
        RiskError::numerical(
            "cholesky",
            "covariance matrix is not positive definite",
        )
    })?;
    let l = chol.l();
    Ok((0..n)
        .map(|i| (0..n).map(|j| l[(i, j)]).collect())
        .collect())
}

/// Eigen-decomposition of a symmetric matrix, sorted by eigenvalue
/// descending; equal eigenvalues keep the solver's index order.
///
/// Each eigenvector is sign-normalised so that its largest-magnitude
/// loading is positive, which keeps outputs stable across runs.
pub fn symmetric_eigen(m: &[Vec<f64>]) -> RiskResult<Vec<EigenPair>> {
    let dm = to_dmatrix(m)?;
    let n = dm.nrows();
    let eig = SymmetricEigen::try_new(dm, f64::EPSILON, EIGEN_MAX_ITERATIONS).ok_or_else(|| {
        RiskError::numerical(
            "symmetric_eigen",
            format!("did not converge within {} iterations", EIGEN_MAX_ITERATIONS),
        )
    })?;

    let mut pairs: Vec<EigenPair> = (0..n)
        .map(|k| {
            let mut vector: Vec<f64> = eig.eigenvectors.column(k).iter().copied().collect();
            let pivot = vector
                .iter()
                .copied()
                .fold(0.0_f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
            if pivot < 0.0 {
                vector.iter_mut().for_each(|x| *x = -*x);
            }
            EigenPair {
                value: eig.eigenvalues[k],
                vector,
                index: k,
            }
        })
        .collect();

    if pairs.iter().any(|p| !p.value.is_finite()) {
        return Err(RiskError::numerical(
            "symmetric_eigen",
            "non-finite eigenvalue",
        ));
    }

    pairs.sort_by(|a, b| b.value.total_cmp(&a.value).then(a.index.cmp(&b.index)));
    Ok(pairs)
}
