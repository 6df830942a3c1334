use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RiskError;
use crate::stats::{covariance_matrix, symmetric_eigen};
use crate::RiskResult;

/// Principal components of the asset return covariance matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcaOutput {
    pub symbols: Vec<String>,
    /// Retained eigenvalues, descending
    pub eigenvalues: Vec<f64>,
    /// eigenvalue / sum of all eigenvalues
    pub explained_variance: Vec<f64>,
    /// Running sum of `explained_variance`
    pub cumulative_variance: Vec<f64>,
    /// One loading vector per retained component, in `symbols` order
    pub components: Vec<Vec<f64>>,
    pub num_components: usize,
}

/// Eigen-decompose the covariance of `asset_returns` and keep the first
/// `min(num_components, assets)` components.
pub fn compute_pca(
    symbols: &[String],
    asset_returns: &[Vec<f64>],
    num_components: usize,
) -> RiskResult<PcaOutput> {
    if num_components < 1 {
        return Err(RiskError::invalid_parameter(
            "components",
            "Must be at least 1",
        ));
    }
    if symbols.len() != asset_returns.len() {
        return Err(RiskError::invalid_parameter(
            "symbols",
            format!(
                "{} symbols for {} return series",
                symbols.len(),
                asset_returns.len()
            ),
        ));
    }

    let cov = covariance_matrix(asset_returns)?;
    let pairs = symmetric_eigen(&cov)?;

    // rank-deficient covariance yields eigenvalues a few ULPs below zero
    let values: Vec<f64> = pairs.iter().map(|p| p.value.max(0.0)).collect();
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return Err(RiskError::numerical(
            "pca",
            "covariance matrix has no positive variance",
        ));
    }

    let keep = num_components.min(pairs.len());
    let retained = &pairs[..keep];
    let eigenvalues: Vec<f64> = values[..keep].to_vec();
    let explained_variance: Vec<f64> = eigenvalues.iter().map(|v| v / total).collect();
    let cumulative_variance: Vec<f64> = explained_variance
        .iter()
        .scan(0.0_f64, |acc, v| {
            *acc = (*acc + v).max(*acc).min(1.0);
            Some(*acc)
        })
        .collect();
    let components = retained.iter().map(|p| p.vector.clone()).collect();

    debug!(assets = symbols.len(), kept = keep, "PCA");

    Ok(PcaOutput {
        symbols: symbols.to_vec(),
        eigenvalues,
        explained_variance,
        cumulative_variance,
        components,
        num_components: keep,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("S{}", i)).collect()
    }

    fn series() -> Vec<Vec<f64>> {
        vec![
            vec![0.01, -0.02, 0.015, 0.003, -0.007, 0.012, -0.004, 0.009],
            vec![0.008, -0.015, 0.01, 0.001, -0.004, 0.009, -0.002, 0.006],
            vec![-0.004, 0.01, 0.002, -0.006, 0.011, -0.003, 0.005, -0.001],
        ]
    }

    #[test]
    fn test_explained_variance_sorted_and_cumulative() {
        let out = compute_pca(&symbols(3), &series(), 3).unwrap();
        assert_eq!(out.num_components, 3);
        for w in out.explained_variance.windows(2) {
            assert!(w[0] >= w[1]);
        }
        for w in out.cumulative_variance.windows(2) {
            assert!(w[1] >= w[0]);
        }
        let last = *out.cumulative_variance.last().unwrap();
        assert!(last <= 1.0 + 1e-9);
        assert!((last - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_components_capped_at_asset_count() {
        let out = compute_pca(&symbols(3), &series(), 10).unwrap();
        assert_eq!(out.num_components, 3);
        assert_eq!(out.components.len(), 3);
        assert_eq!(out.components[0].len(), 3);
    }

    #[test]
    fn test_single_component() {
        let out = compute_pca(&symbols(3), &series(), 1).unwrap();
        assert_eq!(out.explained_variance.len(), 1);
        assert!(out.explained_variance[0] >= 1.0 / 3.0);
        let norm: f64 = out.components[0].iter().map(|x| x * x).sum();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    fn assert_pca_invariants(out: &PcaOutput) {
        assert!(out.eigenvalues.iter().all(|v| *v >= 0.0), "{:?}", out.eigenvalues);
        assert!(
            out.explained_variance.iter().all(|v| *v >= 0.0),
            "{:?}",
            out.explained_variance
        );
        for w in out.cumulative_variance.windows(2) {
            assert!(w[1] >= w[0], "{:?}", out.cumulative_variance);
        }
        assert!(*out.cumulative_variance.last().unwrap() <= 1.0);
    }

    #[test]
    fn test_more_assets_than_periods() {
        // 6 assets over 3 periods: covariance rank is at most 2
        let series: Vec<Vec<f64>> = (0..6)
            .map(|k| {
                (0..3)
                    .map(|t| ((k * 7 + t * 3) % 11) as f64 / 100.0 - 0.05)
                    .collect()
            })
            .collect();
        let out = compute_pca(&symbols(6), &series, 6).unwrap();
        assert_eq!(out.num_components, 6);
        assert_pca_invariants(&out);
        assert!((out.cumulative_variance[5] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_collinear_and_duplicate_assets() {
        let base = series();
        let scaled: Vec<f64> = base[0].iter().map(|r| r * 2.0).collect();
        let input = vec![base[0].clone(), scaled, base[0].clone(), base[2].clone()];
        let out = compute_pca(&symbols(4), &input, 4).unwrap();
        assert_pca_invariants(&out);
        assert!(out.explained_variance[3].abs() < 1e-9);
    }

    #[test]
    fn test_zero_components_rejected() {
        assert!(compute_pca(&symbols(3), &series(), 0).is_err());
    }
}
