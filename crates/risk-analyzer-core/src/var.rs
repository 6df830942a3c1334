//! Value-at-Risk estimators.
//!
//! All estimators are pure functions of a return series (or of the per-asset
//! return matrix for Monte Carlo) and report VaR in return units as a
//! positive loss. Conversion to currency and the plausibility overrides live
//! in [`crate::clamp`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use tracing::debug;

use crate::error::RiskError;
use crate::stats::descriptive::quantile_sorted;
use crate::stats::{cholesky_lower, covariance_matrix, mean, normal_quantile, std_dev};
use crate::types::{validate_confidence, validate_horizon, RiskMethod};
use crate::RiskResult;

/// VaR estimate in return units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarResult {
    /// Loss not expected to be exceeded, as a positive fraction of value
    pub var: f64,
    pub method: RiskMethod,
    pub confidence: f64,
    pub horizon_days: u32,
    /// Horizon-scaled empirical or simulated returns, ascending
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub distribution: Vec<f64>,
}

/// Monte Carlo controls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MonteCarloParams {
    pub simulations: u32,
    /// Fixed seed for reproducible runs; entropy when absent
    pub seed: Option<u64>,
}

fn require_returns(returns: &[f64]) -> RiskResult<()> {
    if returns.is_empty() {
        return Err(RiskError::InsufficientData("no returns data".into()));
    }
    if returns.iter().any(|r| !r.is_finite()) {
        return Err(RiskError::InvalidInput(
            "returns contain non-finite values".into(),
        ));
    }
    Ok(())
}

/// Square-root-of-time scaling of each return, sorted ascending.
pub fn scaled_sorted_returns(returns: &[f64], horizon_days: u32) -> Vec<f64> {
    let scale = (horizon_days as f64).sqrt();
    let mut scaled: Vec<f64> = returns.iter().map(|r| r * scale).collect();
    scaled.sort_by(|a, b| a.total_cmp(b));
    scaled
}

/// Historical simulation: VaR = -Quantile(r * sqrt(h), 1 - confidence).
pub fn historical_var(returns: &[f64], confidence: f64, horizon_days: u32) -> RiskResult<VarResult> {
    require_returns(returns)?;
    validate_confidence(confidence)?;
    validate_horizon(horizon_days)?;

    let scaled = scaled_sorted_returns(returns, horizon_days);
    let q = quantile_sorted(&scaled, 1.0 - confidence);
    let var = (-q).max(0.0);
    debug!(observations = returns.len(), confidence, horizon_days, var, "historical VaR");

    Ok(VarResult {
        var,
        method: RiskMethod::Historical,
        confidence,
        horizon_days,
        distribution: scaled,
    })
}

/// Mean and volatility scaled to the horizon: (mu * h, sigma * sqrt(h)).
pub(crate) fn scaled_moments(returns: &[f64], horizon_days: u32) -> (f64, f64) {
    let h = horizon_days as f64;
    (mean(returns) * h, std_dev(returns) * h.sqrt())
}

/// Variance-covariance estimate under normality:
/// VaR = -(mu_h + z_{1-c} * sigma_h).
pub fn parametric_var(returns: &[f64], confidence: f64, horizon_days: u32) -> RiskResult<VarResult> {
    require_returns(returns)?;
    validate_confidence(confidence)?;
    validate_horizon(horizon_days)?;

    let (mu_h, sigma_h) = scaled_moments(returns, horizon_days);
    let z = normal_quantile(1.0 - confidence)?;
    let var = (-(mu_h + z * sigma_h)).max(0.0);
    debug!(mu_h, sigma_h, z, var, "parametric VaR");

    Ok(VarResult {
        var,
        method: RiskMethod::ParametricNormal,
        confidence,
        horizon_days,
        distribution: Vec::new(),
    })
}

/// Correlated-normal simulation of portfolio returns.
///
/// The asset covariance matrix is Cholesky-factored; each path draws
/// independent standard normals, correlates them through L, adds the asset
/// means and weights the result into a portfolio return scaled by sqrt(h).
pub fn monte_carlo_var(
    asset_returns: &[Vec<f64>],
    weights: &[f64],
    confidence: f64,
    horizon_days: u32,
    params: MonteCarloParams,
) -> RiskResult<VarResult> {
    validate_confidence(confidence)?;
    validate_horizon(horizon_days)?;
    if asset_returns.is_empty() || weights.is_empty() {
        return Err(RiskError::InsufficientData(
            "Monte Carlo requires at least one asset".into(),
        ));
    }
    if asset_returns.len() != weights.len() {
        return Err(RiskError::invalid_parameter(
            "weights",
            format!(
                "Expected {} weights, got {}",
                asset_returns.len(),
                weights.len()
            ),
        ));
    }
    if params.simulations == 0 {
        return Err(RiskError::invalid_parameter(
            "simulations",
            "Must be at least 1",
        ));
    }

    let cov = covariance_matrix(asset_returns)?;
    let l = cholesky_lower(&cov)?;
    let means: Vec<f64> = asset_returns.iter().map(|s| mean(s)).collect();
    let n = means.len();

    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| RiskError::numerical("monte_carlo_var", e.to_string()))?;
    let mut rng = match params.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let scale = (horizon_days as f64).sqrt();
    let mut z = vec![0.0; n];
    let mut simulated: Vec<f64> = Vec::with_capacity(params.simulations as usize);
    for _ in 0..params.simulations {
        for zi in z.iter_mut() {
            *zi = rng.sample(normal);
        }
        let portfolio_return: f64 = (0..n)
            .map(|i| {
                let shock: f64 = (0..=i).map(|j| l[i][j] * z[j]).sum();
                weights[i] * (means[i] + shock)
            })
            .sum();
        simulated.push(portfolio_return * scale);
    }

    simulated.sort_by(|a, b| a.total_cmp(b));
    let var = (-quantile_sorted(&simulated, 1.0 - confidence)).max(0.0);
    debug!(assets = n, simulations = params.simulations, var, "Monte Carlo VaR");

    Ok(VarResult {
        var,
        method: RiskMethod::MonteCarlo,
        confidence,
        horizon_days,
        distribution: simulated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::quantile;
    use approx::assert_relative_eq;

    fn reference_returns() -> Vec<f64> {
        vec![
            -0.02, 0.01, 0.015, -0.01, 0.005, 0.02, -0.015, 0.01, -0.025, 0.03, -0.01, 0.008,
            0.012, -0.018, 0.022,
        ]
    }

    #[test]
    fn test_historical_var_is_negative_fifth_percentile() {
        let returns = reference_returns();
        let result = historical_var(&returns, 0.95, 1).unwrap();
        assert!(result.var > 0.0);
        assert_relative_eq!(result.var, -quantile(&returns, 0.05), epsilon = 1e-15);
        // h = 14 * 0.05 = 0.7 between -0.025 and -0.02
        assert_relative_eq!(result.var, 0.0215, epsilon = 1e-12);
        assert_eq!(result.method, RiskMethod::Historical);
    }

    #[test]
    fn test_historical_var_scales_with_sqrt_time() {
        let returns = reference_returns();
        let one = historical_var(&returns, 0.95, 1).unwrap();
        let ten = historical_var(&returns, 0.95, 10).unwrap();
        assert_relative_eq!(ten.var, one.var * 10_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_historical_var_never_negative() {
        let gains = vec![0.01, 0.02, 0.03, 0.015];
        assert_eq!(historical_var(&gains, 0.95, 1).unwrap().var, 0.0);
    }

    #[test]
    fn test_historical_var_rejects_bad_parameters() {
        let returns = reference_returns();
        assert!(historical_var(&[], 0.95, 1).is_err());
        assert!(historical_var(&returns, 1.0, 1).is_err());
        assert!(historical_var(&returns, 0.0, 1).is_err());
        assert!(historical_var(&returns, 0.95, 0).is_err());
    }

    #[test]
    fn test_parametric_var_closed_form() {
        let returns = vec![
            0.01, -0.02, 0.015, -0.01, 0.02, -0.015, 0.01, 0.008, -0.012, 0.018,
        ];
        let result = parametric_var(&returns, 0.99, 10).unwrap();
        let mu = mean(&returns) * 10.0;
        let sigma = std_dev(&returns) * 10_f64.sqrt();
        let z = normal_quantile(0.01).unwrap();
        assert_relative_eq!(result.var, -(mu + z * sigma), epsilon = 1e-12);
        assert!(result.var > 0.0);
        assert_eq!(result.method.as_str(), "parametric_normal");
    }

    #[test]
    fn test_higher_confidence_higher_parametric_var() {
        let returns = reference_returns();
        let v95 = parametric_var(&returns, 0.95, 1).unwrap().var;
        let v99 = parametric_var(&returns, 0.99, 1).unwrap().var;
        assert!(v99 > v95);
    }

    fn two_asset_returns() -> Vec<Vec<f64>> {
        vec![
            vec![0.01, -0.02, 0.015, 0.003, -0.007, 0.012, -0.011, 0.004],
            vec![0.004, -0.01, 0.02, -0.006, 0.001, 0.009, -0.015, 0.007],
        ]
    }

    #[test]
    fn test_monte_carlo_seeded_reproducibility() {
        let params = MonteCarloParams {
            simulations: 2_000,
            seed: Some(42),
        };
        let a = monte_carlo_var(&two_asset_returns(), &[0.6, 0.4], 0.95, 1, params).unwrap();
        let b = monte_carlo_var(&two_asset_returns(), &[0.6, 0.4], 0.95, 1, params).unwrap();
        assert_eq!(a.var, b.var);
        assert_eq!(a.distribution.len(), 2_000);
        assert!(a.var > 0.0);
    }

    #[test]
    fn test_monte_carlo_close_to_parametric() {
        let assets = two_asset_returns();
        let weights = [0.6, 0.4];
        let port = crate::returns::portfolio_returns(&assets, &weights).unwrap();
        let analytic = parametric_var(&port, 0.95, 1).unwrap().var;
        let params = MonteCarloParams {
            simulations: 50_000,
            seed: Some(7),
        };
        let simulated = monte_carlo_var(&assets, &weights, 0.95, 1, params).unwrap().var;
        assert!((simulated - analytic).abs() / analytic < 0.1);
    }

    #[test]
    fn test_monte_carlo_fails_on_singular_covariance() {
        let a = vec![0.01, -0.02, 0.015, 0.003];
        let assets = vec![a.clone(), a];
        let params = MonteCarloParams {
            simulations: 100,
            seed: Some(1),
        };
        assert!(matches!(
            monte_carlo_var(&assets, &[0.5, 0.5], 0.95, 1, params),
            Err(RiskError::NumericalFailure { .. })
        ));
    }

    #[test]
    fn test_monte_carlo_rejects_zero_simulations() {
        let params = MonteCarloParams {
            simulations: 0,
            seed: None,
        };
        assert!(monte_carlo_var(&two_asset_returns(), &[0.6, 0.4], 0.95, 1, params).is_err());
    }
}
