use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RiskError;
use crate::stats::{covariance_matrix, normal_quantile};
use crate::types::{money_from_f64, validate_confidence, Money};
use crate::RiskResult;

/// Portfolio volatility below this is treated as zero.
const VOLATILITY_FLOOR: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetContribution {
    pub symbol: String,
    pub weight: f64,
    /// d(VaR)/d(w_i) in currency
    pub marginal_var: Money,
    /// w_i x marginal VaR; components sum to the portfolio VaR
    pub component_var: Money,
    /// Share of portfolio VaR, 0 when the portfolio has no volatility
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskContributionOutput {
    /// Parametric one-period VaR of the whole portfolio in currency
    pub portfolio_var: Money,
    pub portfolio_volatility: f64,
    pub contributions: Vec<AssetContribution>,
}

/// Euler decomposition of parametric VaR.
///
/// sigma_p = sqrt(w' S w); marginal_i = |z_alpha| (S w)_i / sigma_p x value;
/// component_i = w_i x marginal_i.
pub fn compute_risk_contribution(
    symbols: &[String],
    asset_returns: &[Vec<f64>],
    weights: &[f64],
    confidence: f64,
    total_value: Money,
) -> RiskResult<RiskContributionOutput> {
    validate_confidence(confidence)?;
    if symbols.len() != asset_returns.len() || weights.len() != asset_returns.len() {
        return Err(RiskError::invalid_parameter(
            "weights",
            format!(
                "{} symbols, {} weights, {} return series",
                symbols.len(),
                weights.len(),
                asset_returns.len()
            ),
        ));
    }

    let cov = covariance_matrix(asset_returns)?;
    let n = weights.len();
    let sigma_w: Vec<f64> = (0..n)
        .map(|i| (0..n).map(|j| cov[i][j] * weights[j]).sum())
        .collect();
    let variance: f64 = (0..n).map(|i| weights[i] * sigma_w[i]).sum();
    let sigma_p = variance.max(0.0).sqrt();
    let z = normal_quantile(1.0 - confidence)?.abs();

    let mut contributions = Vec::with_capacity(n);
    for i in 0..n {
        let marginal = if sigma_p > VOLATILITY_FLOOR {
            z * sigma_w[i] / sigma_p
        } else {
            0.0
        };
        let marginal_var = money_from_f64(marginal, "marginal VaR")? * total_value;
        let component_var = money_from_f64(weights[i] * marginal, "component VaR")? * total_value;
        contributions.push(AssetContribution {
            symbol: symbols[i].clone(),
            weight: weights[i],
            marginal_var,
            component_var,
            percentage: 0.0,
        });
    }

    let portfolio_var: Money = contributions.iter().map(|c| c.component_var).sum();
    if !portfolio_var.is_zero() {
        for c in contributions.iter_mut() {
            c.percentage = crate::types::money_to_f64(c.component_var / portfolio_var)?;
        }
    }
    debug!(assets = n, sigma_p, portfolio_var = %portfolio_var, "risk contribution");

    Ok(RiskContributionOutput {
        portfolio_var,
        portfolio_volatility: sigma_p,
        contributions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn symbols() -> Vec<String> {
        vec!["A".into(), "B".into()]
    }

    fn series() -> Vec<Vec<f64>> {
        vec![
            vec![0.01, -0.02, 0.015, 0.003, -0.007, 0.012, -0.011, 0.004],
            vec![0.004, -0.01, 0.02, -0.006, 0.001, 0.009, -0.015, 0.007],
        ]
    }

    #[test]
    fn test_percentages_sum_to_one() {
        let out =
            compute_risk_contribution(&symbols(), &series(), &[0.6, 0.4], 0.95, dec!(100000)).unwrap();
        let total: f64 = out.contributions.iter().map(|c| c.percentage).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(out.portfolio_var > Decimal::ZERO);
    }

    #[test]
    fn test_components_sum_to_parametric_var() {
        let out =
            compute_risk_contribution(&symbols(), &series(), &[0.6, 0.4], 0.95, dec!(1)).unwrap();
        let z = normal_quantile(0.05).unwrap().abs();
        let expected = z * out.portfolio_volatility;
        let got = crate::types::money_to_f64(out.portfolio_var).unwrap();
        assert!((got - expected).abs() < 1e-9);
    }

    #[test]
    fn test_constant_returns_give_zero_contributions() {
        let flat = vec![vec![0.0; 6], vec![0.0; 6]];
        let out = compute_risk_contribution(&symbols(), &flat, &[0.5, 0.5], 0.95, dec!(1000)).unwrap();
        assert_eq!(out.portfolio_var, Decimal::ZERO);
        assert!(out.contributions.iter().all(|c| c.percentage == 0.0));
    }
}
