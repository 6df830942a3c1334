use serde::{Deserialize, Serialize};

use crate::error::RiskError;
use crate::stats::std_dev;
use crate::types::PricePoint;
use crate::RiskResult;

/// How period returns are derived from closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
    /// ln(close[t+1] / close[t])
    Log,
    /// (close[t+1] - close[t]) / close[t]
    Simple,
}

impl ReturnKind {
    pub fn from_flag(use_log: bool) -> Self {
        if use_log {
            ReturnKind::Log
        } else {
            ReturnKind::Simple
        }
    }
}

/// Period returns of a price series; one element shorter than `prices`.
///
/// Fewer than two prices give an empty series, not an error.
pub fn compute_returns(prices: &[PricePoint], kind: ReturnKind) -> Vec<f64> {
    if prices.len() < 2 {
        return Vec::new();
    }
    prices
        .windows(2)
        .map(|w| {
            let (prev, next) = (w[0].close, w[1].close);
            match kind {
                ReturnKind::Log => (next / prev).ln(),
                ReturnKind::Simple => (next - prev) / prev,
            }
        })
        .collect()
}

/// Weighted sum of asset returns per period.
///
/// `asset_returns[i][t]` is asset i's return in period t; all series must
/// have the same number of periods and there must be one weight per asset.
pub fn portfolio_returns(asset_returns: &[Vec<f64>], weights: &[f64]) -> RiskResult<Vec<f64>> {
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
    let Some(first) = asset_returns.first() else {
        return Ok(Vec::new());
    };
    let periods = first.len();
    if let Some((i, s)) = asset_returns
        .iter()
        .enumerate()
        .find(|(_, s)| s.len() != periods)
    {
        return Err(RiskError::invalid_parameter(
            "asset_returns",
            format!("series {} has {} periods, expected {}", i, s.len(), periods),
        ));
    }

    Ok((0..periods)
        .map(|t| {
            asset_returns
                .iter()
                .zip(weights.iter())
                .map(|(series, w)| w * series[t])
                .sum()
        })
        .collect())
}

/// Keep the most recent `min(len)` observations of every series so they
/// share a common window.
pub fn align_to_common_window(series: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
    let common = series.iter().map(Vec::len).min().unwrap_or(0);
    series
        .into_iter()
        .map(|s| {
            let skip = s.len() - common;
            s[skip..].to_vec()
        })
        .collect()
}

/// Daily volatility scaled to a year of `trading_days`.
pub fn annualized_volatility(returns: &[f64], trading_days: u32) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    std_dev(returns) * (trading_days as f64).sqrt()
}

/// Standard deviation over every full trailing window.
pub fn rolling_volatility(returns: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || returns.len() < window {
        return Vec::new();
    }
    returns.windows(window).map(std_dev).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn prices(closes: &[f64]) -> Vec<PricePoint> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| PricePoint {
                date: start + chrono::Days::new(i as u64),
                close: *c,
            })
            .collect()
    }

    #[test]
    fn test_simple_and_log_returns() {
        let p = prices(&[100.0, 110.0, 99.0]);
        let simple = compute_returns(&p, ReturnKind::Simple);
        assert_eq!(simple.len(), 2);
        assert_relative_eq!(simple[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(simple[1], -0.1, epsilon = 1e-12);

        let log = compute_returns(&p, ReturnKind::Log);
        assert_relative_eq!(log[0], (1.1_f64).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_short_series_gives_empty_returns() {
        assert!(compute_returns(&prices(&[100.0]), ReturnKind::Log).is_empty());
        assert!(compute_returns(&[], ReturnKind::Simple).is_empty());
    }

    #[test]
    fn test_portfolio_returns_weighted_sum() {
        let assets = vec![vec![0.01, 0.02], vec![-0.01, 0.04]];
        let r = portfolio_returns(&assets, &[0.25, 0.75]).unwrap();
        assert_relative_eq!(r[0], 0.0025 - 0.0075, epsilon = 1e-12);
        assert_relative_eq!(r[1], 0.005 + 0.03, epsilon = 1e-12);
    }

    #[test]
    fn test_portfolio_returns_mismatched_lengths() {
        let assets = vec![vec![0.01, 0.02], vec![-0.01]];
        assert!(matches!(
            portfolio_returns(&assets, &[0.5, 0.5]),
            Err(RiskError::InvalidParameter { .. })
        ));
        assert!(portfolio_returns(&assets, &[1.0]).is_err());
    }

    #[test]
    fn test_align_keeps_most_recent() {
        let aligned = align_to_common_window(vec![vec![1.0, 2.0, 3.0], vec![9.0, 8.0]]);
        assert_eq!(aligned, vec![vec![2.0, 3.0], vec![9.0, 8.0]]);
    }

    #[test]
    fn test_rolling_volatility_window_count() {
        let r = [0.01, -0.02, 0.03, 0.0, 0.01];
        assert_eq!(rolling_volatility(&r, 3).len(), 3);
        assert!(rolling_volatility(&r, 6).is_empty());
        assert_relative_eq!(
            annualized_volatility(&r, 252),
            std_dev(&r) * 252_f64.sqrt()
        );
    }
}
