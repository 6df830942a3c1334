//! VaR backtesting: exceedance counting with the Kupiec proportion-of-failures
//! and Christoffersen independence likelihood-ratio tests.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RiskError;
use crate::stats::{chi_square_p_value, PValueMethod};
use crate::types::{validate_confidence, RiskMethod};
use crate::var::{historical_var, parametric_var};
use crate::RiskResult;

/// Shortest rolling window a VaR estimate may be fitted on.
pub const MIN_BACKTEST_LOOKBACK: usize = 5;

/// Consecutive-period violation transitions; `n01` counts a calm period
/// followed by a violation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCounts {
    pub n00: u32,
    pub n01: u32,
    pub n10: u32,
    pub n11: u32,
}

impl TransitionCounts {
    fn from_violations(violations: &[bool]) -> Self {
        let mut counts = TransitionCounts::default();
        for w in violations.windows(2) {
            match (w[0], w[1]) {
                (false, false) => counts.n00 += 1,
                (false, true) => counts.n01 += 1,
                (true, false) => counts.n10 += 1,
                (true, true) => counts.n11 += 1,
            }
        }
        counts
    }

    fn all_nonzero(&self) -> bool {
        self.n00 > 0 && self.n01 > 0 && self.n10 > 0 && self.n11 > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub periods: usize,
    pub exceedances: usize,
    /// periods x (1 - confidence)
    pub expected_exceedances: f64,
    pub kupiec_lr: f64,
    pub kupiec_p_value: f64,
    pub christoffersen_lr: f64,
    pub christoffersen_p_value: f64,
    pub transitions: TransitionCounts,
    pub p_value_method: PValueMethod,
}

/// Kupiec LR_uc. Zero at the boundaries x = 0 and x = n.
pub fn kupiec_lr(exceedances: usize, periods: usize, p: f64) -> f64 {
    let (x, n) = (exceedances as f64, periods as f64);
    if exceedances == 0 || exceedances >= periods {
        return 0.0;
    }
    let p_hat = x / n;
    -2.0 * (x * p.ln() + (n - x) * (1.0 - p).ln() - x * p_hat.ln() - (n - x) * (1.0 - p_hat).ln())
}

/// Christoffersen LR_ind. Zero unless every transition count is nonzero.
///
/// The restricted likelihood weights `ln(1 - p2)` by every transition into a
/// non-violation, `n00 + n10`. [`PValueMethod::LegacyApprox`] keeps the
/// older `n00 + n01` weighting so its statistics stay comparable with
/// earlier reports; the two agree whenever `n01 == n10`.
pub fn christoffersen_lr(t: &TransitionCounts, method: PValueMethod) -> f64 {
    if !t.all_nonzero() {
        return 0.0;
    }
    let (n00, n01, n10, n11) = (t.n00 as f64, t.n01 as f64, t.n10 as f64, t.n11 as f64);
    let p01 = n01 / (n00 + n01);
    let p11 = n11 / (n10 + n11);
    let p2 = (n01 + n11) / (n00 + n01 + n10 + n11);
    let no_violation_weight = match method {
        PValueMethod::LegacyApprox => n00 + n01,
        PValueMethod::Exact => n00 + n10,
    };

    -2.0 * (no_violation_weight * (1.0 - p2).ln() + (n01 + n11) * p2.ln()
        - n00 * (1.0 - p01).ln()
        - n01 * p01.ln()
        - n10 * (1.0 - p11).ln()
        - n11 * p11.ln())
}

/// Compare realised returns against the VaR estimates made for the same
/// periods. A violation is a loss (-return) strictly greater than the VaR.
pub fn backtest_var(
    returns: &[f64],
    var_estimates: &[f64],
    confidence: f64,
    p_value_method: PValueMethod,
) -> RiskResult<BacktestResult> {
    validate_confidence(confidence)?;
    if returns.len() != var_estimates.len() {
        return Err(RiskError::invalid_parameter(
            "var_estimates",
            format!(
                "{} estimates for {} returns",
                var_estimates.len(),
                returns.len()
            ),
        ));
    }
    if returns.is_empty() {
        return Err(RiskError::InsufficientData(
            "no periods to backtest".into(),
        ));
    }

    let violations: Vec<bool> = returns
        .iter()
        .zip(var_estimates)
        .map(|(r, v)| -r > *v)
        .collect();
    let exceedances = violations.iter().filter(|v| **v).count();
    let periods = returns.len();
    let p = 1.0 - confidence;

    let kupiec = kupiec_lr(exceedances, periods, p);
    let transitions = TransitionCounts::from_violations(&violations);
    let christoffersen = christoffersen_lr(&transitions, p_value_method);
    debug!(periods, exceedances, kupiec, christoffersen, "VaR backtest");

    Ok(BacktestResult {
        periods,
        exceedances,
        expected_exceedances: periods as f64 * p,
        kupiec_lr: kupiec,
        kupiec_p_value: chi_square_p_value(kupiec, p_value_method),
        christoffersen_lr: christoffersen,
        christoffersen_p_value: chi_square_p_value(christoffersen, p_value_method),
        transitions,
        p_value_method,
    })
}

/// One-day VaR for every period t >= `lookback`, each fitted on the
/// preceding `lookback` returns. Monte Carlo falls back to the normal
/// closed form since a single series carries no cross-asset structure.
pub fn rolling_var_estimates(
    returns: &[f64],
    lookback: usize,
    confidence: f64,
    method: RiskMethod,
) -> RiskResult<Vec<f64>> {
    if lookback < MIN_BACKTEST_LOOKBACK {
        return Err(RiskError::InsufficientData(format!(
            "backtest lookback must be at least {}, got {}",
            MIN_BACKTEST_LOOKBACK, lookback
        )));
    }
    if returns.len() <= lookback {
        return Err(RiskError::InsufficientData(format!(
            "{} returns leave nothing to test after a {}-period lookback",
            returns.len(),
            lookback
        )));
    }

    (lookback..returns.len())
        .map(|t| {
            let window = &returns[t - lookback..t];
            let estimate = match method {
                RiskMethod::Historical => historical_var(window, confidence, 1)?,
                RiskMethod::ParametricNormal | RiskMethod::MonteCarlo => {
                    parametric_var(window, confidence, 1)?
                }
            };
            Ok(estimate.var)
        })
        .collect()
}
