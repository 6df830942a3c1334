use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clamp::PlausibilityClamp;
use crate::error::RiskError;
use crate::stats::{normal_pdf, normal_quantile};
use crate::types::{validate_confidence, validate_horizon, RiskMethod};
use crate::var::{self, scaled_moments, MonteCarloParams, VarResult};
use crate::RiskResult;

/// Expected shortfall alongside the VaR it was derived from, both in return
/// units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvarResult {
    pub cvar: f64,
    pub var: f64,
    pub method: RiskMethod,
    pub confidence: f64,
    pub horizon_days: u32,
    /// Observations averaged in the tail; 0 for the closed form
    pub tail_observations: usize,
    /// Set once the consistency rules replaced the raw estimate
    #[serde(default)]
    pub consistency_adjusted: bool,
}

impl CvarResult {
    /// Apply the return-unit CVaR/VaR consistency rules.
    pub fn with_consistency(mut self, clamp: &PlausibilityClamp) -> Self {
        let adjusted = clamp.enforce_consistency(self.var, self.cvar);
        if adjusted != self.cvar {
            debug!(raw = self.cvar, adjusted, "CVaR consistency rule applied");
            self.cvar = adjusted;
            self.consistency_adjusted = true;
        }
        self
    }
}

/// Number of tail observations for a sample of `len` at tail probability
/// `alpha`: `max(1, round(len * alpha))`, never more than `len`.
pub fn tail_size(len: usize, alpha: f64) -> usize {
    ((len as f64 * alpha).round() as usize).max(1).min(len)
}

/// Average loss over the worst observations of a VaR result's ascending
/// distribution. An empty tail falls back to VaR x `empty_tail_multiplier`.
fn tail_shortfall(var: &VarResult, clamp: &PlausibilityClamp) -> CvarResult {
    let alpha = 1.0 - var.confidence;
    let count = tail_size(var.distribution.len(), alpha);
    let cvar = if count == 0 {
        var.var * clamp.empty_tail_multiplier
    } else {
        let tail = &var.distribution[..count];
        -(tail.iter().sum::<f64>() / count as f64)
    };

    CvarResult {
        cvar,
        var: var.var,
        method: var.method,
        confidence: var.confidence,
        horizon_days: var.horizon_days,
        tail_observations: count,
        consistency_adjusted: false,
    }
}

/// Historical expected shortfall on the horizon-scaled return series.
///
/// The raw estimate is returned; run [`CvarResult::with_consistency`] to get
/// the reported figure.
pub fn historical_cvar(
    returns: &[f64],
    confidence: f64,
    horizon_days: u32,
    clamp: &PlausibilityClamp,
) -> RiskResult<CvarResult> {
    let var = var::historical_var(returns, confidence, horizon_days)?;
    Ok(tail_shortfall(&var, clamp))
}

/// Expected shortfall of the simulated Monte Carlo distribution.
pub fn monte_carlo_cvar(
    asset_returns: &[Vec<f64>],
    weights: &[f64],
    confidence: f64,
    horizon_days: u32,
    params: MonteCarloParams,
    clamp: &PlausibilityClamp,
) -> RiskResult<CvarResult> {
    let var = var::monte_carlo_var(asset_returns, weights, confidence, horizon_days, params)?;
    Ok(tail_shortfall(&var, clamp))
}

/// Normal expected shortfall: -mu_h + sigma_h * phi(z_alpha) / alpha,
/// with VaR from the same moments for comparison.
pub fn parametric_cvar(returns: &[f64], confidence: f64, horizon_days: u32) -> RiskResult<CvarResult> {
    if returns.is_empty() {
        return Err(RiskError::InsufficientData("no returns data".into()));
    }
    validate_confidence(confidence)?;
    validate_horizon(horizon_days)?;

    let alpha = 1.0 - confidence;
    let (mu_h, sigma_h) = scaled_moments(returns, horizon_days);
    let z_alpha = normal_quantile(alpha)?;
    let phi = normal_pdf(z_alpha)?;

    let cvar = (-mu_h + sigma_h * phi / alpha).max(0.0);
    let var = (-(mu_h + z_alpha * sigma_h)).max(0.0);
    debug!(mu_h, sigma_h, z_alpha, var, cvar, "parametric CVaR");

    Ok(CvarResult {
        cvar,
        var,
        method: RiskMethod::ParametricNormal,
        confidence,
        horizon_days,
        tail_observations: 0,
        consistency_adjusted: false,
    })
}
