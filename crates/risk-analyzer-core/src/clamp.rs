//! Plausibility overrides applied after the statistical engines.
//!
//! The engines return closed-form or empirical estimates; everything in this
//! module is business policy layered on top of them. Thresholds are exact
//! decimals and must not be tuned.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::RiskError;
use crate::types::{money_from_f64, Money, Rate};
use crate::RiskResult;

/// A currency amount after the policy has run, with a note when an override
/// replaced the estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClampedAmount {
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<String>,
}

impl ClampedAmount {
    fn untouched(amount: Money) -> Self {
        Self {
            amount,
            adjustment: None,
        }
    }
}

/// Named policy holding every magic threshold used to keep VaR and CVaR
/// within plausible bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlausibilityClamp {
    /// VaR above this share of portfolio value is considered implausible
    pub var_cap: Rate,
    /// Replacement VaR, as a share of value, when inputs otherwise look sane
    pub var_fallback: Rate,
    /// Largest |return| still treated as a well-formed return
    pub max_sane_return: f64,
    /// CVaR above this share of value is replaced and finally capped
    pub cvar_cap: Rate,
    /// CVaR := VaR x this when the CVaR estimate breaches the cap
    pub cvar_over_cap_multiplier: Decimal,
    /// CVaR floor relative to VaR in currency
    pub cvar_floor_multiplier: Decimal,
    /// CVaR := VaR x this when return-unit CVaR is below or within
    /// `consistency_tolerance` of VaR
    pub consistency_multiplier: f64,
    pub consistency_tolerance: f64,
    /// CVaR := VaR x this when the tail is empty
    pub empty_tail_multiplier: f64,
}

impl Default for PlausibilityClamp {
    fn default() -> Self {
        Self {
            var_cap: dec!(0.10),
            var_fallback: dec!(0.03),
            max_sane_return: 1.0,
            cvar_cap: dec!(0.15),
            cvar_over_cap_multiplier: dec!(1.15),
            cvar_floor_multiplier: dec!(1.10),
            consistency_multiplier: 1.20,
            consistency_tolerance: 0.01,
            empty_tail_multiplier: 1.15,
        }
    }
}

impl PlausibilityClamp {
    /// Return-unit consistency between CVaR and VaR. Rules run in order and
    /// each overrides the previous one:
    ///
    /// 1. CVaR below VaR becomes VaR x 1.20
    /// 2. CVaR within 1% of VaR becomes VaR x 1.20
    pub fn enforce_consistency(&self, var: f64, cvar: f64) -> f64 {
        let mut cvar = cvar;
        if cvar < var {
            cvar = var * self.consistency_multiplier;
        }
        if (cvar - var).abs() < var * self.consistency_tolerance {
            cvar = var * self.consistency_multiplier;
        }
        cvar
    }

    /// Scale a return-unit VaR to currency and apply the 10% rule.
    ///
    /// Above the cap the VaR is replaced by 3% of value, unless the largest
    /// observed |return| is at least 1.0, which marks the inputs as malformed
    /// and fails with `InvalidInput`. The result is never negative.
    pub fn clamp_var(
        &self,
        var_return: f64,
        total_value: Money,
        max_abs_return: f64,
    ) -> RiskResult<ClampedAmount> {
        let amount = money_from_f64(var_return, "VaR")? * total_value;
        let cap = total_value * self.var_cap;

        let mut out = ClampedAmount::untouched(amount);
        if amount > cap {
            if max_abs_return >= self.max_sane_return {
                return Err(RiskError::InvalidInput(format!(
                    "returns look malformed (max |return| {:.4}, VaR {})",
                    max_abs_return,
                    amount.round_dp(2)
                )));
            }
            let fallback = total_value * self.var_fallback;
            warn!(
                estimate = %amount.round_dp(2),
                fallback = %fallback,
                "VaR above {} of portfolio value, using fallback",
                self.var_cap
            );
            out = ClampedAmount {
                amount: fallback,
                adjustment: Some(format!(
                    "VaR estimate {} exceeded {}% of portfolio value; replaced by {}% of value",
                    amount.round_dp(2),
                    (self.var_cap * dec!(100)).normalize(),
                    (self.var_fallback * dec!(100)).normalize()
                )),
            };
        }
        out.amount = out.amount.abs();
        Ok(out)
    }

    /// Currency rules for CVaR against an already clamped VaR amount:
    ///
    /// 1. above 15% of value, CVaR := VaR x 1.15
    /// 2. absolute value
    /// 3. below VaR, CVaR := VaR x 1.10
    /// 4. final cap at 15% of value
    pub fn clamp_cvar(
        &self,
        cvar_return: f64,
        var_amount: Money,
        total_value: Money,
    ) -> RiskResult<ClampedAmount> {
        let mut amount = money_from_f64(cvar_return, "CVaR")? * total_value;
        let cap = total_value * self.cvar_cap;
        let mut notes = Vec::new();

        if amount > cap {
            notes.push(format!(
                "CVaR estimate {} exceeded {}% of portfolio value; set to VaR x {}",
                amount.round_dp(2),
                (self.cvar_cap * dec!(100)).normalize(),
                self.cvar_over_cap_multiplier
            ));
            amount = var_amount * self.cvar_over_cap_multiplier;
        }
        amount = amount.abs();
        if amount < var_amount {
            notes.push(format!(
                "CVaR below VaR; floored at VaR x {}",
                self.cvar_floor_multiplier
            ));
            amount = var_amount * self.cvar_floor_multiplier;
        }
        if amount > cap {
            notes.push(format!(
                "CVaR capped at {}% of portfolio value",
                (self.cvar_cap * dec!(100)).normalize()
            ));
            amount = cap;
        }

        if !notes.is_empty() {
            warn!(cvar = %amount, adjustments = notes.len(), "CVaR adjusted by plausibility policy");
        }
        Ok(ClampedAmount {
            amount,
            adjustment: if notes.is_empty() {
                None
            } else {
                Some(notes.join("; "))
            },
        })
    }
}
