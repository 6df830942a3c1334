use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, Continuous, ContinuousCDF, Normal};

use crate::error::RiskError;
use crate::RiskResult;

/// How likelihood-ratio statistics are mapped to p-values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PValueMethod {
    /// Closed form kept for compatibility with legacy reports:
    /// 1 for x <= 0, 0 for x > 30, exp(-x/2) otherwise.
    #[default]
    LegacyApprox,
    /// Chi-square(1) survival function.
    Exact,
}

impl std::str::FromStr for PValueMethod {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "legacy" | "legacy_approx" => Ok(PValueMethod::LegacyApprox),
            "exact" => Ok(PValueMethod::Exact),
            other => Err(RiskError::ConfigError(format!(
                "unknown p-value method '{}'. Use: legacy_approx, exact",
                other
            ))),
        }
    }
}

fn standard_normal() -> RiskResult<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| RiskError::numerical("standard_normal", e.to_string()))
}

/// Inverse CDF of the standard normal distribution.
pub fn normal_quantile(p: f64) -> RiskResult<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(RiskError::invalid_parameter(
            "probability",
            format!("Must be between 0 and 1 exclusive, got {}", p),
        ));
    }
    Ok(standard_normal()?.inverse_cdf(p))
}

/// Density of the standard normal distribution.
pub fn normal_pdf(x: f64) -> RiskResult<f64> {
    Ok(standard_normal()?.pdf(x))
}

/// p-value of a chi-square(1) likelihood-ratio statistic.
pub fn chi_square_p_value(x: f64, method: PValueMethod) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    match method {
        PValueMethod::LegacyApprox => {
            if x > 30.0 {
                0.0
            } else {
                (-x / 2.0).exp()
            }
        }
        PValueMethod::Exact => match ChiSquared::new(1.0) {
            Ok(chi) => chi.sf(x),
            // df = 1 is always a valid parameter
            Err(_) => 0.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normal_quantile_known_values() {
        assert_relative_eq!(normal_quantile(0.05).unwrap(), -1.6448536269514729, epsilon = 1e-6);
        assert_relative_eq!(normal_quantile(0.5).unwrap(), 0.0, epsilon = 1e-9);
        assert!(normal_quantile(0.0).is_err());
        assert!(normal_quantile(1.0).is_err());
    }

    #[test]
    fn test_normal_pdf_peak() {
        assert_relative_eq!(normal_pdf(0.0).unwrap(), 0.3989422804014327, epsilon = 1e-12);
    }

    #[test]
    fn test_legacy_p_value_closed_form() {
        assert_eq!(chi_square_p_value(0.0, PValueMethod::LegacyApprox), 1.0);
        assert_eq!(chi_square_p_value(31.0, PValueMethod::LegacyApprox), 0.0);
        assert_relative_eq!(
            chi_square_p_value(2.0, PValueMethod::LegacyApprox),
            (-1.0_f64).exp()
        );
        assert_relative_eq!(
            chi_square_p_value(30.0, PValueMethod::LegacyApprox),
            (-15.0_f64).exp()
        );
    }

    #[test]
    fn test_exact_p_value_at_critical_value() {
        // 3.841 is the 95% critical value of chi-square(1)
        assert_relative_eq!(
            chi_square_p_value(3.841458820694124, PValueMethod::Exact),
            0.05,
            epsilon = 1e-6
        );
        assert_eq!(chi_square_p_value(-1.0, PValueMethod::Exact), 1.0);
    }
}
