//! Runtime settings.
//!
//! Defaults match the production deployment; `from_env` overlays
//! `RISK_*` environment variables. Values that fail to parse keep the
//! default.

use serde::{Deserialize, Serialize};

use crate::backtest::MIN_BACKTEST_LOOKBACK;
use crate::error::RiskError;
use crate::logging::LogConfig;
use crate::stats::PValueMethod;
use crate::RiskResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Look-back used when a request does not name one
    pub default_window_days: u32,
    pub default_simulations: u32,
    /// Monte Carlo requests above this are rejected
    pub max_simulations: u32,
    /// Capacity of each job's progress stream
    pub progress_buffer: usize,
    /// Rolling window for backtest VaR estimates
    pub backtest_lookback: usize,
    pub rolling_volatility_window: usize,
    pub trading_days_per_year: u32,
    pub p_value_method: PValueMethod,
    pub log: LogConfig,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            default_window_days: 250,
            default_simulations: 10_000,
            max_simulations: 100_000,
            progress_buffer: 100,
            backtest_lookback: 60,
            rolling_volatility_window: 20,
            trading_days_per_year: 252,
            p_value_method: PValueMethod::LegacyApprox,
            log: LogConfig::default(),
        }
    }
}

fn env_override<T: std::str::FromStr>(key: &str, target: &mut T) {
    if let Ok(val) = std::env::var(key) {
        if let Ok(parsed) = val.parse() {
            *target = parsed;
        }
    }
}

impl RiskConfig {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `RISK_*` environment variables on top of `self`.
    pub fn with_env_overrides(mut self) -> Self {
        env_override("RISK_WINDOW_DAYS", &mut self.default_window_days);
        env_override("RISK_SIMULATIONS", &mut self.default_simulations);
        env_override("RISK_MAX_SIMULATIONS", &mut self.max_simulations);
        env_override("RISK_PROGRESS_BUFFER", &mut self.progress_buffer);
        env_override("RISK_BACKTEST_LOOKBACK", &mut self.backtest_lookback);
        env_override("RISK_ROLLING_WINDOW", &mut self.rolling_volatility_window);
        env_override("RISK_TRADING_DAYS", &mut self.trading_days_per_year);
        env_override("RISK_P_VALUE_METHOD", &mut self.p_value_method);
        if let Ok(val) = std::env::var("RISK_LOG_LEVEL") {
            self.log.level = val;
        }
        env_override("RISK_LOG_FORMAT", &mut self.log.format);
        self
    }

    pub fn validate(&self) -> RiskResult<()> {
        if self.default_simulations == 0 || self.max_simulations == 0 {
            return Err(RiskError::ConfigError(
                "simulation counts must be > 0".to_string(),
            ));
        }
        if self.default_simulations > self.max_simulations {
            return Err(RiskError::ConfigError(format!(
                "default_simulations ({}) exceeds max_simulations ({})",
                self.default_simulations, self.max_simulations
            )));
        }
        if self.progress_buffer == 0 {
            return Err(RiskError::ConfigError(
                "progress_buffer must be > 0".to_string(),
            ));
        }
        if self.backtest_lookback < MIN_BACKTEST_LOOKBACK {
            return Err(RiskError::ConfigError(format!(
                "backtest_lookback must be at least {}",
                MIN_BACKTEST_LOOKBACK
            )));
        }
        if self.rolling_volatility_window < 2 {
            return Err(RiskError::ConfigError(
                "rolling_volatility_window must be at least 2".to_string(),
            ));
        }
        if self.trading_days_per_year == 0 {
            return Err(RiskError::ConfigError(
                "trading_days_per_year must be > 0".to_string(),
            ));
        }
        if self.default_window_days < 2 {
            return Err(RiskError::ConfigError(
                "default_window_days must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RiskConfig::default();
        assert_eq!(config.default_window_days, 250);
        assert_eq!(config.default_simulations, 10_000);
        assert_eq!(config.p_value_method, PValueMethod::LegacyApprox);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = RiskConfig::default();
        config.default_simulations = 200_000;
        assert!(matches!(config.validate(), Err(RiskError::ConfigError(_))));

        let mut config = RiskConfig::default();
        config.progress_buffer = 0;
        assert!(config.validate().is_err());

        let mut config = RiskConfig::default();
        config.backtest_lookback = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let config: RiskConfig =
            serde_json::from_str(r#"{"max_simulations": 50000, "p_value_method": "exact"}"#).unwrap();
        assert_eq!(config.max_simulations, 50_000);
        assert_eq!(config.p_value_method, PValueMethod::Exact);
        assert_eq!(config.backtest_lookback, 60);
    }

    #[test]
    fn test_env_override_ignores_garbage() {
        let mut value = 7_u32;
        std::env::set_var("RISK_TEST_UNPARSEABLE", "seven");
        env_override("RISK_TEST_UNPARSEABLE", &mut value);
        assert_eq!(value, 7);
        std::env::set_var("RISK_TEST_PARSEABLE", "9");
        env_override("RISK_TEST_PARSEABLE", &mut value);
        assert_eq!(value, 9);
    }
}
