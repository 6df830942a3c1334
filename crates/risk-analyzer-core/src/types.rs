use chrono::NaiveDate;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RiskError;
use crate::RiskResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates and shocks expressed as decimals (-0.30 = -30%). Never as percentages.
pub type Rate = Decimal;

/// A single close observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Where a price history came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSourceKind {
    #[default]
    Cached,
    Live,
}

/// Ordered close prices for one symbol, strictly increasing by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub points: Vec<PricePoint>,
    #[serde(default)]
    pub source: PriceSourceKind,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Self {
        Self {
            symbol: symbol.into(),
            points,
            source: PriceSourceKind::Cached,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// Check ordering and that every close is a positive finite number.
    pub fn validate(&self) -> RiskResult<()> {
        for (i, p) in self.points.iter().enumerate() {
            if !p.close.is_finite() || p.close <= 0.0 {
                return Err(RiskError::InvalidInput(format!(
                    "{}: close at {} must be positive, got {}",
                    self.symbol, p.date, p.close
                )));
            }
            if i > 0 && self.points[i - 1].date >= p.date {
                return Err(RiskError::InvalidInput(format!(
                    "{}: prices must be strictly increasing by date ({} then {})",
                    self.symbol,
                    self.points[i - 1].date,
                    p.date
                )));
            }
        }
        Ok(())
    }
}

/// A holding in a portfolio snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: Decimal,
    pub avg_price: Money,
    /// Equity, Bond, FX, Commodities, Crypto, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_class: Option<String>,
}

impl Position {
    /// Cost-basis value (quantity x average purchase price).
    pub fn market_value(&self) -> Money {
        self.quantity * self.avg_price
    }
}

/// Positions of one portfolio at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSet {
    pub portfolio_id: String,
    #[serde(default)]
    pub name: String,
    pub positions: Vec<Position>,
}

impl PositionSet {
    pub fn symbols(&self) -> Vec<String> {
        self.positions.iter().map(|p| p.symbol.clone()).collect()
    }

    pub fn total_value(&self) -> Money {
        self.positions.iter().map(Position::market_value).sum()
    }

    /// Cost-basis weights, summing to one.
    ///
    /// Weights are deliberately not marked to market: risk contributions are
    /// read against what was paid for each holding.
    pub fn weights(&self) -> RiskResult<Vec<f64>> {
        if self.positions.is_empty() {
            return Err(RiskError::InsufficientData(format!(
                "portfolio {} has no positions",
                self.portfolio_id
            )));
        }
        let total = self.total_value();
        if total.is_zero() {
            return Err(RiskError::ZeroValuePortfolio(format!(
                "portfolio {} has zero total value",
                self.portfolio_id
            )));
        }
        self.positions
            .iter()
            .map(|p| money_to_f64(p.market_value() / total))
            .collect()
    }
}

/// Estimation method for VaR and CVaR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskMethod {
    Historical,
    #[serde(alias = "parametric")]
    ParametricNormal,
    MonteCarlo,
}

impl RiskMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskMethod::Historical => "historical",
            RiskMethod::ParametricNormal => "parametric_normal",
            RiskMethod::MonteCarlo => "monte_carlo",
        }
    }
}

impl std::fmt::Display for RiskMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RiskMethod {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "historical" => Ok(RiskMethod::Historical),
            "parametric" | "parametric_normal" => Ok(RiskMethod::ParametricNormal),
            "monte_carlo" | "montecarlo" | "mc" => Ok(RiskMethod::MonteCarlo),
            other => Err(RiskError::invalid_parameter(
                "method",
                format!(
                    "unknown method '{}'. Use: historical, parametric_normal, monte_carlo",
                    other
                ),
            )),
        }
    }
}

/// Parameters of a VaR/CVaR estimate. Immutable once validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRequest {
    pub method: RiskMethod,
    pub confidence: f64,
    pub horizon_days: u32,
    pub window_days: u32,
    pub simulations: u32,
    #[serde(default = "default_use_log_returns")]
    pub use_log_returns: bool,
    /// Seed for the Monte Carlo generator; entropy when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_use_log_returns() -> bool {
    true
}

impl RiskRequest {
    pub fn validate(&self) -> RiskResult<()> {
        validate_confidence(self.confidence)?;
        validate_horizon(self.horizon_days)?;
        if self.window_days < 2 {
            return Err(RiskError::invalid_parameter(
                "window_days",
                "At least 2 days are required to form a return",
            ));
        }
        if self.method == RiskMethod::MonteCarlo && self.simulations == 0 {
            return Err(RiskError::invalid_parameter(
                "simulations",
                "Monte Carlo requires at least one simulation",
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_confidence(confidence: f64) -> RiskResult<()> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(RiskError::invalid_parameter(
            "confidence",
            format!("Must be between 0 and 1 exclusive, got {}", confidence),
        ));
    }
    Ok(())
}

pub(crate) fn validate_horizon(horizon_days: u32) -> RiskResult<()> {
    if horizon_days < 1 {
        return Err(RiskError::invalid_parameter(
            "horizon_days",
            "Must be at least 1",
        ));
    }
    Ok(())
}

/// Convert an engine result into money, rejecting NaN and infinities.
pub fn money_from_f64(value: f64, what: &str) -> RiskResult<Money> {
    Decimal::from_f64(value)
        .ok_or_else(|| RiskError::InvalidInput(format!("{} is not a finite number: {}", what, value)))
}

pub fn money_to_f64(value: Money) -> RiskResult<f64> {
    value
        .to_f64()
        .ok_or_else(|| RiskError::InvalidInput(format!("{} does not fit in f64", value)))
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_f64".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(symbol: &str, quantity: Decimal, avg_price: Decimal) -> Position {
        Position {
            symbol: symbol.into(),
            quantity,
            avg_price,
            asset_class: None,
        }
    }

    #[test]
    fn test_weights_use_cost_basis() {
        let set = PositionSet {
            portfolio_id: "p1".into(),
            name: String::new(),
            positions: vec![
                position("AAA", dec!(10), dec!(30)),
                position("BBB", dec!(35), dec!(20)),
            ],
        };
        assert_eq!(set.total_value(), dec!(1000));
        let w = set.weights().unwrap();
        assert!((w[0] - 0.3).abs() < 1e-12);
        assert!((w[1] - 0.7).abs() < 1e-12);
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_value_portfolio_is_an_error() {
        let set = PositionSet {
            portfolio_id: "p0".into(),
            name: String::new(),
            positions: vec![position("AAA", dec!(0), dec!(30))],
        };
        assert!(matches!(
            set.weights(),
            Err(RiskError::ZeroValuePortfolio(_))
        ));
    }

    #[test]
    fn test_empty_portfolio_is_insufficient_data() {
        let set = PositionSet {
            portfolio_id: "p0".into(),
            name: String::new(),
            positions: vec![],
        };
        assert!(matches!(set.weights(), Err(RiskError::InsufficientData(_))));
    }

    #[test]
    fn test_price_series_rejects_unordered_dates() {
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let d0 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let series = PriceSeries::new(
            "AAA",
            vec![
                PricePoint { date: d1, close: 10.0 },
                PricePoint { date: d0, close: 11.0 },
            ],
        );
        assert!(series.validate().is_err());
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!(
            "parametric".parse::<RiskMethod>().unwrap(),
            RiskMethod::ParametricNormal
        );
        assert_eq!(
            "monte_carlo".parse::<RiskMethod>().unwrap(),
            RiskMethod::MonteCarlo
        );
        assert!("student".parse::<RiskMethod>().is_err());
    }

    #[test]
    fn test_money_from_nan_fails() {
        assert!(money_from_f64(f64::NAN, "var").is_err());
        assert_eq!(money_from_f64(0.5, "var").unwrap(), dec!(0.5));
    }
}
