use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::RiskError;
use crate::types::{money_from_f64, Money, Position, PriceSeries, Rate};
use crate::RiskResult;

/// A stress scenario: replay of a historical window, or a set of shocks per
/// asset class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StressScenario {
    Historical {
        name: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    Custom {
        name: String,
        /// Asset class -> relative shock (-0.30 = -30%)
        shocks: BTreeMap<String, Rate>,
    },
}

impl StressScenario {
    pub fn name(&self) -> &str {
        match self {
            StressScenario::Historical { name, .. } | StressScenario::Custom { name, .. } => name,
        }
    }
}

/// Position as seen by the stress engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressPosition {
    pub symbol: String,
    pub market_value: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_class: Option<String>,
}

impl From<&Position> for StressPosition {
    fn from(p: &Position) -> Self {
        Self {
            symbol: p.symbol.clone(),
            market_value: p.market_value(),
            asset_class: p.asset_class.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetImpact {
    pub symbol: String,
    pub impact: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    /// Sum of asset impacts
    pub delta_nav: Money,
    /// Impacts in position order
    pub asset_impact: Vec<AssetImpact>,
    /// Positions that contributed nothing because data were missing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}

impl ScenarioResult {
    fn from_impacts(name: &str, asset_impact: Vec<AssetImpact>, skipped: Vec<String>) -> Self {
        let delta_nav = asset_impact.iter().map(|a| a.impact).sum();
        Self {
            name: name.to_string(),
            delta_nav,
            asset_impact,
            skipped,
        }
    }
}

/// Entry and exit closes for a replay window: the earliest close on or after
/// `start` and the latest close on or before `end`. An `end` falling on a
/// non-trading day therefore exits at the preceding close, never a later one.
fn window_prices(series: &PriceSeries, start: NaiveDate, end: NaiveDate) -> Option<(f64, f64)> {
    let start_price = series.points.iter().find(|p| p.date >= start)?.close;
    let end_price = series.points.iter().rev().find(|p| p.date <= end)?.close;
    if start_price > 0.0 && end_price > 0.0 {
        Some((start_price, end_price))
    } else {
        None
    }
}

/// Replay the price move between `start` and `end` on each position.
/// Positions without a usable price in the window are skipped.
pub fn historical_stress(
    name: &str,
    positions: &[StressPosition],
    prices: &HashMap<String, PriceSeries>,
    start: NaiveDate,
    end: NaiveDate,
) -> RiskResult<ScenarioResult> {
    if start > end {
        return Err(RiskError::invalid_parameter(
            "start",
            format!("scenario '{}' starts ({}) after it ends ({})", name, start, end),
        ));
    }

    let mut impacts = Vec::with_capacity(positions.len());
    let mut skipped = Vec::new();
    for pos in positions {
        let Some((p0, p1)) = prices
            .get(&pos.symbol)
            .and_then(|s| window_prices(s, start, end))
        else {
            warn!(symbol = %pos.symbol, scenario = name, "no price in stress window, skipping");
            skipped.push(pos.symbol.clone());
            continue;
        };
        let move_pct = money_from_f64((p1 - p0) / p0, "price move")?;
        impacts.push(AssetImpact {
            symbol: pos.symbol.clone(),
            impact: pos.market_value * move_pct,
        });
    }

    let result = ScenarioResult::from_impacts(name, impacts, skipped);
    debug!(scenario = name, delta_nav = %result.delta_nav, "historical stress");
    Ok(result)
}

/// Apply per-class shocks. A class without a shock moves by zero; a position
/// without a class is skipped.
pub fn custom_stress(
    name: &str,
    positions: &[StressPosition],
    shocks: &BTreeMap<String, Rate>,
) -> ScenarioResult {
    let mut impacts = Vec::with_capacity(positions.len());
    let mut skipped = Vec::new();
    for pos in positions {
        let Some(class) = pos.asset_class.as_deref() else {
            skipped.push(pos.symbol.clone());
            continue;
        };
        let shock = shocks.get(class).copied().unwrap_or(Decimal::ZERO);
        impacts.push(AssetImpact {
            symbol: pos.symbol.clone(),
            impact: pos.market_value * shock,
        });
    }

    let result = ScenarioResult::from_impacts(name, impacts, skipped);
    debug!(scenario = name, delta_nav = %result.delta_nav, "custom stress");
    result
}

/// Run every scenario in order against the same positions.
pub fn run_scenarios(
    positions: &[StressPosition],
    scenarios: &[StressScenario],
    prices: &HashMap<String, PriceSeries>,
) -> RiskResult<Vec<ScenarioResult>> {
    if scenarios.is_empty() {
        return Err(RiskError::invalid_parameter(
            "scenarios",
            "At least one scenario is required",
        ));
    }
    scenarios
        .iter()
        .map(|s| match s {
            StressScenario::Historical { name, start, end } => {
                historical_stress(name, positions, prices, *start, *end)
            }
            StressScenario::Custom { name, shocks } => Ok(custom_stress(name, positions, shocks)),
        })
        .collect()
}
