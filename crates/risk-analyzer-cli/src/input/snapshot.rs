use serde::{Deserialize, Serialize};
use std::sync::Arc;

use risk_analyzer_core::config::RiskConfig;
use risk_analyzer_core::service::RiskService;
use risk_analyzer_core::sources::{InMemoryPortfolioSource, InMemoryPriceSource};
use risk_analyzer_core::{PositionSet, PriceSeries};

use crate::input;

/// Portfolios and price histories the commands run against.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MarketSnapshot {
    #[serde(default)]
    pub portfolios: Vec<PositionSet>,
    #[serde(default)]
    pub prices: Vec<PriceSeries>,
}

impl MarketSnapshot {
    pub fn into_service(self, config: RiskConfig) -> Result<RiskService, Box<dyn std::error::Error>> {
        let mut prices = InMemoryPriceSource::new();
        for series in self.prices {
            prices.insert(series)?;
        }
        let mut portfolios = InMemoryPortfolioSource::new();
        for portfolio in self.portfolios {
            portfolios.insert(portfolio);
        }
        Ok(RiskService::new(Arc::new(prices), Arc::new(portfolios), config))
    }
}

/// Load the snapshot from `--data`, falling back to piped stdin.
pub fn load_service(
    path: Option<&str>,
    config: RiskConfig,
) -> Result<RiskService, Box<dyn std::error::Error>> {
    let snapshot: MarketSnapshot = if let Some(path) = path {
        input::file::read_json(path)?
    } else if let Some(snapshot) = input::stdin::read_stdin()? {
        snapshot
    } else {
        return Err("--data <snapshot.json> or stdin required".into());
    };
    snapshot.into_service(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "portfolios": [{
            "portfolio_id": "p1",
            "positions": [{"symbol": "AAA", "quantity": "10", "avg_price": "25.5"}]
        }],
        "prices": [{
            "symbol": "AAA",
            "points": [
                {"date": "2024-01-03", "close": 26.0},
                {"date": "2024-01-02", "close": 25.0}
            ]
        }]
    }"#;

    #[test]
    fn test_snapshot_parses_and_builds_service() {
        let snapshot: MarketSnapshot = serde_json::from_str(SNAPSHOT).unwrap();
        assert_eq!(snapshot.portfolios[0].total_value().to_string(), "255.0");
        assert!(snapshot.into_service(RiskConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_prices_are_rejected() {
        let mut snapshot: MarketSnapshot = serde_json::from_str(SNAPSHOT).unwrap();
        snapshot.prices[0].points[0].close = -1.0;
        assert!(snapshot.into_service(RiskConfig::default()).is_err());
    }
}
