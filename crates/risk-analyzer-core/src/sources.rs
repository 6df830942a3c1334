//! Market-data collaborators: where price histories and portfolio snapshots
//! come from.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::RiskError;
use crate::types::{PositionSet, PriceSeries};
use crate::RiskResult;

/// Historical close prices by symbol.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// The most recent `days` observations for `symbol`, ascending by date.
    async fn historical_prices(&self, symbol: &str, days: u32) -> RiskResult<PriceSeries>;

    fn name(&self) -> &str;
}

/// Portfolio snapshots by id.
#[async_trait]
pub trait PortfolioSource: Send + Sync {
    async fn portfolio_with_positions(&self, portfolio_id: &str) -> RiskResult<PositionSet>;
}

/// Tries each source in order and returns the first non-empty history.
pub struct FallbackPriceSource {
    sources: Vec<Arc<dyn PriceSource>>,
}

impl FallbackPriceSource {
    pub fn new(sources: Vec<Arc<dyn PriceSource>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl PriceSource for FallbackPriceSource {
    async fn historical_prices(&self, symbol: &str, days: u32) -> RiskResult<PriceSeries> {
        for source in &self.sources {
            match source.historical_prices(symbol, days).await {
                Ok(series) if !series.is_empty() => {
                    debug!(symbol, source = source.name(), points = series.len(), "prices resolved");
                    return Ok(series);
                }
                Ok(_) => {
                    debug!(symbol, source = source.name(), "empty price history, trying next source");
                }
                Err(e) => {
                    warn!(symbol, source = source.name(), error = %e, "price source failed, trying next source");
                }
            }
        }
        Err(RiskError::UpstreamUnavailable(format!(
            "no price source returned data for {} ({} tried)",
            symbol,
            self.sources.len()
        )))
    }

    fn name(&self) -> &str {
        "fallback"
    }
}

/// Price histories held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPriceSource {
    series: HashMap<String, PriceSeries>,
}

impl InMemoryPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a history; points are sorted by date and validated.
    pub fn insert(&mut self, mut series: PriceSeries) -> RiskResult<()> {
        series.points.sort_by_key(|p| p.date);
        series.validate()?;
        self.series.insert(series.symbol.clone(), series);
        Ok(())
    }

    pub fn with_series(mut self, series: PriceSeries) -> RiskResult<Self> {
        self.insert(series)?;
        Ok(self)
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.series.keys().cloned().collect();
        symbols.sort();
        symbols
    }
}

#[async_trait]
impl PriceSource for InMemoryPriceSource {
    async fn historical_prices(&self, symbol: &str, days: u32) -> RiskResult<PriceSeries> {
        let series = self
            .series
            .get(symbol)
            .ok_or_else(|| RiskError::not_found("symbol", symbol))?;
        let skip = series.points.len().saturating_sub(days as usize);
        Ok(PriceSeries {
            symbol: series.symbol.clone(),
            points: series.points[skip..].to_vec(),
            source: series.source,
        })
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}

/// Portfolios held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPortfolioSource {
    portfolios: HashMap<String, PositionSet>,
}

impl InMemoryPortfolioSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, portfolio: PositionSet) {
        self.portfolios
            .insert(portfolio.portfolio_id.clone(), portfolio);
    }

    pub fn with_portfolio(mut self, portfolio: PositionSet) -> Self {
        self.insert(portfolio);
        self
    }
}

#[async_trait]
impl PortfolioSource for InMemoryPortfolioSource {
    async fn portfolio_with_positions(&self, portfolio_id: &str) -> RiskResult<PositionSet> {
        self.portfolios
            .get(portfolio_id)
            .cloned()
            .ok_or_else(|| RiskError::not_found("portfolio", portfolio_id))
    }
}
