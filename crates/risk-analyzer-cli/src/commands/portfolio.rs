use clap::Args;
use serde_json::Value;

use risk_analyzer_core::config::RiskConfig;
use risk_analyzer_core::service::{
    BacktestRequest, ContributionRequest, RiskService, VolatilityRequest,
};

use super::{parse_method, CommandResult};

/// Arguments for the VaR backtest
#[derive(Args)]
pub struct BacktestArgs {
    /// Portfolio id in the snapshot
    #[arg(long)]
    pub portfolio: String,

    /// Confidence level of the rolling VaR
    #[arg(long, default_value = "0.95")]
    pub confidence: f64,

    /// Look-back window in days (config default when omitted)
    #[arg(long)]
    pub window: Option<u32>,

    /// Rolling VaR method: historical, parametric
    #[arg(long, default_value = "historical")]
    pub method: String,

    /// Use simple instead of log returns
    #[arg(long)]
    pub simple_returns: bool,
}

/// Arguments for per-asset risk contribution
#[derive(Args)]
pub struct ContributionArgs {
    /// Portfolio id in the snapshot
    #[arg(long)]
    pub portfolio: String,

    #[arg(long, default_value = "0.95")]
    pub confidence: f64,

    /// Look-back window in days (config default when omitted)
    #[arg(long)]
    pub window: Option<u32>,
}

/// Arguments for portfolio volatility
#[derive(Args)]
pub struct VolatilityArgs {
    /// Portfolio id in the snapshot
    #[arg(long)]
    pub portfolio: String,

    /// Look-back window in days (config default when omitted)
    #[arg(long)]
    pub window: Option<u32>,
}

pub fn backtest_request(args: &BacktestArgs, config: &RiskConfig) -> CommandResult<BacktestRequest> {
    Ok(BacktestRequest {
        portfolio_id: args.portfolio.clone(),
        confidence: args.confidence,
        window_days: args.window.unwrap_or(config.default_window_days),
        method: parse_method(&args.method)?,
        use_log_returns: !args.simple_returns,
    })
}

pub fn contribution_request(args: &ContributionArgs, config: &RiskConfig) -> ContributionRequest {
    ContributionRequest {
        portfolio_id: args.portfolio.clone(),
        confidence: args.confidence,
        window_days: args.window.unwrap_or(config.default_window_days),
    }
}

pub fn volatility_request(args: &VolatilityArgs, config: &RiskConfig) -> VolatilityRequest {
    VolatilityRequest {
        portfolio_id: args.portfolio.clone(),
        window_days: args.window.unwrap_or(config.default_window_days),
    }
}

pub async fn run_backtest(service: &RiskService, args: &BacktestArgs) -> CommandResult<Value> {
    let req = backtest_request(args, service.config())?;
    let result = service.compute_backtest(&req).await?;
    Ok(serde_json::to_value(result)?)
}

pub async fn run_contribution(service: &RiskService, args: &ContributionArgs) -> CommandResult<Value> {
    let req = contribution_request(args, service.config());
    let result = service.compute_risk_contribution(&req).await?;
    Ok(serde_json::to_value(result)?)
}

pub async fn run_volatility(service: &RiskService, args: &VolatilityArgs) -> CommandResult<Value> {
    let req = volatility_request(args, service.config());
    let result = service.compute_volatility(&req).await?;
    Ok(serde_json::to_value(result)?)
}
