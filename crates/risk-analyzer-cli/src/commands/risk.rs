use clap::Args;
use serde_json::Value;

use risk_analyzer_core::config::RiskConfig;
use risk_analyzer_core::service::{RiskService, VarRequest};
use risk_analyzer_core::RiskRequest;

use super::{parse_method, CommandResult};

/// Arguments for VaR and CVaR
#[derive(Args)]
pub struct VarArgs {
    /// Portfolio id in the snapshot
    #[arg(long)]
    pub portfolio: String,

    /// Estimation method: historical, parametric, monte_carlo
    #[arg(long, default_value = "historical")]
    pub method: String,

    /// Confidence level (e.g. 0.95 for 95%)
    #[arg(long, default_value = "0.95")]
    pub confidence: f64,

    /// Holding period in days
    #[arg(long, default_value = "1")]
    pub horizon: u32,

    /// Look-back window in days (config default when omitted)
    #[arg(long)]
    pub window: Option<u32>,

    /// Monte Carlo paths (config default when omitted)
    #[arg(long)]
    pub simulations: Option<u32>,

    /// Seed for reproducible Monte Carlo runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Use simple instead of log returns
    #[arg(long)]
    pub simple_returns: bool,
}

pub fn var_request(args: &VarArgs, config: &RiskConfig) -> CommandResult<VarRequest> {
    Ok(VarRequest {
        portfolio_id: args.portfolio.clone(),
        params: RiskRequest {
            method: parse_method(&args.method)?,
            confidence: args.confidence,
            horizon_days: args.horizon,
            window_days: args.window.unwrap_or(config.default_window_days),
            simulations: args.simulations.unwrap_or(config.default_simulations),
            use_log_returns: !args.simple_returns,
            seed: args.seed,
        },
    })
}

pub async fn run_var(service: &RiskService, args: &VarArgs) -> CommandResult<Value> {
    let req = var_request(args, service.config())?;
    let result = service.compute_var(&req).await?;
    Ok(serde_json::to_value(result)?)
}

pub async fn run_cvar(service: &RiskService, args: &VarArgs) -> CommandResult<Value> {
    let req = var_request(args, service.config())?;
    let result = service.compute_cvar(&req).await?;
    Ok(serde_json::to_value(result)?)
}
