use clap::Args;
use serde_json::Value;

use risk_analyzer_core::config::RiskConfig;
use risk_analyzer_core::service::{CorrelationRequest, PcaRequest, RiskService};

use super::CommandResult;

/// Arguments for the correlation matrix
#[derive(Args)]
pub struct CorrelationArgs {
    /// Comma-separated symbols (e.g. "AAPL,MSFT,BTC")
    #[arg(long, value_delimiter = ',', required = true)]
    pub symbols: Vec<String>,

    /// Look-back window in days, at least 10 (config default when omitted)
    #[arg(long)]
    pub window: Option<u32>,

    /// Use simple instead of log returns
    #[arg(long)]
    pub simple_returns: bool,
}

/// Arguments for principal component analysis
#[derive(Args)]
pub struct PcaArgs {
    #[command(flatten)]
    pub matrix: CorrelationArgs,

    /// Number of components to keep
    #[arg(long, default_value = "3")]
    pub components: usize,
}

pub fn correlation_request(args: &CorrelationArgs, config: &RiskConfig) -> CorrelationRequest {
    CorrelationRequest {
        symbols: args.symbols.clone(),
        window_days: args.window.unwrap_or(config.default_window_days),
        use_log_returns: !args.simple_returns,
    }
}

pub fn pca_request(args: &PcaArgs, config: &RiskConfig) -> PcaRequest {
    let base = correlation_request(&args.matrix, config);
    PcaRequest {
        symbols: base.symbols,
        components: args.components,
        window_days: base.window_days,
        use_log_returns: base.use_log_returns,
    }
}

pub async fn run_correlation(service: &RiskService, args: &CorrelationArgs) -> CommandResult<Value> {
    let req = correlation_request(args, service.config());
    let result = service.compute_correlation(&req).await?;
    Ok(serde_json::to_value(result)?)
}

pub async fn run_pca(service: &RiskService, args: &PcaArgs) -> CommandResult<Value> {
    let req = pca_request(args, service.config());
    let result = service.compute_pca(&req).await?;
    Ok(serde_json::to_value(result)?)
}
