use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;

use risk_analyzer_core::service::{RiskService, StressRequest};
use risk_analyzer_core::stress::StressScenario;

use super::CommandResult;
use crate::input;

/// Arguments for stress testing
#[derive(Args)]
pub struct StressArgs {
    /// Portfolio id in the snapshot
    #[arg(long)]
    pub portfolio: String,

    /// JSON file with a list of scenarios
    #[arg(long)]
    pub scenarios: Option<String>,

    /// Asset-class shocks for a custom scenario (e.g. "Crypto=-0.30,Equity=-0.10")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub shock: Vec<String>,

    /// Start of a historical replay window (YYYY-MM-DD)
    #[arg(long, requires = "to")]
    pub from: Option<NaiveDate>,

    /// End of a historical replay window (YYYY-MM-DD)
    #[arg(long, requires = "from")]
    pub to: Option<NaiveDate>,

    /// Name for the scenario built from flags
    #[arg(long)]
    pub name: Option<String>,
}

fn parse_shock(raw: &str) -> CommandResult<(String, Decimal)> {
    let (class, rate) = raw
        .split_once('=')
        .ok_or_else(|| format!("Invalid shock '{}'. Use CLASS=RATE, e.g. Crypto=-0.30", raw))?;
    let rate: Decimal = rate
        .trim()
        .parse()
        .map_err(|e| format!("Invalid shock rate in '{}': {}", raw, e))?;
    Ok((class.trim().to_string(), rate))
}

pub fn stress_request(args: &StressArgs) -> CommandResult<StressRequest> {
    let mut scenarios: Vec<StressScenario> = match args.scenarios {
        Some(ref path) => input::file::read_json(path)?,
        None => Vec::new(),
    };

    if !args.shock.is_empty() {
        let shocks = args
            .shock
            .iter()
            .map(|s| parse_shock(s))
            .collect::<CommandResult<BTreeMap<_, _>>>()?;
        scenarios.push(StressScenario::Custom {
            name: args.name.clone().unwrap_or_else(|| "custom".to_string()),
            shocks,
        });
    }

    if let (Some(start), Some(end)) = (args.from, args.to) {
        scenarios.push(StressScenario::Historical {
            name: args
                .name
                .clone()
                .unwrap_or_else(|| format!("{} to {}", start, end)),
            start,
            end,
        });
    }

    if scenarios.is_empty() {
        return Err("--scenarios <file.json>, --shock or --from/--to required".into());
    }

    Ok(StressRequest {
        portfolio_id: args.portfolio.clone(),
        scenarios,
    })
}

pub async fn run_stress(service: &RiskService, args: &StressArgs) -> CommandResult<Value> {
    let req = stress_request(args)?;
    let result = service.compute_stress(&req).await?;
    Ok(serde_json::to_value(result)?)
}
