mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use risk_analyzer_core::config::RiskConfig;

use commands::jobs::JobArgs;
use commands::matrix::{CorrelationArgs, PcaArgs};
use commands::portfolio::{BacktestArgs, ContributionArgs, VolatilityArgs};
use commands::risk::VarArgs;
use commands::stress::StressArgs;

/// Portfolio market-risk analytics
#[derive(Parser)]
#[command(
    name = "risk",
    version,
    about = "Portfolio market-risk analytics",
    long_about = "A CLI for portfolio market-risk analytics over a market-data snapshot. \
                  Supports VaR and CVaR (historical, parametric, Monte Carlo), correlation, \
                  PCA, stress scenarios, VaR backtesting, risk contribution and volatility, \
                  run directly or as tracked jobs."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// YAML config file; RISK_* environment variables override it
    #[arg(long, global = true)]
    config: Option<String>,

    /// Market-data snapshot (portfolios and price histories); stdin when omitted
    #[arg(long, global = true)]
    data: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Value at Risk of a portfolio
    Var(VarArgs),
    /// Conditional VaR (expected shortfall) of a portfolio
    Cvar(VarArgs),
    /// Correlation matrix of asset returns
    Correlation(CorrelationArgs),
    /// Principal component analysis of asset returns
    Pca(PcaArgs),
    /// Historical and custom shock scenarios
    Stress(StressArgs),
    /// Kupiec and Christoffersen backtest of rolling VaR
    Backtest(BacktestArgs),
    /// Per-asset contribution to parametric VaR
    Contribution(ContributionArgs),
    /// Annualised and rolling portfolio volatility
    Volatility(VolatilityArgs),
    /// Run a request through the job executor and print the final job
    Job(JobArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn load_config(path: Option<&str>) -> Result<RiskConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => input::file::read_yaml::<RiskConfig>(path)?,
        None => RiskConfig::default(),
    }
    .with_env_overrides();
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("risk {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    match run(&cli).await {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

async fn run(cli: &Cli) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let config = load_config(cli.config.as_deref())?;
    config.log.init()?;
    let service = input::snapshot::load_service(cli.data.as_deref(), config)?;

    match &cli.command {
        Commands::Var(args) => commands::risk::run_var(&service, args).await,
        Commands::Cvar(args) => commands::risk::run_cvar(&service, args).await,
        Commands::Correlation(args) => commands::matrix::run_correlation(&service, args).await,
        Commands::Pca(args) => commands::matrix::run_pca(&service, args).await,
        Commands::Stress(args) => commands::stress::run_stress(&service, args).await,
        Commands::Backtest(args) => commands::portfolio::run_backtest(&service, args).await,
        Commands::Contribution(args) => {
            commands::portfolio::run_contribution(&service, args).await
        }
        Commands::Volatility(args) => commands::portfolio::run_volatility(&service, args).await,
        Commands::Job(args) => commands::jobs::run_job(service, args).await,
        Commands::Version => Ok(serde_json::Value::Null),
    }
}
