use clap::{Args, Subcommand};
use colored::Colorize;
use serde_json::Value;
use std::sync::Arc;

use risk_analyzer_core::jobs::InMemoryJobStore;
use risk_analyzer_core::service::{RiskJobRequest, RiskJobs, RiskService};
use risk_analyzer_core::RiskError;

use super::matrix::{self, CorrelationArgs, PcaArgs};
use super::portfolio::{self, BacktestArgs, ContributionArgs, VolatilityArgs};
use super::risk::{self, VarArgs};
use super::stress::{self, StressArgs};
use super::CommandResult;
use crate::input;

/// Arguments for running a request as a job
#[derive(Args)]
pub struct JobArgs {
    #[command(subcommand)]
    pub request: JobCommand,

    /// Do not stream progress to stderr
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum JobCommand {
    Var(VarArgs),
    Cvar(VarArgs),
    Correlation(CorrelationArgs),
    Pca(PcaArgs),
    Stress(StressArgs),
    Backtest(BacktestArgs),
    Contribution(ContributionArgs),
    Volatility(VolatilityArgs),
    /// Submit a JSON request file ({"type": "var", ...})
    Submit {
        #[arg(long)]
        request: String,
    },
}

fn job_request(command: &JobCommand, service: &RiskService) -> CommandResult<RiskJobRequest> {
    let config = service.config();
    let request = match command {
        JobCommand::Var(args) => RiskJobRequest::Var(risk::var_request(args, config)?),
        JobCommand::Cvar(args) => RiskJobRequest::Cvar(risk::var_request(args, config)?),
        JobCommand::Correlation(args) => {
            RiskJobRequest::Correlation(matrix::correlation_request(args, config))
        }
        JobCommand::Pca(args) => RiskJobRequest::Pca(matrix::pca_request(args, config)),
        JobCommand::Stress(args) => RiskJobRequest::Stress(stress::stress_request(args)?),
        JobCommand::Backtest(args) => {
            RiskJobRequest::Backtest(portfolio::backtest_request(args, config)?)
        }
        JobCommand::Contribution(args) => {
            RiskJobRequest::RiskContribution(portfolio::contribution_request(args, config))
        }
        JobCommand::Volatility(args) => {
            RiskJobRequest::Volatility(portfolio::volatility_request(args, config))
        }
        JobCommand::Submit { request } => input::file::read_json(request)?,
    };
    Ok(request)
}

/// Submit, follow progress on stderr until the stream closes, then return
/// the final job snapshot.
pub async fn run_job(service: RiskService, args: &JobArgs) -> CommandResult<Value> {
    let request = job_request(&args.request, &service)?;
    let jobs = RiskJobs::new(Arc::new(service), Arc::new(InMemoryJobStore::new()));

    let job = jobs.submit(request).await?;
    if !args.quiet {
        eprintln!("{} {} ({})", "submitted".cyan().bold(), job.id, job.job_type);
    }

    match jobs.get_progress(job.id).await {
        Ok(mut stream) => {
            while let Some(progress) = stream.next().await {
                if !args.quiet {
                    eprintln!("{} {:>3}%", "progress".cyan(), progress);
                }
            }
        }
        // already finished
        Err(RiskError::NotFound { .. }) => {}
        Err(e) => return Err(e.into()),
    }

    let done = jobs.get_job(job.id).await?;
    if !args.quiet {
        let status = done.status.to_string();
        let status = if done.error.is_some() {
            status.red().bold()
        } else {
            status.green().bold()
        };
        eprintln!("{} {}", "finished".cyan().bold(), status);
    }
    Ok(serde_json::to_value(done)?)
}
