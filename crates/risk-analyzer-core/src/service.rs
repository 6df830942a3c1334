//! Portfolio-level risk operations.
//!
//! `RiskService` resolves portfolios and price histories through the
//! collaborator traits, runs the engines and applies the plausibility
//! policy. `RiskJobs` runs the same operations through the job executor.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backtest::{backtest_var, rolling_var_estimates, BacktestResult, MIN_BACKTEST_LOOKBACK};
use crate::clamp::PlausibilityClamp;
use crate::config::RiskConfig;
use crate::contribution::{compute_risk_contribution, RiskContributionOutput};
use crate::correlation::{compute_correlation, validate_matrix_window, CorrelationOutput};
use crate::cvar::{historical_cvar, monte_carlo_cvar, parametric_cvar};
use crate::error::RiskError;
use crate::jobs::{Job, JobExecutor, JobStore, JobType, ProgressReporter, ProgressStream};
use crate::pca::{compute_pca, PcaOutput};
use crate::returns::{
    align_to_common_window, annualized_volatility, compute_returns, portfolio_returns,
    rolling_volatility, ReturnKind,
};
use crate::sources::{PortfolioSource, PriceSource};
use crate::stats::descriptive::max_abs;
use crate::stats::std_dev;
use crate::stress::{run_scenarios, ScenarioResult, StressPosition, StressScenario};
use crate::types::{
    validate_confidence, with_metadata, ComputationOutput, Money, PositionSet, PriceSeries,
    RiskMethod, RiskRequest,
};
use crate::var::{historical_var, monte_carlo_var, parametric_var, MonteCarloParams};
use crate::RiskResult;

/// Below this many return observations results carry a warning.
const THIN_SAMPLE_WARNING: usize = 30;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarRequest {
    pub portfolio_id: String,
    pub params: RiskRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRequest {
    pub symbols: Vec<String>,
    pub window_days: u32,
    #[serde(default = "default_true")]
    pub use_log_returns: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcaRequest {
    pub symbols: Vec<String>,
    pub components: usize,
    pub window_days: u32,
    #[serde(default = "default_true")]
    pub use_log_returns: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressRequest {
    pub portfolio_id: String,
    pub scenarios: Vec<StressScenario>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRequest {
    pub portfolio_id: String,
    pub confidence: f64,
    pub window_days: u32,
    pub method: RiskMethod,
    #[serde(default = "default_true")]
    pub use_log_returns: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionRequest {
    pub portfolio_id: String,
    pub confidence: f64,
    pub window_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityRequest {
    pub portfolio_id: String,
    pub window_days: u32,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarOutput {
    pub portfolio_id: String,
    pub method: RiskMethod,
    pub confidence: f64,
    pub horizon_days: u32,
    /// VaR as a fraction of portfolio value, before the plausibility policy
    pub var_return: f64,
    pub var_amount: Money,
    pub total_value: Money,
    pub observations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvarOutput {
    pub portfolio_id: String,
    pub method: RiskMethod,
    pub confidence: f64,
    pub horizon_days: u32,
    pub var_return: f64,
    pub cvar_return: f64,
    pub var_amount: Money,
    pub cvar_amount: Money,
    pub total_value: Money,
    pub tail_observations: usize,
    pub observations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressOutput {
    pub portfolio_id: String,
    pub total_value: Money,
    pub scenarios: Vec<ScenarioResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestOutput {
    pub portfolio_id: String,
    pub method: RiskMethod,
    pub confidence: f64,
    /// Rolling window each VaR estimate was fitted on
    pub lookback: usize,
    #[serde(flatten)]
    pub result: BacktestResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityOutput {
    pub portfolio_id: String,
    pub daily_volatility: f64,
    pub annualized_volatility: f64,
    pub trading_days_per_year: u32,
    pub rolling_window: usize,
    pub rolling_volatility: Vec<f64>,
    pub observations: usize,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Returns of a portfolio over a common window.
struct PortfolioReturns {
    symbols: Vec<String>,
    asset_returns: Vec<Vec<f64>>,
    weights: Vec<f64>,
    returns: Vec<f64>,
    total_value: Money,
}

fn report(progress: Option<&ProgressReporter>, value: u8) {
    if let Some(p) = progress {
        p.report(value);
    }
}

pub struct RiskService {
    prices: Arc<dyn PriceSource>,
    portfolios: Arc<dyn PortfolioSource>,
    config: RiskConfig,
    clamp: PlausibilityClamp,
}

impl RiskService {
    pub fn new(
        prices: Arc<dyn PriceSource>,
        portfolios: Arc<dyn PortfolioSource>,
        config: RiskConfig,
    ) -> Self {
        Self {
            prices,
            portfolios,
            config,
            clamp: PlausibilityClamp::default(),
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Fetch `window_days + 1` prices for one symbol and turn them into
    /// returns.
    async fn symbol_returns(&self, symbol: &str, window_days: u32, kind: ReturnKind) -> RiskResult<Vec<f64>> {
        let series = self
            .prices
            .historical_prices(symbol, window_days.saturating_add(1))
            .await?;
        series.validate()?;
        let returns = compute_returns(&series.points, kind);
        if returns.is_empty() {
            return Err(RiskError::InsufficientData(format!(
                "{}: {} price points, at least 2 required",
                symbol,
                series.len()
            )));
        }
        Ok(returns)
    }

    /// Returns for each symbol, truncated to their common window. Progress
    /// moves from `from` to `to` as symbols are fetched.
    async fn aligned_returns(
        &self,
        symbols: &[String],
        window_days: u32,
        kind: ReturnKind,
        progress: Option<&ProgressReporter>,
        (from, to): (u8, u8),
    ) -> RiskResult<Vec<Vec<f64>>> {
        let mut series = Vec::with_capacity(symbols.len());
        for (i, symbol) in symbols.iter().enumerate() {
            series.push(self.symbol_returns(symbol, window_days, kind).await?);
            let step = (to - from) as usize * (i + 1) / symbols.len();
            report(progress, from + step as u8);
        }
        let aligned = align_to_common_window(series);
        let periods = aligned.first().map(Vec::len).unwrap_or(0);
        if periods < 2 {
            return Err(RiskError::InsufficientData(format!(
                "common window holds {} returns, at least 2 required",
                periods
            )));
        }
        Ok(aligned)
    }

    async fn portfolio_returns(
        &self,
        portfolio_id: &str,
        window_days: u32,
        kind: ReturnKind,
        progress: Option<&ProgressReporter>,
    ) -> RiskResult<PortfolioReturns> {
        let positions = self.portfolios.portfolio_with_positions(portfolio_id).await?;
        report(progress, 10);

        let weights = positions.weights()?;
        let total_value = positions.total_value();
        let symbols = positions.symbols();

        let asset_returns = self
            .aligned_returns(&symbols, window_days, kind, progress, (10, 60))
            .await?;
        let returns = portfolio_returns(&asset_returns, &weights)?;
        debug!(portfolio_id, assets = symbols.len(), periods = returns.len(), "portfolio returns");

        Ok(PortfolioReturns {
            symbols,
            asset_returns,
            weights,
            returns,
            total_value,
        })
    }

    fn check_simulations(&self, params: &RiskRequest) -> RiskResult<()> {
        if params.method == RiskMethod::MonteCarlo && params.simulations > self.config.max_simulations {
            return Err(RiskError::invalid_parameter(
                "simulations",
                format!(
                    "{} exceeds the maximum of {}",
                    params.simulations, self.config.max_simulations
                ),
            ));
        }
        Ok(())
    }

    fn thin_sample_warning(observations: usize, warnings: &mut Vec<String>) {
        if observations < THIN_SAMPLE_WARNING {
            warnings.push(format!(
                "Only {} return observations; tail estimates are unstable",
                observations
            ));
        }
    }

    // --- VaR ---

    pub async fn compute_var(&self, req: &VarRequest) -> RiskResult<ComputationOutput<VarOutput>> {
        self.var_with_progress(req, None).await
    }

    async fn var_with_progress(
        &self,
        req: &VarRequest,
        progress: Option<&ProgressReporter>,
    ) -> RiskResult<ComputationOutput<VarOutput>> {
        let start = Instant::now();
        let params = &req.params;
        params.validate()?;
        self.check_simulations(params)?;
        let mut warnings = Vec::new();

        let data = self
            .portfolio_returns(
                &req.portfolio_id,
                params.window_days,
                ReturnKind::from_flag(params.use_log_returns),
                progress,
            )
            .await?;

        let estimate = match params.method {
            RiskMethod::Historical => {
                historical_var(&data.returns, params.confidence, params.horizon_days)?
            }
            RiskMethod::ParametricNormal => {
                parametric_var(&data.returns, params.confidence, params.horizon_days)?
            }
            RiskMethod::MonteCarlo => monte_carlo_var(
                &data.asset_returns,
                &data.weights,
                params.confidence,
                params.horizon_days,
                MonteCarloParams {
                    simulations: params.simulations,
                    seed: params.seed,
                },
            )?,
        };
        report(progress, 90);

        let clamped = self
            .clamp
            .clamp_var(estimate.var, data.total_value, max_abs(&data.returns))?;
        warnings.extend(clamped.adjustment);
        Self::thin_sample_warning(data.returns.len(), &mut warnings);

        let output = VarOutput {
            portfolio_id: req.portfolio_id.clone(),
            method: params.method,
            confidence: params.confidence,
            horizon_days: params.horizon_days,
            var_return: estimate.var,
            var_amount: clamped.amount,
            total_value: data.total_value,
            observations: data.returns.len(),
        };

        let elapsed = start.elapsed().as_micros() as u64;
        Ok(with_metadata(
            var_methodology(params.method),
            req,
            warnings,
            elapsed,
            output,
        ))
    }

    // --- CVaR ---

    pub async fn compute_cvar(&self, req: &VarRequest) -> RiskResult<ComputationOutput<CvarOutput>> {
        self.cvar_with_progress(req, None).await
    }

    async fn cvar_with_progress(
        &self,
        req: &VarRequest,
        progress: Option<&ProgressReporter>,
    ) -> RiskResult<ComputationOutput<CvarOutput>> {
        let start = Instant::now();
        let params = &req.params;
        params.validate()?;
        self.check_simulations(params)?;
        let mut warnings = Vec::new();

        let data = self
            .portfolio_returns(
                &req.portfolio_id,
                params.window_days,
                ReturnKind::from_flag(params.use_log_returns),
                progress,
            )
            .await?;

        let raw = match params.method {
            RiskMethod::Historical => {
                historical_cvar(&data.returns, params.confidence, params.horizon_days, &self.clamp)?
            }
            RiskMethod::ParametricNormal => {
                parametric_cvar(&data.returns, params.confidence, params.horizon_days)?
            }
            RiskMethod::MonteCarlo => monte_carlo_cvar(
                &data.asset_returns,
                &data.weights,
                params.confidence,
                params.horizon_days,
                MonteCarloParams {
                    simulations: params.simulations,
                    seed: params.seed,
                },
                &self.clamp,
            )?,
        };
        let estimate = raw.with_consistency(&self.clamp);
        if estimate.consistency_adjusted {
            warnings.push(format!(
                "CVaR raised to VaR x {} to stay above VaR",
                self.clamp.consistency_multiplier
            ));
        }
        report(progress, 90);

        let var = self
            .clamp
            .clamp_var(estimate.var, data.total_value, max_abs(&data.returns))?;
        let cvar = self
            .clamp
            .clamp_cvar(estimate.cvar, var.amount, data.total_value)?;
        warnings.extend(var.adjustment);
        warnings.extend(cvar.adjustment);
        Self::thin_sample_warning(data.returns.len(), &mut warnings);

        let output = CvarOutput {
            portfolio_id: req.portfolio_id.clone(),
            method: params.method,
            confidence: params.confidence,
            horizon_days: params.horizon_days,
            var_return: estimate.var,
            cvar_return: estimate.cvar,
            var_amount: var.amount,
            cvar_amount: cvar.amount,
            total_value: data.total_value,
            tail_observations: estimate.tail_observations,
            observations: data.returns.len(),
        };

        let elapsed = start.elapsed().as_micros() as u64;
        Ok(with_metadata(
            cvar_methodology(params.method),
            req,
            warnings,
            elapsed,
            output,
        ))
    }

    // --- Correlation / PCA ---

    pub async fn compute_correlation(
        &self,
        req: &CorrelationRequest,
    ) -> RiskResult<ComputationOutput<CorrelationOutput>> {
        self.correlation_with_progress(req, None).await
    }

    async fn correlation_with_progress(
        &self,
        req: &CorrelationRequest,
        progress: Option<&ProgressReporter>,
    ) -> RiskResult<ComputationOutput<CorrelationOutput>> {
        let start = Instant::now();
        validate_matrix_window(req.window_days)?;
        require_symbols(&req.symbols)?;

        let aligned = self
            .aligned_returns(
                &req.symbols,
                req.window_days,
                ReturnKind::from_flag(req.use_log_returns),
                progress,
                (10, 60),
            )
            .await?;
        let output = compute_correlation(&req.symbols, &aligned)?;
        report(progress, 90);

        let mut warnings = Vec::new();
        Self::thin_sample_warning(aligned[0].len(), &mut warnings);

        let elapsed = start.elapsed().as_micros() as u64;
        Ok(with_metadata(
            "Pearson correlation of asset returns over a common window",
            req,
            warnings,
            elapsed,
            output,
        ))
    }

    pub async fn compute_pca(&self, req: &PcaRequest) -> RiskResult<ComputationOutput<PcaOutput>> {
        self.pca_with_progress(req, None).await
    }

    async fn pca_with_progress(
        &self,
        req: &PcaRequest,
        progress: Option<&ProgressReporter>,
    ) -> RiskResult<ComputationOutput<PcaOutput>> {
        let start = Instant::now();
        validate_matrix_window(req.window_days)?;
        require_symbols(&req.symbols)?;
        if req.components < 1 {
            return Err(RiskError::invalid_parameter(
                "components",
                "Must be at least 1",
            ));
        }

        let aligned = self
            .aligned_returns(
                &req.symbols,
                req.window_days,
                ReturnKind::from_flag(req.use_log_returns),
                progress,
                (10, 60),
            )
            .await?;
        let output = compute_pca(&req.symbols, &aligned, req.components)?;
        report(progress, 90);

        let mut warnings = Vec::new();
        if req.components > req.symbols.len() {
            warnings.push(format!(
                "Requested {} components but only {} assets; returning {}",
                req.components,
                req.symbols.len(),
                output.num_components
            ));
        }

        let elapsed = start.elapsed().as_micros() as u64;
        Ok(with_metadata(
            "PCA via symmetric eigen-decomposition of the return covariance matrix",
            req,
            warnings,
            elapsed,
            output,
        ))
    }

    // --- Stress ---

    pub async fn compute_stress(&self, req: &StressRequest) -> RiskResult<ComputationOutput<StressOutput>> {
        self.stress_with_progress(req, None).await
    }

    async fn stress_with_progress(
        &self,
        req: &StressRequest,
        progress: Option<&ProgressReporter>,
    ) -> RiskResult<ComputationOutput<StressOutput>> {
        let start = Instant::now();
        let positions = self
            .portfolios
            .portfolio_with_positions(&req.portfolio_id)
            .await?;
        report(progress, 10);

        let stress_positions: Vec<StressPosition> =
            positions.positions.iter().map(StressPosition::from).collect();

        let earliest = req
            .scenarios
            .iter()
            .filter_map(|s| match s {
                StressScenario::Historical { start, .. } => Some(*start),
                StressScenario::Custom { .. } => None,
            })
            .min();
        let prices = match earliest {
            Some(from) => self.stress_prices(&positions, from, progress).await,
            None => HashMap::new(),
        };

        let scenarios = run_scenarios(&stress_positions, &req.scenarios, &prices)?;
        report(progress, 90);

        let mut warnings = Vec::new();
        for s in &scenarios {
            if !s.skipped.is_empty() {
                warnings.push(format!(
                    "Scenario '{}' skipped {}: no usable data",
                    s.name,
                    s.skipped.join(", ")
                ));
            }
        }

        let output = StressOutput {
            portfolio_id: req.portfolio_id.clone(),
            total_value: positions.total_value(),
            scenarios,
        };

        let elapsed = start.elapsed().as_micros() as u64;
        Ok(with_metadata(
            "Historical window replay and asset-class shock scenarios",
            req,
            warnings,
            elapsed,
            output,
        ))
    }

    /// Price histories reaching back to `from`. A symbol that cannot be
    /// fetched is left out, so historical scenarios skip it.
    async fn stress_prices(
        &self,
        positions: &PositionSet,
        from: NaiveDate,
        progress: Option<&ProgressReporter>,
    ) -> HashMap<String, PriceSeries> {
        let days = (Utc::now().date_naive() - from).num_days().max(0) + 1;
        let days = u32::try_from(days).unwrap_or(u32::MAX);
        let symbols = positions.symbols();
        let mut prices = HashMap::with_capacity(symbols.len());
        for (i, symbol) in symbols.iter().enumerate() {
            match self.prices.historical_prices(symbol, days).await {
                Ok(series) => {
                    prices.insert(symbol.clone(), series);
                }
                Err(e) => warn!(symbol = %symbol, error = %e, "no prices for stress scenario"),
            }
            report(progress, 10 + (50 * (i + 1) / symbols.len()) as u8);
        }
        prices
    }

    // --- Backtest ---

    pub async fn compute_backtest(
        &self,
        req: &BacktestRequest,
    ) -> RiskResult<ComputationOutput<BacktestOutput>> {
        self.backtest_with_progress(req, None).await
    }

    async fn backtest_with_progress(
        &self,
        req: &BacktestRequest,
        progress: Option<&ProgressReporter>,
    ) -> RiskResult<ComputationOutput<BacktestOutput>> {
        let start = Instant::now();
        validate_confidence(req.confidence)?;

        let data = self
            .portfolio_returns(
                &req.portfolio_id,
                req.window_days,
                ReturnKind::from_flag(req.use_log_returns),
                progress,
            )
            .await?;

        let lookback = self.config.backtest_lookback.min(data.returns.len() / 2);
        if lookback < MIN_BACKTEST_LOOKBACK {
            return Err(RiskError::InsufficientData(format!(
                "{} returns allow a lookback of {}, at least {} required",
                data.returns.len(),
                lookback,
                MIN_BACKTEST_LOOKBACK
            )));
        }
        let estimates = rolling_var_estimates(&data.returns, lookback, req.confidence, req.method)?;
        let result = backtest_var(
            &data.returns[lookback..],
            &estimates,
            req.confidence,
            self.config.p_value_method,
        )?;
        report(progress, 90);

        let mut warnings = Vec::new();
        if req.method == RiskMethod::MonteCarlo {
            warnings.push(
                "Rolling Monte Carlo estimates use the parametric normal closed form".to_string(),
            );
        }
        if self.config.p_value_method == crate::stats::PValueMethod::LegacyApprox {
            warnings.push(
                "p-values use the legacy exp(-x/2) approximation and the Christoffersen statistic uses the legacy n00+n01 weighting"
                    .to_string(),
            );
        }

        let output = BacktestOutput {
            portfolio_id: req.portfolio_id.clone(),
            method: req.method,
            confidence: req.confidence,
            lookback,
            result,
        };

        let elapsed = start.elapsed().as_micros() as u64;
        Ok(with_metadata(
            "Rolling one-day VaR backtest with Kupiec POF and Christoffersen independence tests",
            req,
            warnings,
            elapsed,
            output,
        ))
    }

    // --- Risk contribution ---

    pub async fn compute_risk_contribution(
        &self,
        req: &ContributionRequest,
    ) -> RiskResult<ComputationOutput<RiskContributionOutput>> {
        self.contribution_with_progress(req, None).await
    }

    async fn contribution_with_progress(
        &self,
        req: &ContributionRequest,
        progress: Option<&ProgressReporter>,
    ) -> RiskResult<ComputationOutput<RiskContributionOutput>> {
        let start = Instant::now();
        validate_confidence(req.confidence)?;

        let data = self
            .portfolio_returns(&req.portfolio_id, req.window_days, ReturnKind::Log, progress)
            .await?;
        let output = compute_risk_contribution(
            &data.symbols,
            &data.asset_returns,
            &data.weights,
            req.confidence,
            data.total_value,
        )?;
        report(progress, 90);

        let mut warnings = Vec::new();
        Self::thin_sample_warning(data.returns.len(), &mut warnings);

        let elapsed = start.elapsed().as_micros() as u64;
        Ok(with_metadata(
            "Euler decomposition of parametric VaR on cost-basis weights",
            req,
            warnings,
            elapsed,
            output,
        ))
    }

    // --- Volatility ---

    pub async fn compute_volatility(
        &self,
        req: &VolatilityRequest,
    ) -> RiskResult<ComputationOutput<VolatilityOutput>> {
        self.volatility_with_progress(req, None).await
    }

    async fn volatility_with_progress(
        &self,
        req: &VolatilityRequest,
        progress: Option<&ProgressReporter>,
    ) -> RiskResult<ComputationOutput<VolatilityOutput>> {
        let start = Instant::now();
        let data = self
            .portfolio_returns(&req.portfolio_id, req.window_days, ReturnKind::Log, progress)
            .await?;

        let window = self.config.rolling_volatility_window;
        let rolling = rolling_volatility(&data.returns, window);
        report(progress, 90);

        let mut warnings = Vec::new();
        if rolling.is_empty() {
            warnings.push(format!(
                "{} returns are fewer than the {}-day rolling window",
                data.returns.len(),
                window
            ));
        }

        let output = VolatilityOutput {
            portfolio_id: req.portfolio_id.clone(),
            daily_volatility: std_dev(&data.returns),
            annualized_volatility: annualized_volatility(
                &data.returns,
                self.config.trading_days_per_year,
            ),
            trading_days_per_year: self.config.trading_days_per_year,
            rolling_window: window,
            rolling_volatility: rolling,
            observations: data.returns.len(),
        };

        let elapsed = start.elapsed().as_micros() as u64;
        Ok(with_metadata(
            "Sample standard deviation of cost-basis portfolio returns, sqrt-time annualised",
            req,
            warnings,
            elapsed,
            output,
        ))
    }
}

fn require_symbols(symbols: &[String]) -> RiskResult<()> {
    if symbols.is_empty() {
        return Err(RiskError::invalid_parameter(
            "symbols",
            "At least one symbol is required",
        ));
    }
    Ok(())
}

fn var_methodology(method: RiskMethod) -> &'static str {
    match method {
        RiskMethod::Historical => "Historical simulation VaR with square-root-of-time scaling",
        RiskMethod::ParametricNormal => "Variance-covariance VaR under normality",
        RiskMethod::MonteCarlo => "Monte Carlo VaR with Cholesky-correlated normal draws",
    }
}

fn cvar_methodology(method: RiskMethod) -> &'static str {
    match method {
        RiskMethod::Historical => "Historical expected shortfall over the empirical tail",
        RiskMethod::ParametricNormal => "Closed-form normal expected shortfall",
        RiskMethod::MonteCarlo => "Expected shortfall of simulated Monte Carlo returns",
    }
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// Any risk operation, as submitted to the job executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RiskJobRequest {
    Var(VarRequest),
    Cvar(VarRequest),
    Correlation(CorrelationRequest),
    Pca(PcaRequest),
    Stress(StressRequest),
    Backtest(BacktestRequest),
    RiskContribution(ContributionRequest),
    Volatility(VolatilityRequest),
}

impl RiskJobRequest {
    pub fn job_type(&self) -> JobType {
        match self {
            RiskJobRequest::Var(_) => JobType::Var,
            RiskJobRequest::Cvar(_) => JobType::Cvar,
            RiskJobRequest::Correlation(_) => JobType::Correlation,
            RiskJobRequest::Pca(_) => JobType::Pca,
            RiskJobRequest::Stress(_) => JobType::Stress,
            RiskJobRequest::Backtest(_) => JobType::Backtest,
            RiskJobRequest::RiskContribution(_) => JobType::RiskContribution,
            RiskJobRequest::Volatility(_) => JobType::Volatility,
        }
    }
}

/// Runs risk operations as tracked jobs.
#[derive(Clone)]
pub struct RiskJobs {
    service: Arc<RiskService>,
    executor: JobExecutor,
}

impl RiskJobs {
    pub fn new(service: Arc<RiskService>, store: Arc<dyn JobStore>) -> Self {
        let executor = JobExecutor::new(store, service.config().progress_buffer);
        Self { service, executor }
    }

    pub async fn submit(&self, request: RiskJobRequest) -> RiskResult<Job> {
        let service = Arc::clone(&self.service);
        self.executor
            .submit(request.job_type(), move |progress| async move {
                service.run(&request, Some(&progress)).await
            })
            .await
    }

    pub async fn get_job(&self, id: Uuid) -> RiskResult<Job> {
        self.executor.get_job(id).await
    }

    pub async fn get_progress(&self, id: Uuid) -> RiskResult<ProgressStream> {
        self.executor.get_progress(id).await
    }

    pub async fn wait(&self, id: Uuid) -> RiskResult<Job> {
        self.executor.wait(id).await
    }
}

impl RiskService {
    /// Run a request and serialise its output envelope.
    pub async fn run(
        &self,
        request: &RiskJobRequest,
        progress: Option<&ProgressReporter>,
    ) -> RiskResult<serde_json::Value> {
        let value = match request {
            RiskJobRequest::Var(r) => serde_json::to_value(self.var_with_progress(r, progress).await?)?,
            RiskJobRequest::Cvar(r) => serde_json::to_value(self.cvar_with_progress(r, progress).await?)?,
            RiskJobRequest::Correlation(r) => {
                serde_json::to_value(self.correlation_with_progress(r, progress).await?)?
            }
            RiskJobRequest::Pca(r) => serde_json::to_value(self.pca_with_progress(r, progress).await?)?,
            RiskJobRequest::Stress(r) => {
                serde_json::to_value(self.stress_with_progress(r, progress).await?)?
            }
            RiskJobRequest::Backtest(r) => {
                serde_json::to_value(self.backtest_with_progress(r, progress).await?)?
            }
            RiskJobRequest::RiskContribution(r) => {
                serde_json::to_value(self.contribution_with_progress(r, progress).await?)?
            }
            RiskJobRequest::Volatility(r) => {
                serde_json::to_value(self.volatility_with_progress(r, progress).await?)?
            }
        };
        Ok(value)
    }
}
