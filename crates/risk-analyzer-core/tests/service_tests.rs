#![cfg(feature = "jobs")]

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use risk_analyzer_core::config::RiskConfig;
use risk_analyzer_core::jobs::{InMemoryJobStore, JobStatus};
use risk_analyzer_core::service::{
    BacktestRequest, ContributionRequest, CorrelationRequest, PcaRequest, RiskJobRequest,
    RiskJobs, RiskService, StressRequest, VarRequest, VolatilityRequest,
};
use risk_analyzer_core::sources::{InMemoryPortfolioSource, InMemoryPriceSource};
use risk_analyzer_core::stress::StressScenario;
use risk_analyzer_core::{
    Position, PositionSet, PricePoint, PriceSeries, RiskError, RiskMethod, RiskRequest,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Fixtures
// ===========================================================================

const SYMBOLS: [&str; 3] = ["AAA", "BBB", "CCC"];

fn synthetic_series(symbol: &str, k: usize, days: usize) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let mut close = 100.0 * (k + 1) as f64;
    let points = (0..days)
        .map(|t| {
            if t > 0 {
                let tf = t as f64;
                let r = 0.012 * (0.9 * tf + k as f64).sin()
                    + 0.004 * (2.3 * tf * (k + 1) as f64).cos();
                close *= r.exp();
            }
            PricePoint {
                date: start + chrono::Days::new(t as u64),
                close,
            }
        })
        .collect();
    PriceSeries::new(symbol, points)
}

fn position(symbol: &str, quantity: Decimal, avg_price: Decimal, class: &str) -> Position {
    Position {
        symbol: symbol.into(),
        quantity,
        avg_price,
        asset_class: Some(class.into()),
    }
}

fn service() -> RiskService {
    let mut prices = InMemoryPriceSource::new();
    for (k, symbol) in SYMBOLS.iter().enumerate() {
        prices.insert(synthetic_series(symbol, k, 160)).unwrap();
    }
    prices.insert(synthetic_series("BTC", 3, 160)).unwrap();

    let portfolios = InMemoryPortfolioSource::new()
        .with_portfolio(PositionSet {
            portfolio_id: "balanced".into(),
            name: "Balanced".into(),
            positions: vec![
                position("AAA", dec!(10), dec!(100), "Equity"),
                position("BBB", dec!(20), dec!(50), "Bond"),
                position("CCC", dec!(5), dec!(200), "Commodities"),
            ],
        })
        .with_portfolio(PositionSet {
            portfolio_id: "crypto".into(),
            name: "Crypto".into(),
            positions: vec![position("BTC", dec!(1), dec!(10000), "Crypto")],
        })
        .with_portfolio(PositionSet {
            portfolio_id: "empty-value".into(),
            name: String::new(),
            positions: vec![position("AAA", dec!(0), dec!(100), "Equity")],
        });

    RiskService::new(Arc::new(prices), Arc::new(portfolios), RiskConfig::default())
}

fn var_request(method: RiskMethod) -> VarRequest {
    VarRequest {
        portfolio_id: "balanced".into(),
        params: RiskRequest {
            method,
            confidence: 0.95,
            horizon_days: 1,
            window_days: 120,
            simulations: 5_000,
            use_log_returns: true,
            seed: Some(11),
        },
    }
}

fn symbols() -> Vec<String> {
    SYMBOLS.iter().map(|s| s.to_string()).collect()
}

// ===========================================================================
// VaR / CVaR
// ===========================================================================

#[tokio::test]
async fn test_var_every_method_is_non_negative_and_plausible() {
    let svc = service();
    for method in [
        RiskMethod::Historical,
        RiskMethod::ParametricNormal,
        RiskMethod::MonteCarlo,
    ] {
        let out = svc.compute_var(&var_request(method)).await.unwrap();
        let r = &out.result;
        assert_eq!(r.total_value, dec!(3000));
        assert_eq!(r.observations, 120);
        assert!(r.var_amount >= Decimal::ZERO);
        assert!(r.var_amount <= dec!(300), "{} VaR {}", method, r.var_amount);
        assert_eq!(out.metadata.precision, "ieee754_f64");
    }
}

#[tokio::test]
async fn test_monte_carlo_var_is_reproducible_with_seed() {
    let svc = service();
    let a = svc.compute_var(&var_request(RiskMethod::MonteCarlo)).await.unwrap();
    let b = svc.compute_var(&var_request(RiskMethod::MonteCarlo)).await.unwrap();
    assert_eq!(a.result.var_amount, b.result.var_amount);
}

#[tokio::test]
async fn test_cvar_is_at_least_var() {
    let svc = service();
    for method in [
        RiskMethod::Historical,
        RiskMethod::ParametricNormal,
        RiskMethod::MonteCarlo,
    ] {
        let out = svc.compute_cvar(&var_request(method)).await.unwrap();
        assert!(out.result.cvar_amount >= out.result.var_amount);
        assert!(out.result.cvar_return >= out.result.var_return);
        assert!(out.result.cvar_amount <= dec!(450));
    }
}

#[tokio::test]
async fn test_too_many_simulations_rejected() {
    let svc = service();
    let mut req = var_request(RiskMethod::MonteCarlo);
    req.params.simulations = 1_000_000;
    assert!(matches!(
        svc.compute_var(&req).await,
        Err(RiskError::InvalidParameter { .. })
    ));
}

#[tokio::test]
async fn test_invalid_confidence_rejected() {
    let svc = service();
    let mut req = var_request(RiskMethod::Historical);
    req.params.confidence = 1.5;
    assert!(matches!(
        svc.compute_var(&req).await,
        Err(RiskError::InvalidParameter { .. })
    ));
}

#[tokio::test]
async fn test_unknown_portfolio_is_not_found() {
    let svc = service();
    let mut req = var_request(RiskMethod::Historical);
    req.portfolio_id = "missing".into();
    assert!(matches!(
        svc.compute_var(&req).await,
        Err(RiskError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_zero_value_portfolio() {
    let svc = service();
    let mut req = var_request(RiskMethod::Historical);
    req.portfolio_id = "empty-value".into();
    assert!(matches!(
        svc.compute_var(&req).await,
        Err(RiskError::ZeroValuePortfolio(_))
    ));
}

// ===========================================================================
// Correlation / PCA
// ===========================================================================

#[tokio::test]
async fn test_correlation_matrix_properties() {
    let svc = service();
    let out = svc
        .compute_correlation(&CorrelationRequest {
            symbols: symbols(),
            window_days: 60,
            use_log_returns: true,
        })
        .await
        .unwrap();
    let m = &out.result.matrix;
    for i in 0..3 {
        assert_eq!(m[i][i], 1.0);
        for j in 0..3 {
            assert_eq!(m[i][j], m[j][i]);
            assert!((-1.0..=1.0).contains(&m[i][j]));
        }
    }
}

#[tokio::test]
async fn test_correlation_window_below_ten_rejected() {
    let svc = service();
    let result = svc
        .compute_correlation(&CorrelationRequest {
            symbols: symbols(),
            window_days: 5,
            use_log_returns: true,
        })
        .await;
    assert!(matches!(result, Err(RiskError::InvalidParameter { .. })));
}

#[tokio::test]
async fn test_pca_explained_variance() {
    let svc = service();
    let out = svc
        .compute_pca(&PcaRequest {
            symbols: symbols(),
            components: 2,
            window_days: 90,
            use_log_returns: true,
        })
        .await
        .unwrap();
    let r = &out.result;
    assert_eq!(r.num_components, 2);
    assert!(r.explained_variance[0] >= r.explained_variance[1]);
    assert!(r.cumulative_variance[1] <= 1.0 + 1e-9);
}

#[tokio::test]
async fn test_pca_with_repeated_symbol_stays_non_negative() {
    let svc = service();
    let out = svc
        .compute_pca(&PcaRequest {
            symbols: vec!["AAA".into(), "AAA".into(), "BBB".into()],
            components: 3,
            window_days: 90,
            use_log_returns: true,
        })
        .await
        .unwrap();
    let r = &out.result;
    assert_eq!(r.num_components, 3);
    assert!(r.explained_variance.iter().all(|v| *v >= 0.0));
    assert!(r.cumulative_variance.windows(2).all(|w| w[1] >= w[0]));
    assert!(r.cumulative_variance[2] <= 1.0 + 1e-9);
    assert!(r.explained_variance[2] < 1e-9);
}

// ===========================================================================
// Stress
// ===========================================================================

#[tokio::test]
async fn test_custom_crypto_shock_through_service() {
    let svc = service();
    let out = svc
        .compute_stress(&StressRequest {
            portfolio_id: "crypto".into(),
            scenarios: vec![StressScenario::Custom {
                name: "crypto winter".into(),
                shocks: BTreeMap::from([("Crypto".to_string(), dec!(-0.30))]),
            }],
        })
        .await
        .unwrap();
    let scenario = &out.result.scenarios[0];
    assert_eq!(scenario.delta_nav, dec!(-3000));
    assert_eq!(scenario.asset_impact[0].symbol, "BTC");
    assert_eq!(scenario.asset_impact[0].impact, dec!(-3000));
}

#[tokio::test]
async fn test_historical_stress_replays_window() {
    let svc = service();
    let out = svc
        .compute_stress(&StressRequest {
            portfolio_id: "balanced".into(),
            scenarios: vec![StressScenario::Historical {
                name: "spring 2023".into(),
                start: NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2023, 4, 1).unwrap(),
            }],
        })
        .await
        .unwrap();
    let scenario = &out.result.scenarios[0];
    assert_eq!(scenario.asset_impact.len(), 3);
    let sum: Decimal = scenario.asset_impact.iter().map(|a| a.impact).sum();
    assert_eq!(scenario.delta_nav, sum);
}

// ===========================================================================
// Backtest, contribution, volatility
// ===========================================================================

#[tokio::test]
async fn test_backtest_uses_half_window_lookback() {
    let svc = service();
    let out = svc
        .compute_backtest(&BacktestRequest {
            portfolio_id: "balanced".into(),
            confidence: 0.95,
            window_days: 100,
            method: RiskMethod::Historical,
            use_log_returns: true,
        })
        .await
        .unwrap();
    let r = &out.result;
    assert_eq!(r.lookback, 50);
    assert_eq!(r.result.periods, 50);
    assert!(r.result.exceedances <= r.result.periods);
    assert!((0.0..=1.0).contains(&r.result.kupiec_p_value));
}

#[tokio::test]
async fn test_backtest_needs_enough_history() {
    let svc = service();
    let result = svc
        .compute_backtest(&BacktestRequest {
            portfolio_id: "balanced".into(),
            confidence: 0.95,
            window_days: 8,
            method: RiskMethod::Historical,
            use_log_returns: true,
        })
        .await;
    assert!(matches!(result, Err(RiskError::InsufficientData(_))));
}

#[tokio::test]
async fn test_risk_contribution_percentages_sum_to_one() {
    let svc = service();
    let out = svc
        .compute_risk_contribution(&ContributionRequest {
            portfolio_id: "balanced".into(),
            confidence: 0.99,
            window_days: 120,
        })
        .await
        .unwrap();
    let total: f64 = out.result.contributions.iter().map(|c| c.percentage).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_volatility_annualises_daily() {
    let svc = service();
    let out = svc
        .compute_volatility(&VolatilityRequest {
            portfolio_id: "balanced".into(),
            window_days: 120,
        })
        .await
        .unwrap();
    let r = &out.result;
    assert!((r.annualized_volatility - r.daily_volatility * 252_f64.sqrt()).abs() < 1e-12);
    assert_eq!(r.rolling_volatility.len(), 120 - 20 + 1);
}

// ===========================================================================
// Jobs
// ===========================================================================

#[tokio::test]
async fn test_var_job_succeeds_with_envelope() {
    let jobs = RiskJobs::new(Arc::new(service()), Arc::new(InMemoryJobStore::new()));
    let job = jobs
        .submit(RiskJobRequest::Var(var_request(RiskMethod::Historical)))
        .await
        .unwrap();
    let done = jobs.wait(job.id).await.unwrap();
    assert_eq!(done.status, JobStatus::Succeeded);
    let result = done.result.unwrap();
    assert!(result["result"]["var_amount"].is_string());
    assert!(result["methodology"].is_string());
}

#[tokio::test]
async fn test_job_for_missing_portfolio_fails() {
    let jobs = RiskJobs::new(Arc::new(service()), Arc::new(InMemoryJobStore::new()));
    let job = jobs
        .submit(RiskJobRequest::Volatility(VolatilityRequest {
            portfolio_id: "nope".into(),
            window_days: 30,
        }))
        .await
        .unwrap();
    let done = jobs.wait(job.id).await.unwrap();
    assert_eq!(done.status, JobStatus::Failed);
    assert_eq!(done.progress, 0);
    assert!(done.error.unwrap().contains("not found"));
}

#[test]
fn test_job_request_deserializes_by_type_tag() {
    let request: RiskJobRequest = serde_json::from_str(
        r#"{"type": "correlation", "symbols": ["AAA", "BBB"], "window_days": 30}"#,
    )
    .unwrap();
    assert_eq!(
        request,
        RiskJobRequest::Correlation(CorrelationRequest {
            symbols: vec!["AAA".into(), "BBB".into()],
            window_days: 30,
            use_log_returns: true,
        })
    );
}
