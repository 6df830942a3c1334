use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RiskError;
use crate::stats::correlation_matrix;
use crate::RiskResult;

/// Shortest look-back accepted for correlation and PCA requests.
pub const MIN_MATRIX_WINDOW_DAYS: u32 = 10;

/// Pairwise Pearson correlations, rows and columns in `symbols` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationOutput {
    pub symbols: Vec<String>,
    pub matrix: Vec<Vec<f64>>,
}

impl CorrelationOutput {
    /// Correlation between two symbols, if both are present.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.symbols.iter().position(|s| s == a)?;
        let j = self.symbols.iter().position(|s| s == b)?;
        Some(self.matrix[i][j])
    }
}

pub(crate) fn validate_matrix_window(window_days: u32) -> RiskResult<()> {
    if window_days < MIN_MATRIX_WINDOW_DAYS {
        return Err(RiskError::invalid_parameter(
            "window_days",
            format!(
                "Must be at least {}, got {}",
                MIN_MATRIX_WINDOW_DAYS, window_days
            ),
        ));
    }
    Ok(())
}

/// Correlation matrix of per-asset return series sharing a common window.
pub fn compute_correlation(symbols: &[String], asset_returns: &[Vec<f64>]) -> RiskResult<CorrelationOutput> {
    if symbols.len() != asset_returns.len() {
        return Err(RiskError::invalid_parameter(
            "symbols",
            format!(
                "{} symbols for {} return series",
                symbols.len(),
                asset_returns.len()
            ),
        ));
    }
    let matrix = correlation_matrix(asset_returns)?;
    debug!(assets = symbols.len(), "correlation matrix");
    Ok(CorrelationOutput {
        symbols: symbols.to_vec(),
        matrix,
    })
}
