pub mod backtest;
pub mod clamp;
pub mod config;
pub mod contribution;
pub mod correlation;
pub mod cvar;
pub mod error;
pub mod logging;
pub mod pca;
pub mod returns;
pub mod stats;
pub mod stress;
pub mod types;
pub mod var;

#[cfg(feature = "jobs")]
pub mod jobs;

#[cfg(feature = "jobs")]
pub mod sources;

#[cfg(feature = "jobs")]
pub mod service;

pub use error::RiskError;
pub use types::*;

/// Standard result type for all risk computations
pub type RiskResult<T> = Result<T, RiskError>;
