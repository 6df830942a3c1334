use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("Invalid parameter: {field} — {reason}")]
    InvalidParameter { field: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Numerical failure: {routine} — {reason}")]
    NumericalFailure { routine: String, reason: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Zero-value portfolio: {0}")]
    ZeroValuePortfolio(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Failure raised by a job computation, reported verbatim.
    #[error("{0}")]
    Computation(String),
}

impl RiskError {
    pub(crate) fn invalid_parameter(field: &str, reason: impl Into<String>) -> Self {
        RiskError::InvalidParameter {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn numerical(routine: &str, reason: impl Into<String>) -> Self {
        RiskError::NumericalFailure {
            routine: routine.to_string(),
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        RiskError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<serde_json::Error> for RiskError {
    fn from(e: serde_json::Error) -> Self {
        RiskError::SerializationError(e.to_string())
    }
}
