pub mod jobs;
pub mod matrix;
pub mod portfolio;
pub mod risk;
pub mod stress;

use risk_analyzer_core::RiskMethod;

pub(crate) type CommandResult<T> = Result<T, Box<dyn std::error::Error>>;

pub(crate) fn parse_method(method: &str) -> CommandResult<RiskMethod> {
    Ok(method.parse::<RiskMethod>()?)
}
