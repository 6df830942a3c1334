use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Var,
    Cvar,
    Correlation,
    Pca,
    Stress,
    Backtest,
    RiskContribution,
    Volatility,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Var => "var",
            JobType::Cvar => "cvar",
            JobType::Correlation => "correlation",
            JobType::Pca => "pca",
            JobType::Stress => "stress",
            JobType::Backtest => "backtest",
            JobType::RiskContribution => "risk_contribution",
            JobType::Volatility => "volatility",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a submitted computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub job_type: JobType,
    pub status: JobStatus,
    /// 0..=100
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(job_type: JobType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            job_type,
            status: JobStatus::Queued,
            progress: 0,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fields written to the store on a status transition.
    pub fn update(&self) -> JobUpdate {
        JobUpdate {
            status: self.status,
            progress: self.progress,
            result: self.result.clone(),
            error: self.error.clone(),
            updated_at: self.updated_at,
        }
    }

    pub(crate) fn apply(&mut self, update: &JobUpdate) {
        self.status = update.status;
        self.progress = update.progress;
        self.result = update.result.clone();
        self.error = update.error.clone();
        self.updated_at = update.updated_at;
    }
}

/// Mutable fields of a job, as persisted on each transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobUpdate {
    pub status: JobStatus,
    pub progress: u8,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl JobUpdate {
    pub fn running() -> Self {
        Self {
            status: JobStatus::Running,
            progress: 0,
            result: None,
            error: None,
            updated_at: Utc::now(),
        }
    }

    pub fn succeeded(result: serde_json::Value) -> Self {
        Self {
            status: JobStatus::Succeeded,
            progress: 100,
            result: Some(result),
            error: None,
            updated_at: Utc::now(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            progress: 0,
            result: None,
            error: Some(error.into()),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_job_is_queued() {
        let job = Job::new(JobType::Var);
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert!(job.result.is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_job_serialization_uses_snake_case() {
        let mut job = Job::new(JobType::RiskContribution);
        job.apply(&JobUpdate::failed("boom"));
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["job_type"], "risk_contribution");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"], "boom");
        assert!(value.get("result").is_none());
    }
}
