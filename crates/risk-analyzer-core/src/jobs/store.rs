use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::types::{Job, JobUpdate};
use crate::error::RiskError;
use crate::RiskResult;

/// Durable record of jobs. Writes are best-effort from the executor's point
/// of view: a failed status update is logged, not retried.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn persist_job(&self, job: &Job) -> RiskResult<()>;

    async fn update_job_status(&self, id: Uuid, update: &JobUpdate) -> RiskResult<()>;
}

/// Store that keeps jobs in a map; used by tests and the CLI.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn persist_job(&self, job: &Job) -> RiskResult<()> {
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(())
    }

    async fn update_job_status(&self, id: Uuid, update: &JobUpdate) -> RiskResult<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or_else(|| RiskError::not_found("job", id))?;
        job.apply(update);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::{JobStatus, JobType};

    #[tokio::test]
    async fn test_persist_then_update() {
        let store = InMemoryJobStore::new();
        let job = Job::new(JobType::Pca);
        store.persist_job(&job).await.unwrap();
        store
            .update_job_status(job.id, &JobUpdate::running())
            .await
            .unwrap();
        assert_eq!(store.get(job.id).await.unwrap().status, JobStatus::Running);
    }

    #[tokio::test]
    async fn test_update_unknown_job_fails() {
        let store = InMemoryJobStore::new();
        assert!(store
            .update_job_status(Uuid::new_v4(), &JobUpdate::running())
            .await
            .is_err());
    }
}
