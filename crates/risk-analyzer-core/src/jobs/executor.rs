use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use super::store::JobStore;
use super::types::{Job, JobType, JobUpdate};
use crate::error::RiskError;
use crate::RiskResult;

/// Sending half of one job's progress stream. Closing takes the sender out,
/// so nothing can be delivered afterwards even if a reporter outlives the
/// computation.
struct ProgressSlot {
    sender: Mutex<Option<broadcast::Sender<u8>>>,
}

impl ProgressSlot {
    fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Mutex::new(Some(tx)),
        }
    }

    fn send(&self, progress: u8) {
        if let Ok(guard) = self.sender.lock() {
            if let Some(tx) = guard.as_ref() {
                // no subscribers is fine
                let _ = tx.send(progress);
            }
        }
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<u8>> {
        self.sender
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|tx| tx.subscribe()))
    }

    fn close(&self) {
        if let Ok(mut guard) = self.sender.lock() {
            guard.take();
        }
    }
}

/// Handle given to a computation for pushing progress percentages.
#[derive(Clone)]
pub struct ProgressReporter {
    slot: Arc<ProgressSlot>,
}

impl ProgressReporter {
    /// Best-effort; values above 100 are capped.
    pub fn report(&self, progress: u8) {
        self.slot.send(progress.min(100));
    }
}

/// Receiving half of a job's progress stream.
pub struct ProgressStream {
    rx: broadcast::Receiver<u8>,
}

impl ProgressStream {
    /// Next progress value, or `None` once the job reached a terminal state.
    /// Values a slow reader missed are skipped.
    pub async fn next(&mut self) -> Option<u8> {
        loop {
            match self.rx.recv().await {
                Ok(v) => return Some(v),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[derive(Default)]
struct Registry {
    jobs: HashMap<Uuid, Job>,
    progress: HashMap<Uuid, Arc<ProgressSlot>>,
}

struct Inner {
    registry: RwLock<Registry>,
    store: Arc<dyn JobStore>,
    progress_buffer: usize,
}

/// Runs submitted computations concurrently, one task per job, and tracks
/// their lifecycle `queued -> running -> succeeded | failed`.
///
/// There is no admission control: every submission gets its own task.
#[derive(Clone)]
pub struct JobExecutor {
    inner: Arc<Inner>,
}

impl JobExecutor {
    pub fn new(store: Arc<dyn JobStore>, progress_buffer: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: RwLock::new(Registry::default()),
                store,
                progress_buffer,
            }),
        }
    }

    /// Record a queued job, open its progress stream and start the
    /// computation. Returns without waiting for it.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn submit<F, Fut>(&self, job_type: JobType, computation: F) -> RiskResult<Job>
    where
        F: FnOnce(ProgressReporter) -> Fut + Send + 'static,
        Fut: Future<Output = RiskResult<serde_json::Value>> + Send + 'static,
    {
        let job = Job::new(job_type);
        self.inner.store.persist_job(&job).await?;

        let slot = Arc::new(ProgressSlot::new(self.inner.progress_buffer));
        {
            let mut registry = self.inner.registry.write().await;
            registry.jobs.insert(job.id, job.clone());
            registry.progress.insert(job.id, Arc::clone(&slot));
        }
        info!(job_id = %job.id, job_type = %job_type, "job queued");

        let inner = Arc::clone(&self.inner);
        let id = job.id;
        tokio::spawn(async move {
            inner.execute(id, job_type, slot, computation).await;
        });

        Ok(job)
    }

    /// Current snapshot of a job.
    pub async fn get_job(&self, id: Uuid) -> RiskResult<Job> {
        self.inner
            .registry
            .read()
            .await
            .jobs
            .get(&id)
            .cloned()
            .ok_or_else(|| RiskError::not_found("job", id))
    }

    /// Subscribe to a job's progress. Fails with `NotFound` once the job has
    /// completed and its stream was removed.
    pub async fn get_progress(&self, id: Uuid) -> RiskResult<ProgressStream> {
        let registry = self.inner.registry.read().await;
        registry
            .progress
            .get(&id)
            .and_then(|slot| slot.subscribe())
            .map(|rx| ProgressStream { rx })
            .ok_or_else(|| RiskError::not_found("progress stream", id))
    }

    /// Wait until the job is terminal and return its final snapshot.
    pub async fn wait(&self, id: Uuid) -> RiskResult<Job> {
        match self.get_progress(id).await {
            Ok(mut stream) => while stream.next().await.is_some() {},
            Err(RiskError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
        self.get_job(id).await
    }
}

impl Inner {
    async fn execute<F, Fut>(&self, id: Uuid, job_type: JobType, slot: Arc<ProgressSlot>, computation: F)
    where
        F: FnOnce(ProgressReporter) -> Fut + Send + 'static,
        Fut: Future<Output = RiskResult<serde_json::Value>> + Send + 'static,
    {
        let running = JobUpdate::running();
        self.persist(id, &running).await;
        if let Some(job) = self.registry.write().await.jobs.get_mut(&id) {
            job.apply(&running);
        }
        info!(job_id = %id, job_type = %job_type, "job running");

        let reporter = ProgressReporter {
            slot: Arc::clone(&slot),
        };
        // building the future runs inside the task too, so a synchronous
        // panic is caught as a JoinError like an async one
        let outcome = match tokio::spawn(async move { computation(reporter).await }).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(join) => Err(format!("computation aborted: {}", join)),
        };

        let terminal = match outcome {
            Ok(value) => {
                info!(job_id = %id, job_type = %job_type, "job succeeded");
                JobUpdate::succeeded(value)
            }
            Err(message) => {
                warn!(job_id = %id, job_type = %job_type, error = %message, "job failed");
                JobUpdate::failed(message)
            }
        };

        self.persist(id, &terminal).await;

        let mut registry = self.registry.write().await;
        if let Some(job) = registry.jobs.get_mut(&id) {
            job.apply(&terminal);
        }
        registry.progress.remove(&id);
        slot.close();
    }

    async fn persist(&self, id: Uuid, update: &JobUpdate) {
        if let Err(e) = self.store.update_job_status(id, update).await {
            warn!(job_id = %id, status = %update.status, error = %e, "failed to persist job status");
        }
    }
}
