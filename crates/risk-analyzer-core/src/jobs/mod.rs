//! Asynchronous job execution with persisted state transitions and
//! per-job progress streams.

pub mod executor;
pub mod store;
pub mod types;

pub use executor::{JobExecutor, ProgressReporter, ProgressStream};
pub use store::{InMemoryJobStore, JobStore};
pub use types::{Job, JobStatus, JobType, JobUpdate};
