//! The job record store collaborator.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::job::JobRecord;

/// Error type for job store operations.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("job store unavailable: {0}")]
    Unavailable(String),
}

/// External collaborator that persists finished job records.
///
/// The launcher only needs to hand over a record and get an identifier back;
/// what "persist" means is the implementor's business.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist one finished record and return its identifier.
    async fn save(&self, record: JobRecord) -> Result<i64, StoreError>;
}

/// In-memory store, used by the CLI and by tests.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: Mutex<Vec<JobRecord>>,
}

impl MemoryJobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All saved records, in save order.
    pub async fn saved(&self) -> Vec<JobRecord> {
        self.jobs.lock().await.clone()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn save(&self, record: JobRecord) -> Result<i64, StoreError> {
        let mut jobs = self.jobs.lock().await;
        jobs.push(record);
        Ok(i64::try_from(jobs.len()).unwrap_or(i64::MAX))
    }
}
