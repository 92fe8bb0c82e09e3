use thiserror::Error;

use crate::db_types::{DispatchJob, NewDispatchJob};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Job {0} does not exist")]
    JobNotFound(i64),
    #[error("Stored job payload is corrupt: {0}")]
    CorruptPayload(#[from] serde_json::Error),
}

/// Durable storage contract for the dispatch queue.
///
/// Every mutation settles in the database before the caller observes it: a job returned from `insert_job` survives
/// a process restart, and a claim is an atomic pending→running transition that at most one worker can win.
#[allow(async_fn_in_trait)]
pub trait DispatchQueueDatabase: Clone {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Persists a new job in `Pending` status and returns the stored row.
    async fn insert_job(&self, job: NewDispatchJob) -> Result<DispatchJob, StorageError>;

    /// Atomically claims the oldest pending job, moving it to `Running` and incrementing its attempt count.
    /// Returns `None` when no pending work exists. Two concurrent callers never receive the same job.
    fn claim_next_job(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<DispatchJob>, StorageError>> + Send;

    /// Marks a running job as `Completed`, recording the provider order id and the result payload.
    fn complete_job(
        &self,
        id: i64,
        provider_order_id: &str,
        result_body: &str,
    ) -> impl std::future::Future<Output = Result<DispatchJob, StorageError>> + Send;

    /// Marks a running job as `Failed`, recording the final error. Failed jobs are never re-queued.
    fn fail_job(
        &self,
        id: i64,
        error: &str,
    ) -> impl std::future::Future<Output = Result<DispatchJob, StorageError>> + Send;

    /// Fetches a job row for diagnostics.
    async fn fetch_job(&self, id: i64) -> Result<Option<DispatchJob>, StorageError>;

    /// The number of jobs still in `Pending` status.
    async fn pending_job_count(&self) -> Result<i64, StorageError>;
}
