//! The durable, rate-limited dispatch queue.
//!
//! Every order passes through here on its way to the provider. The flow is:
//! 1. [`DispatchQueue::enqueue`] persists the job (`Pending`) and returns a [`JobHandle`] the caller can await.
//! 2. A background worker ([`start_dispatch_worker`]) claims jobs one at a time. The claim is an atomic
//!    pending→running flip in the database, so exactly one worker runs a job even with several workers.
//! 3. Between the claim and the provider call sits the [`RateLimiter`]: at most 50 job starts per rolling 60 s
//!    window, independent of the client's internal retries.
//! 4. The outcome settles on the job row first, then resolves the in-process waiter. A process restart loses the
//!    waiter but not the job: pending rows are picked up again, and settled rows keep their outcome.
//!
//! A job that fails terminally stays `Failed`; the queue never re-runs it. Dispatch-level retries live inside
//! [`GootaxApi::create_order`], within a single claim.
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use gootax_tools::{GootaxApi, GootaxApiError, NewTaxiOrder, OrderTransport, TaxiOrderResult};
use log::*;
use thiserror::Error;
use tokio::{
    sync::{oneshot, Notify},
    task::JoinHandle,
    time::Instant,
};

use crate::{
    db_types::{DispatchJob, NewDispatchJob, SourceChannel},
    traits::{DispatchQueueDatabase, StorageError},
};

/// Default provider quota: 50 job starts per rolling 60 second window.
pub const RATE_LIMIT_MAX_STARTS: usize = 50;
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// How long an idle worker sleeps before re-polling the database. The queue nudges the worker on every enqueue,
/// so this only matters for jobs left over from a previous process.
const IDLE_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Back-off after a storage error in the worker loop.
const STORAGE_RETRY_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Provider(GootaxApiError),
    #[error("Job {id} payload is corrupt: {message}")]
    CorruptJob { id: i64, message: String },
    #[error("Could not serialize the order for storage: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("The dispatch worker went away before the job settled")]
    HandleDropped,
}

//--------------------------------------     RateLimiter     ----------------------------------------------------------

/// Sliding-window rate limiter over job starts.
///
/// A "start" is the moment the worker hands a claimed job to the provider client. Client-internal retries are not
/// starts; they are part of the same job.
pub struct RateLimiter {
    max_starts: usize,
    window: Duration,
    starts: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_starts: usize, window: Duration) -> Self {
        Self { max_starts, window, starts: Mutex::new(VecDeque::with_capacity(max_starts)) }
    }

    /// Records a start if the window has room, returning `false` without blocking otherwise.
    pub fn try_start(&self) -> bool {
        let mut starts = self.starts.lock().unwrap();
        let now = Instant::now();
        Self::prune(&mut starts, now, self.window);
        if starts.len() < self.max_starts {
            starts.push_back(now);
            true
        } else {
            false
        }
    }

    /// Waits until the window has room, then records a start.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut starts = self.starts.lock().unwrap();
                let now = Instant::now();
                Self::prune(&mut starts, now, self.window);
                if starts.len() < self.max_starts {
                    starts.push_back(now);
                    return;
                }
                // The front entry is the oldest start; the window frees up when it ages out.
                *starts.front().unwrap() + self.window - now
            };
            trace!("🕰️ Rate limit reached. Next slot in {wait:?}");
            tokio::time::sleep(wait).await;
        }
    }

    fn prune(starts: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while starts.front().map(|t| now.duration_since(*t) >= window).unwrap_or(false) {
            starts.pop_front();
        }
    }
}

//--------------------------------------      JobHandle      ----------------------------------------------------------

type JobWaiter = oneshot::Sender<Result<TaxiOrderResult, QueueError>>;

/// The caller's side of an enqueued job.
pub struct JobHandle {
    job_id: i64,
    receiver: oneshot::Receiver<Result<TaxiOrderResult, QueueError>>,
}

impl JobHandle {
    pub fn job_id(&self) -> i64 {
        self.job_id
    }

    /// Suspends until the job settles. If the worker disappears before settling (process shutdown), the handle
    /// resolves to [`QueueError::HandleDropped`]; the job row itself remains and is picked up on restart.
    pub async fn await_result(self) -> Result<TaxiOrderResult, QueueError> {
        self.receiver.await.map_err(|_| QueueError::HandleDropped)?
    }
}

//--------------------------------------    DispatchQueue    ----------------------------------------------------------

/// Handle to the durable dispatch queue. Cheap to clone; all clones share the waiter table, the rate limiter and
/// the worker wake-up signal.
pub struct DispatchQueue<B> {
    db: B,
    waiters: Arc<Mutex<HashMap<i64, JobWaiter>>>,
    work_available: Arc<Notify>,
    limiter: Arc<RateLimiter>,
}

impl<B> Clone for DispatchQueue<B>
where B: Clone
{
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            waiters: Arc::clone(&self.waiters),
            work_available: Arc::clone(&self.work_available),
            limiter: Arc::clone(&self.limiter),
        }
    }
}

impl<B> DispatchQueue<B>
where B: DispatchQueueDatabase
{
    pub fn new(db: B, limiter: RateLimiter) -> Self {
        Self {
            db,
            waiters: Arc::new(Mutex::new(HashMap::new())),
            work_available: Arc::new(Notify::new()),
            limiter: Arc::new(limiter),
        }
    }

    /// Persists the order as a dispatch job and returns a handle to await its outcome. The job is durable once
    /// this returns; losing the handle does not lose the job.
    pub async fn enqueue(&self, order: &NewTaxiOrder, source: SourceChannel) -> Result<JobHandle, QueueError> {
        let new_job = NewDispatchJob::new(order, source)?;
        let job = self.db.insert_job(new_job).await?;
        let (sender, receiver) = oneshot::channel();
        self.waiters.lock().unwrap().insert(job.id, sender);
        self.work_available.notify_one();
        debug!("📋️ Job {} enqueued ({source})", job.id);
        Ok(JobHandle { job_id: job.id, receiver })
    }

    /// Job diagnostics straight from the store.
    pub async fn job_status(&self, id: i64) -> Result<Option<DispatchJob>, QueueError> {
        Ok(self.db.fetch_job(id).await?)
    }

    fn settle_waiter(&self, job_id: i64, outcome: Result<TaxiOrderResult, QueueError>) {
        let waiter = self.waiters.lock().unwrap().remove(&job_id);
        match waiter {
            Some(sender) => {
                if sender.send(outcome).is_err() {
                    debug!("📋️ Awaiter for job {job_id} gave up before the job settled");
                }
            },
            // Normal after a restart: the row was enqueued by a previous process.
            None => debug!("📋️ No in-process awaiter for job {job_id}"),
        }
    }
}

//--------------------------------------   Dispatch worker   ----------------------------------------------------------

/// Starts the background dispatch worker. It runs until the returned handle is aborted (typically at server
/// shutdown) and drains any jobs left pending by previous runs before going idle.
pub fn start_dispatch_worker<B, T>(queue: DispatchQueue<B>, api: GootaxApi<T>) -> JoinHandle<()>
where
    B: DispatchQueueDatabase + Send + Sync + 'static,
    T: OrderTransport + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!("📋️ Dispatch worker started");
        loop {
            match queue.db.claim_next_job().await {
                Ok(Some(job)) => {
                    queue.limiter.acquire().await;
                    run_job(&queue, &api, job).await;
                },
                Ok(None) => {
                    tokio::select! {
                        _ = queue.work_available.notified() => {},
                        _ = tokio::time::sleep(IDLE_POLL_INTERVAL) => {},
                    }
                },
                Err(e) => {
                    error!("📋️ Could not claim next job: {e}. Retrying shortly.");
                    tokio::time::sleep(STORAGE_RETRY_INTERVAL).await;
                },
            }
        }
    })
}

async fn run_job<B, T>(queue: &DispatchQueue<B>, api: &GootaxApi<T>, job: DispatchJob)
where
    B: DispatchQueueDatabase,
    T: OrderTransport,
{
    let job_id = job.id;
    let order = match job.order() {
        Ok(order) => order,
        Err(e) => {
            error!("📋️ Job {job_id} payload is corrupt: {e}");
            let message = e.to_string();
            if let Err(store_err) = queue.db.fail_job(job_id, &message).await {
                error!("📋️ Could not record corrupt job {job_id}: {store_err}");
            }
            queue.settle_waiter(job_id, Err(QueueError::CorruptJob { id: job_id, message }));
            return;
        },
    };
    debug!("📋️ Job {job_id} claimed (attempt {}). Dispatching to provider.", job.attempts);
    match api.create_order(&order).await {
        Ok(result) => {
            let result_body = serde_json::to_string(&result).unwrap_or_default();
            match queue.db.complete_job(job_id, &result.order_id, &result_body).await {
                Ok(_) => info!("📋️ Job {job_id} completed. Provider order {}", result.order_id),
                Err(e) => error!("📋️ Job {job_id} succeeded but could not be settled in storage: {e}"),
            }
            queue.settle_waiter(job_id, Ok(result));
        },
        Err(e) => {
            warn!("📋️ Job {job_id} failed at the provider: {e}");
            if let Err(store_err) = queue.db.fail_job(job_id, &e.to_string()).await {
                error!("📋️ Could not record failure for job {job_id}: {store_err}");
            }
            queue.settle_waiter(job_id, Err(QueueError::Provider(e)));
        },
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

    use chrono::{NaiveDate, Utc};
    use gootax_tools::{GootaxConfig, RawResponse, RidePoint, TransportError};
    use htg_common::Phone;

    use super::*;
    use crate::db_types::JobStatus;

    //------------------------------------ in-memory store for worker tests -------------------------------------------

    #[derive(Clone, Default)]
    struct MemoryStore {
        jobs: Arc<Mutex<Vec<DispatchJob>>>,
        next_id: Arc<AtomicI64>,
    }

    impl DispatchQueueDatabase for MemoryStore {
        fn url(&self) -> &str {
            "memory://"
        }

        async fn insert_job(&self, job: NewDispatchJob) -> Result<DispatchJob, StorageError> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let row = DispatchJob {
                id,
                status: JobStatus::Pending,
                order_body: job.order_body,
                attempts: 0,
                source: job.source,
                provider_order_id: None,
                result_body: None,
                last_error: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            self.jobs.lock().unwrap().push(row.clone());
            Ok(row)
        }

        async fn claim_next_job(&self) -> Result<Option<DispatchJob>, StorageError> {
            let mut jobs = self.jobs.lock().unwrap();
            let job = jobs.iter_mut().find(|j| j.status == JobStatus::Pending);
            Ok(job.map(|j| {
                j.status = JobStatus::Running;
                j.attempts += 1;
                j.clone()
            }))
        }

        async fn complete_job(
            &self,
            id: i64,
            provider_order_id: &str,
            result_body: &str,
        ) -> Result<DispatchJob, StorageError> {
            let mut jobs = self.jobs.lock().unwrap();
            let job = jobs.iter_mut().find(|j| j.id == id).ok_or(StorageError::JobNotFound(id))?;
            job.status = JobStatus::Completed;
            job.provider_order_id = Some(provider_order_id.to_string());
            job.result_body = Some(result_body.to_string());
            Ok(job.clone())
        }

        async fn fail_job(&self, id: i64, error: &str) -> Result<DispatchJob, StorageError> {
            let mut jobs = self.jobs.lock().unwrap();
            let job = jobs.iter_mut().find(|j| j.id == id).ok_or(StorageError::JobNotFound(id))?;
            job.status = JobStatus::Failed;
            job.last_error = Some(error.to_string());
            Ok(job.clone())
        }

        async fn fetch_job(&self, id: i64) -> Result<Option<DispatchJob>, StorageError> {
            Ok(self.jobs.lock().unwrap().iter().find(|j| j.id == id).cloned())
        }

        async fn pending_job_count(&self) -> Result<i64, StorageError> {
            Ok(self.jobs.lock().unwrap().iter().filter(|j| j.status == JobStatus::Pending).count() as i64)
        }
    }

    #[derive(Clone, Default)]
    struct AlwaysOkTransport {
        calls: Arc<AtomicUsize>,
    }

    impl OrderTransport for AlwaysOkTransport {
        async fn post_form(
            &self,
            _url: &str,
            _form: &[(&'static str, String)],
        ) -> Result<RawResponse, TransportError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(RawResponse { status: 200, body: format!(r#"{{"order_id": "prov-{n}"}}"#) })
        }
    }

    #[derive(Clone, Default)]
    struct AlwaysRejectTransport;

    impl OrderTransport for AlwaysRejectTransport {
        async fn post_form(
            &self,
            _url: &str,
            _form: &[(&'static str, String)],
        ) -> Result<RawResponse, TransportError> {
            Ok(RawResponse { status: 400, body: "no such tariff".to_string() })
        }
    }

    fn test_order() -> NewTaxiOrder {
        NewTaxiOrder {
            pickup: RidePoint { lat: 61.78, lon: 34.35, label: "Hotel".to_string() },
            dropoff: RidePoint { lat: 61.88, lon: 34.15, label: "Airport".to_string() },
            client_id: "client-1".to_string(),
            phone: Phone::normalize("79211234567").unwrap(),
            tariff_id: "39741".to_string(),
            time: NaiveDate::from_ymd_opt(2031, 1, 2).unwrap().and_hms_opt(10, 0, 0).unwrap(),
            options: vec![],
            comment: None,
        }
    }

    //------------------------------------         rate limiter          ----------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn at_most_fifty_starts_in_one_window() {
        let limiter = RateLimiter::new(RATE_LIMIT_MAX_STARTS, RATE_LIMIT_WINDOW);
        let mut started = 0;
        for _ in 0..60 {
            if limiter.try_start() {
                started += 1;
            }
        }
        assert_eq!(started, RATE_LIMIT_MAX_STARTS);
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(limiter.try_start());
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_blocks_until_the_window_frees() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        limiter.acquire().await;
        limiter.acquire().await;
        let started = Instant::now();
        limiter.acquire().await;
        assert!(started.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn the_window_slides_rather_than_resets() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.try_start());
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(limiter.try_start());
        assert!(!limiter.try_start());
        // The first start ages out at t=60, the second only at t=90.
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(limiter.try_start());
        assert!(!limiter.try_start());
    }

    //------------------------------------       queue and worker        ----------------------------------------------

    #[tokio::test]
    async fn enqueued_job_settles_through_the_worker() {
        let store = MemoryStore::default();
        let queue = DispatchQueue::new(store.clone(), RateLimiter::new(50, RATE_LIMIT_WINDOW));
        let api = GootaxApi::with_transport(GootaxConfig::default(), AlwaysOkTransport::default());
        let worker = start_dispatch_worker(queue.clone(), api);

        let handle = queue.enqueue(&test_order(), SourceChannel::Operator).await.unwrap();
        let job_id = handle.job_id();
        let result = handle.await_result().await.unwrap();
        assert_eq!(result.order_id, "prov-1");

        let job = queue.job_status(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.provider_order_id.as_deref(), Some("prov-1"));
        worker.abort();
    }

    #[tokio::test]
    async fn failed_jobs_stay_failed_and_propagate() {
        let store = MemoryStore::default();
        let queue = DispatchQueue::new(store.clone(), RateLimiter::new(50, RATE_LIMIT_WINDOW));
        let api = GootaxApi::with_transport(GootaxConfig::default(), AlwaysRejectTransport);
        let worker = start_dispatch_worker(queue.clone(), api);

        let handle = queue.enqueue(&test_order(), SourceChannel::Pms).await.unwrap();
        let job_id = handle.job_id();
        let err = handle.await_result().await.unwrap_err();
        assert!(matches!(err, QueueError::Provider(GootaxApiError::OrderRejected { status: 400, .. })));

        let job = queue.job_status(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.last_error.as_deref().unwrap_or_default().contains("400"));
        assert_eq!(job.attempts, 1, "the queue must not re-run a failed job");
        assert_eq!(store.pending_job_count().await.unwrap(), 0);
        worker.abort();
    }

    #[tokio::test]
    async fn jobs_from_a_previous_run_are_picked_up() {
        let store = MemoryStore::default();
        // Simulate a restart: the job row exists but no in-process waiter does.
        let orphan = NewDispatchJob::new(&test_order(), SourceChannel::Operator).unwrap();
        store.insert_job(orphan).await.unwrap();

        let queue = DispatchQueue::new(store.clone(), RateLimiter::new(50, RATE_LIMIT_WINDOW));
        let api = GootaxApi::with_transport(GootaxConfig::default(), AlwaysOkTransport::default());
        let worker = start_dispatch_worker(queue.clone(), api);

        // The idle worker polls the store even without an enqueue nudge.
        let settled = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let job = store.fetch_job(1).await.unwrap().unwrap();
                if job.status == JobStatus::Completed {
                    return job;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("orphaned job was never settled");
        assert_eq!(settled.provider_order_id.as_deref(), Some("prov-1"));
        worker.abort();
    }

    #[tokio::test]
    async fn corrupt_job_rows_fail_without_reaching_the_provider() {
        let store = MemoryStore::default();
        store
            .insert_job(NewDispatchJob { order_body: "not json".to_string(), source: SourceChannel::Operator })
            .await
            .unwrap();
        let transport = AlwaysOkTransport::default();
        let queue = DispatchQueue::new(store.clone(), RateLimiter::new(50, RATE_LIMIT_WINDOW));
        let api = GootaxApi::with_transport(GootaxConfig::default(), transport.clone());
        let worker = start_dispatch_worker(queue.clone(), api);

        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let job = store.fetch_job(1).await.unwrap().unwrap();
                if job.status == JobStatus::Failed {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("corrupt job was never failed");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        worker.abort();
    }
}
