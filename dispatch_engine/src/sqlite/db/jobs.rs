use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{DispatchJob, NewDispatchJob},
    traits::StorageError,
};

/// Persists a new job in `Pending` status and returns the stored row.
pub async fn insert_job(job: NewDispatchJob, conn: &mut SqliteConnection) -> Result<DispatchJob, StorageError> {
    let job: DispatchJob = sqlx::query_as(
        r#"
            INSERT INTO dispatch_jobs (status, order_body, source)
            VALUES ('Pending', $1, $2)
            RETURNING *;
        "#,
    )
    .bind(job.order_body)
    .bind(job.source)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or(sqlx::Error::RowNotFound)?;
    debug!("🗃️ Dispatch job {} persisted ({})", job.id, job.source);
    Ok(job)
}

/// Atomically claims the oldest pending job. The inner `SELECT … LIMIT 1` and the status flip happen in one
/// statement, so concurrent workers cannot claim the same row.
pub async fn claim_next_job(conn: &mut SqliteConnection) -> Result<Option<DispatchJob>, StorageError> {
    let job = sqlx::query_as(
        r#"
            UPDATE dispatch_jobs
            SET status = 'Running', attempts = attempts + 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = (
                SELECT id FROM dispatch_jobs WHERE status = 'Pending' ORDER BY id LIMIT 1
            )
            RETURNING *;
        "#,
    )
    .fetch_all(conn)
    .await?
    .pop();
    Ok(job)
}

pub async fn complete_job(
    id: i64,
    provider_order_id: &str,
    result_body: &str,
    conn: &mut SqliteConnection,
) -> Result<DispatchJob, StorageError> {
    let job = sqlx::query_as(
        r#"
            UPDATE dispatch_jobs
            SET status = 'Completed',
                provider_order_id = $1,
                result_body = $2,
                last_error = NULL,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND status = 'Running'
            RETURNING *;
        "#,
    )
    .bind(provider_order_id)
    .bind(result_body)
    .bind(id)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or(StorageError::JobNotFound(id))?;
    debug!("🗃️ Dispatch job {id} completed with provider order {provider_order_id}");
    Ok(job)
}

pub async fn fail_job(id: i64, error: &str, conn: &mut SqliteConnection) -> Result<DispatchJob, StorageError> {
    let job = sqlx::query_as(
        r#"
            UPDATE dispatch_jobs
            SET status = 'Failed', last_error = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = 'Running'
            RETURNING *;
        "#,
    )
    .bind(error)
    .bind(id)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or(StorageError::JobNotFound(id))?;
    debug!("🗃️ Dispatch job {id} marked failed: {error}");
    Ok(job)
}

pub async fn fetch_job(id: i64, conn: &mut SqliteConnection) -> Result<Option<DispatchJob>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM dispatch_jobs WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn pending_job_count(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM dispatch_jobs WHERE status = 'Pending'")
        .fetch_one(conn)
        .await?;
    Ok(count)
}
