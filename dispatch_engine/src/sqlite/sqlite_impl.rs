//! `SqliteDatabase` is the concrete storage backend of the dispatch engine.
//!
//! It implements [`DispatchQueueDatabase`] for the durable job queue and [`GeocodeCache`] for address resolution,
//! over a shared connection pool.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::db::{db_url, geocache, jobs, new_pool};
use crate::{
    db_types::{DispatchJob, GeocacheEntry, NewDispatchJob},
    traits::{DispatchQueueDatabase, GeocodeCache, StorageError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, reading the URL from the environment.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl DispatchQueueDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_job(&self, job: NewDispatchJob) -> Result<DispatchJob, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::Database)?;
        jobs::insert_job(job, &mut conn).await
    }

    async fn claim_next_job(&self) -> Result<Option<DispatchJob>, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::Database)?;
        jobs::claim_next_job(&mut conn).await
    }

    async fn complete_job(
        &self,
        id: i64,
        provider_order_id: &str,
        result_body: &str,
    ) -> Result<DispatchJob, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::Database)?;
        jobs::complete_job(id, provider_order_id, result_body, &mut conn).await
    }

    async fn fail_job(&self, id: i64, error: &str) -> Result<DispatchJob, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::Database)?;
        jobs::fail_job(id, error, &mut conn).await
    }

    async fn fetch_job(&self, id: i64) -> Result<Option<DispatchJob>, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::Database)?;
        Ok(jobs::fetch_job(id, &mut conn).await?)
    }

    async fn pending_job_count(&self) -> Result<i64, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::Database)?;
        Ok(jobs::pending_job_count(&mut conn).await?)
    }
}

impl GeocodeCache for SqliteDatabase {
    async fn lookup(&self, address: &str) -> Result<Option<GeocacheEntry>, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::Database)?;
        Ok(geocache::lookup(address, &mut conn).await?)
    }

    async fn store(
        &self,
        address: &str,
        lat: f64,
        lon: f64,
        label: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::Database)?;
        Ok(geocache::store(address, lat, lon, label, expires_at, &mut conn).await?)
    }
}
