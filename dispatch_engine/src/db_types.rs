use std::fmt::Display;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------    SourceChannel    ----------------------------------------------------------

/// Where a transfer request entered the gateway. Stored on the job row for diagnostics; the pipeline treats all
/// channels identically once the request is canonical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum SourceChannel {
    /// Direct API call from the hotel operator console.
    Operator,
    /// Property-management-system webhook.
    Pms,
    /// Pulled from the CRM transfer list.
    Crm,
}

impl Display for SourceChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceChannel::Operator => write!(f, "Operator"),
            SourceChannel::Pms => write!(f, "Pms"),
            SourceChannel::Crm => write!(f, "Crm"),
        }
    }
}

//--------------------------------------    VehicleClass     ----------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    #[default]
    Sedan,
    Minivan,
}

impl Display for VehicleClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VehicleClass::Sedan => write!(f, "sedan"),
            VehicleClass::Minivan => write!(f, "minivan"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("'{0}' is not a recognised vehicle class")]
pub struct VehicleClassError(pub String);

impl std::str::FromStr for VehicleClass {
    type Err = VehicleClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sedan" => Ok(VehicleClass::Sedan),
            "minivan" => Ok(VehicleClass::Minivan),
            other => Err(VehicleClassError(other.to_string())),
        }
    }
}

//--------------------------------------   CanonicalOrder    ----------------------------------------------------------

/// A transfer request in channel-independent form: raw addresses, raw phone, local wall-clock time.
///
/// This is what every intake route produces and what [`crate::OrderFlowApi::process_order`] consumes. It is not
/// persisted; only the fully resolved order that survives validation reaches the durable queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalOrder {
    pub client_id: String,
    pub phone: String,
    pub pickup_address: String,
    pub dropoff_address: String,
    /// Requested pickup time as a local wall-clock instant. The provider has no notion of UTC.
    pub scheduled_time: NaiveDateTime,
    pub vehicle_class: VehicleClass,
    pub options: Vec<String>,
    pub comment: Option<String>,
    pub source: SourceChannel,
    /// CRM booking reference, when the request came from (or maps onto) a CRM transfer. Drives the best-effort
    /// CRM status update after dispatch.
    pub booking_id: Option<String>,
}

//--------------------------------------      JobStatus      ----------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum JobStatus {
    /// Persisted, waiting for a worker to claim it.
    Pending,
    /// Claimed by a worker; the provider call is in flight.
    Running,
    Completed,
    Failed,
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "Pending"),
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Completed => write!(f, "Completed"),
            JobStatus::Failed => write!(f, "Failed"),
        }
    }
}

//--------------------------------------     DispatchJob     ----------------------------------------------------------

/// A durable dispatch job row. The job table doubles as the append-only dispatch log: settled rows keep the order
/// payload, the outcome and the timestamps, and are never deleted by the pipeline.
#[derive(Debug, Clone, FromRow)]
pub struct DispatchJob {
    pub id: i64,
    pub status: JobStatus,
    /// JSON serialization of the resolved [`gootax_tools::NewTaxiOrder`].
    pub order_body: String,
    /// Number of times a worker has claimed this job. Provider-level retries happen inside a single claim and are
    /// not counted here.
    pub attempts: i64,
    pub source: SourceChannel,
    pub provider_order_id: Option<String>,
    /// JSON serialization of the [`gootax_tools::TaxiOrderResult`] on success.
    pub result_body: Option<String>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DispatchJob {
    pub fn order(&self) -> Result<gootax_tools::NewTaxiOrder, serde_json::Error> {
        serde_json::from_str(&self.order_body)
    }
}

/// A job as handed to the store for insertion.
#[derive(Debug, Clone)]
pub struct NewDispatchJob {
    pub order_body: String,
    pub source: SourceChannel,
}

impl NewDispatchJob {
    pub fn new(order: &gootax_tools::NewTaxiOrder, source: SourceChannel) -> Result<Self, serde_json::Error> {
        let order_body = serde_json::to_string(order)?;
        Ok(Self { order_body, source })
    }
}

//--------------------------------------    GeocacheEntry    ----------------------------------------------------------

/// A cached address resolution. `expires_at` is checked on read; expired rows are treated as misses and
/// overwritten in place on the next successful resolution.
#[derive(Debug, Clone, FromRow)]
pub struct GeocacheEntry {
    pub address: String,
    pub lat: f64,
    pub lon: f64,
    pub label: String,
    pub expires_at: DateTime<Utc>,
}
