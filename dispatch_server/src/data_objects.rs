use std::fmt::Display;

use chrono::{DateTime, NaiveDateTime, Utc};
use dispatch_engine::{
    db_types::{CanonicalOrder, DispatchJob, SourceChannel},
    helpers::extract_phone,
};
use gootax_tools::TaxiOrderResult;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Could not convert the request into an order. {0}")]
pub struct OrderConversionError(pub String);

//--------------------------------------     OrderRequest     ---------------------------------------------------------

/// The operator console's order payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub client_id: String,
    pub phone: String,
    pub pickup_address: String,
    pub dropoff_address: String,
    /// Local wall-clock pickup time, e.g. `2031-06-15T14:30:00`.
    pub scheduled_time: NaiveDateTime,
    /// `sedan` (default) or `minivan`, case-insensitive.
    #[serde(default)]
    pub vehicle_class: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub booking_id: Option<String>,
}

impl TryFrom<OrderRequest> for CanonicalOrder {
    type Error = OrderConversionError;

    fn try_from(req: OrderRequest) -> Result<Self, Self::Error> {
        let vehicle_class = match req.vehicle_class.as_deref() {
            None | Some("") => Default::default(),
            Some(s) => s.parse().map_err(|e| OrderConversionError(format!("{e}")))?,
        };
        Ok(CanonicalOrder {
            client_id: req.client_id,
            phone: req.phone,
            pickup_address: req.pickup_address,
            dropoff_address: req.dropoff_address,
            scheduled_time: req.scheduled_time,
            vehicle_class,
            options: req.options,
            comment: req.comment,
            source: SourceChannel::Operator,
            booking_id: req.booking_id,
        })
    }
}

//--------------------------------------   PmsWebhookEvent    ---------------------------------------------------------

/// A booking event as the property management system posts it. The PMS rarely has a structured phone field, so the
/// phone may arrive inside `notes` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PmsWebhookEvent {
    pub booking_id: String,
    pub guest_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub pickup_time: NaiveDateTime,
    #[serde(default)]
    pub vehicle_class: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TryFrom<PmsWebhookEvent> for CanonicalOrder {
    type Error = OrderConversionError;

    fn try_from(event: PmsWebhookEvent) -> Result<Self, Self::Error> {
        let vehicle_class = match event.vehicle_class.as_deref() {
            None | Some("") => Default::default(),
            Some(s) => s.parse().map_err(|e| OrderConversionError(format!("{e}")))?,
        };
        let notes = event.notes.as_deref().unwrap_or_default();
        let phone = event
            .phone
            .clone()
            .or_else(|| extract_phone(notes).map(|p| p.to_string()))
            .unwrap_or_default();
        Ok(CanonicalOrder {
            client_id: event.guest_name,
            phone,
            pickup_address: event.pickup_address,
            dropoff_address: event.dropoff_address,
            scheduled_time: event.pickup_time,
            vehicle_class,
            options: Vec::new(),
            comment: event.notes,
            source: SourceChannel::Pms,
            booking_id: Some(event.booking_id),
        })
    }
}

//--------------------------------------      Responses       ---------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The success envelope for every dispatch route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub success: bool,
    pub order_id: String,
    pub status: String,
}

impl From<TaxiOrderResult> for OrderResponse {
    fn from(result: TaxiOrderResult) -> Self {
        Self { success: true, order_id: result.order_id, status: result.status.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub id: i64,
    pub status: String,
    pub attempts: i64,
    pub source: String,
    pub provider_order_id: Option<String>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DispatchJob> for JobStatusResponse {
    fn from(job: DispatchJob) -> Self {
        Self {
            id: job.id,
            status: job.status.to_string(),
            attempts: job.attempts,
            source: job.source.to_string(),
            provider_order_id: job.provider_order_id,
            last_error: job.last_error,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}
