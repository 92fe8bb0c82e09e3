use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("CRM request failed: {0}")]
    RequestFailed(String),
    #[error("CRM response could not be parsed: {0}")]
    InvalidResponse(String),
    #[error("Transfer {0} not found in the CRM")]
    TransferNotFound(String),
}

/// A booking transfer as the CRM reports it. The phone often only appears as free text inside `notes`;
/// [`crate::helpers::extract_phone`] digs it out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmTransfer {
    pub id: String,
    pub guest_name: String,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub scheduled_time: NaiveDateTime,
    /// Free-text vehicle type as entered by reception, e.g. "SEDAN", "BUSINESS", "MINIVAN".
    pub vehicle_type: String,
}

/// The outcome the gateway reports back onto a CRM transfer after a dispatch attempt.
#[derive(Debug, Clone)]
pub enum TransferStatusUpdate {
    Dispatched { provider_order_id: String },
    Failed { reason: String },
}

/// The hotel CRM collaborator. The production implementation lives in the server crate; the engine only ever
/// talks through this trait.
#[allow(async_fn_in_trait)]
pub trait TransferCrm: Clone {
    /// All transfers scheduled for the given date.
    async fn get_transfers_for_date(&self, date: NaiveDate) -> Result<Vec<CrmTransfer>, CrmError>;

    /// Records a new transfer against a booking, returning the created transfer. Used after dispatching a PMS
    /// booking, which has no transfer record of its own yet.
    async fn create_booking_transfer(&self, booking_id: &str, transfer: CrmTransfer) -> Result<CrmTransfer, CrmError>;

    /// Best-effort status write-back after a dispatch attempt. Callers log failures and move on.
    async fn update_transfer_status(&self, transfer_id: &str, update: TransferStatusUpdate) -> Result<(), CrmError>;
}
