use thiserror::Error;

use crate::{
    geocoder::GeocodeError,
    queue::QueueError,
    traits::CrmError,
    validator::ValidationFailure,
};

/// Everything that can stop an order between intake and a provider order id.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Order failed validation: {}", .0.iter().map(|f| f.to_string()).collect::<Vec<_>>().join("; "))]
    Validation(Vec<ValidationFailure>),
    #[error("Address resolution failed: {0}")]
    Resolution(#[from] GeocodeError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("Dispatch did not settle within {seconds} s. The job is still in the queue; check its status.")]
    Timeout { seconds: u64 },
    #[error("CRM error: {0}")]
    Crm(#[from] CrmError),
}
