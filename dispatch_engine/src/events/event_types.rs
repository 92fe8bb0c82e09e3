use gootax_tools::TaxiOrderResult;

use crate::db_types::CanonicalOrder;

/// Emitted after a job settles successfully. Notification hooks (guest email, reception SMS) subscribe to this.
#[derive(Debug, Clone)]
pub struct OrderDispatchedEvent {
    pub order: CanonicalOrder,
    pub result: TaxiOrderResult,
}

impl OrderDispatchedEvent {
    pub fn new(order: CanonicalOrder, result: TaxiOrderResult) -> Self {
        Self { order, result }
    }
}

/// Emitted after a job fails terminally, so operations can be alerted even when no caller is awaiting.
#[derive(Debug, Clone)]
pub struct DispatchFailedEvent {
    pub order: CanonicalOrder,
    pub reason: String,
}

impl DispatchFailedEvent {
    pub fn new(order: CanonicalOrder, reason: String) -> Self {
        Self { order, reason }
    }
}
