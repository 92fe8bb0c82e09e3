use std::{fmt, fmt::Display};

use chrono::NaiveDateTime;
use htg_common::Phone;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::GootaxApiError;

/// One endpoint of a ride, fully resolved to coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidePoint {
    pub lat: f64,
    pub lon: f64,
    pub label: String,
}

/// A validated, fully resolved order, ready to be turned into a signed provider payload.
///
/// `time` is in the provider's local time zone; Gootax has no notion of UTC on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTaxiOrder {
    pub pickup: RidePoint,
    pub dropoff: RidePoint,
    pub client_id: String,
    pub phone: Phone,
    pub tariff_id: String,
    pub time: NaiveDateTime,
    pub options: Vec<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Pending,
    Failed,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Created => write!(f, "created"),
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverInfo {
    pub name: String,
    pub phone: String,
}

/// The normalized result of a successful dispatch. This is the only durable side effect of the whole pipeline;
/// durability lives in the provider's system, keyed by `order_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxiOrderResult {
    pub order_id: String,
    pub status: OrderStatus,
    pub driver_info: Option<DriverInfo>,
}

impl TaxiOrderResult {
    /// Parses a provider response body into a normalized result.
    ///
    /// Gootax deployments are not uniform: some respond with `{"order_id": ...}`, others with `{"id": ...}`, and the
    /// id may be a string or a number. Either key is accepted; a body with neither is a parse error.
    pub fn from_response_body(body: &str) -> Result<Self, GootaxApiError> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| GootaxApiError::InvalidResponse(format!("{e}. Body: {body}")))?;
        let order_id = extract_id(&value["order_id"])
            .or_else(|| extract_id(&value["id"]))
            .ok_or_else(|| GootaxApiError::InvalidResponse(format!("neither 'order_id' nor 'id' present in {body}")))?;
        let status = serde_json::from_value::<OrderStatus>(value["status"].clone()).unwrap_or(OrderStatus::Created);
        let driver_info = serde_json::from_value::<DriverInfo>(value["driver_info"].clone()).ok();
        Ok(Self { order_id, status, driver_info })
    }
}

fn extract_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
