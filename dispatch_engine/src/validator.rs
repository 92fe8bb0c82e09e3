//! Order validation rules.
//!
//! Rules accumulate rather than short-circuit, so an operator fixing a rejected order sees every problem at once.
//! Validation runs after address resolution; the location rule needs coordinates, not strings.
use chrono::{Local, NaiveDateTime, Timelike};
use htg_common::Phone;
use thiserror::Error;

use crate::geocoder::ResolvedLocation;

/// Two locations closer than this (in degrees, on either axis) are considered the same place.
const MIN_COORDINATE_DELTA: f64 = 0.001;
/// Dispatching is only available between 05:00 and 23:59 local time.
const FIRST_SERVICE_HOUR: u32 = 5;
const LAST_SERVICE_HOUR: u32 = 23;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("Requested pickup time is in the past")]
    TimeInPast,
    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),
    #[error("Pickup and dropoff resolve to the same location")]
    LocationsTooClose,
    #[error("Pickup time is outside service hours (05:00-23:59)")]
    OutsideServiceHours,
}

/// Checks all rules against a resolved order. On success the normalized phone is returned; on failure, every rule
/// that was broken.
pub fn validate_order(
    pickup: &ResolvedLocation,
    dropoff: &ResolvedLocation,
    time: NaiveDateTime,
    phone: &str,
) -> Result<Phone, Vec<ValidationFailure>> {
    validate_order_at(pickup, dropoff, time, phone, Local::now().naive_local())
}

/// [`validate_order`] with an explicit "now", so the time rules are testable.
pub fn validate_order_at(
    pickup: &ResolvedLocation,
    dropoff: &ResolvedLocation,
    time: NaiveDateTime,
    phone: &str,
    now: NaiveDateTime,
) -> Result<Phone, Vec<ValidationFailure>> {
    let mut failures = Vec::new();

    if time < now {
        failures.push(ValidationFailure::TimeInPast);
    }
    if !(FIRST_SERVICE_HOUR..=LAST_SERVICE_HOUR).contains(&time.hour()) {
        failures.push(ValidationFailure::OutsideServiceHours);
    }
    let phone = match Phone::normalize(phone) {
        Ok(phone) => Some(phone),
        Err(e) => {
            failures.push(ValidationFailure::InvalidPhone(e.to_string()));
            None
        },
    };
    let lat_delta = (pickup.lat - dropoff.lat).abs();
    let lon_delta = (pickup.lon - dropoff.lon).abs();
    if lat_delta <= MIN_COORDINATE_DELTA && lon_delta <= MIN_COORDINATE_DELTA {
        failures.push(ValidationFailure::LocationsTooClose);
    }

    match (failures.is_empty(), phone) {
        (true, Some(phone)) => Ok(phone),
        _ => Err(failures),
    }
}
