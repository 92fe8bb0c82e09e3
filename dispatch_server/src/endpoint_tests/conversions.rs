use actix_web::{body::MessageBody, error::ResponseError, http::StatusCode};
use chrono::NaiveDate;
use dispatch_engine::{
    db_types::{CanonicalOrder, SourceChannel, VehicleClass},
    dispatch_api::DispatchError,
    validator::ValidationFailure,
};

use crate::{
    data_objects::{OrderRequest, PmsWebhookEvent},
    errors::ServerError,
};

fn order_request() -> OrderRequest {
    serde_json::from_str(
        r#"{
            "client_id": "guest-214",
            "phone": "8 (921) 123-45-67",
            "pickup_address": "наб. Гюллинга 2",
            "dropoff_address": "Аэропорт Бесовец",
            "scheduled_time": "2031-06-15T14:30:00"
        }"#,
    )
    .expect("valid order request")
}

#[test]
fn operator_order_defaults_to_sedan() {
    let order = CanonicalOrder::try_from(order_request()).expect("conversion should succeed");
    assert_eq!(order.vehicle_class, VehicleClass::Sedan);
    assert_eq!(order.source, SourceChannel::Operator);
    assert!(order.options.is_empty());
    assert!(order.booking_id.is_none());
    assert_eq!(order.scheduled_time, NaiveDate::from_ymd_opt(2031, 6, 15).unwrap().and_hms_opt(14, 30, 0).unwrap());
}

#[test]
fn operator_order_vehicle_class_is_case_insensitive() {
    let mut req = order_request();
    req.vehicle_class = Some("MINIVAN".to_string());
    let order = CanonicalOrder::try_from(req).expect("conversion should succeed");
    assert_eq!(order.vehicle_class, VehicleClass::Minivan);
}

#[test]
fn unknown_vehicle_class_is_rejected() {
    let mut req = order_request();
    req.vehicle_class = Some("limousine".to_string());
    let err = CanonicalOrder::try_from(req).expect_err("conversion should fail");
    assert!(err.to_string().contains("limousine"));
}

#[test]
fn webhook_event_pulls_the_phone_out_of_the_notes() {
    let event: PmsWebhookEvent = serde_json::from_str(
        r#"{
            "booking_id": "B-1001",
            "guest_name": "Ivanov",
            "pickup_address": "наб. Гюллинга 2",
            "dropoff_address": "Вокзал",
            "pickup_time": "2031-06-15T10:00:00",
            "notes": "Встретить у стойки, тел. +7 921 123-45-67"
        }"#,
    )
    .expect("valid webhook event");
    let order = CanonicalOrder::try_from(event).expect("conversion should succeed");
    assert_eq!(order.phone, "79211234567");
    assert_eq!(order.source, SourceChannel::Pms);
    assert_eq!(order.booking_id.as_deref(), Some("B-1001"));
}

#[test]
fn webhook_event_without_any_phone_converts_with_an_empty_phone() {
    // Validation will reject it downstream; conversion itself must not fail.
    let event: PmsWebhookEvent = serde_json::from_str(
        r#"{
            "booking_id": "B-1002",
            "guest_name": "Petrov",
            "pickup_address": "наб. Гюллинга 2",
            "dropoff_address": "Вокзал",
            "pickup_time": "2031-06-15T10:00:00"
        }"#,
    )
    .expect("valid webhook event");
    let order = CanonicalOrder::try_from(event).expect("conversion should succeed");
    assert!(order.phone.is_empty());
}

#[test]
fn validation_errors_are_itemized_in_the_response() {
    let failures = vec![ValidationFailure::TimeInPast, ValidationFailure::InvalidPhone("123".to_string())];
    let err = ServerError::Dispatch(DispatchError::Validation(failures));
    let response = err.error_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().try_into_bytes().expect("body should be available");
    let body: serde_json::Value = serde_json::from_slice(&bytes).expect("body should be JSON");
    assert_eq!(body["success"], false);
    assert_eq!(body["failures"].as_array().map(|a| a.len()), Some(2));
}

#[test]
fn not_found_maps_to_404() {
    let err = ServerError::NoRecordFound("No dispatch job with id 42".to_string());
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
}
