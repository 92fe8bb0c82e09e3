//! Client library for the Gootax taxi-dispatch API.
//!
//! Gootax is the external provider that actually assigns a vehicle to an order. This crate owns everything about
//! talking to it: building the signed wire payload ([`order_request`]), the resilient HTTP client with its retry
//! policy ([`api`]), and normalization of the provider's (not entirely uniform) response shapes ([`data_objects`]).
//!
//! The crate deliberately knows nothing about where orders come from. Callers hand it a fully resolved
//! [`NewTaxiOrder`] and get back a [`TaxiOrderResult`] or a [`GootaxApiError`] describing what went wrong, including
//! a cURL reproduction of the failed request for operator diagnosis.
mod api;
mod config;
mod data_objects;
mod error;
pub mod helpers;
mod order_request;

pub use api::{GootaxApi, HttpTransport, OrderTransport, RawResponse, TransportError, MAX_DISPATCH_ATTEMPTS};
pub use config::GootaxConfig;
pub use data_objects::{DriverInfo, NewTaxiOrder, OrderStatus, RidePoint, TaxiOrderResult};
pub use error::GootaxApiError;
pub use order_request::GootaxOrderPayload;
