//! # Hotel Taxi Gateway server
//! This crate hosts the HTTP boundary of the gateway. It is responsible for:
//! * Accepting transfer orders from the operator console (`POST /order`).
//! * Receiving booking webhooks from the property management system behind HMAC verification
//!   (`POST /webhook/pms`).
//! * Dispatching CRM transfers by id (`POST /transfer/{id}`) and exposing job diagnostics (`GET /job/{id}`).
//! * Wiring the engine together at startup: database, migrations, provider client, dispatch queue and worker,
//!   geocoder, CRM client and notification hooks.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod notifiers;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
