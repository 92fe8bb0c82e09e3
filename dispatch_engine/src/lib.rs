//! Hotel Taxi Gateway — dispatch engine
//!
//! The engine is the core of the gateway: it takes a guest's transfer request from any source channel, validates it,
//! resolves free-text addresses to coordinates, and pushes the resulting order through a durable, rate-limited
//! dispatch queue to the taxi provider.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the storage backend for the job queue and the
//!    geocode cache. You should never need to access the database directly; use the public API instead. The data
//!    types used in the database live in [`db_types`] and are public.
//! 2. The dispatch public API ([`mod@dispatch_api`]). [`OrderFlowApi`] is the orchestrator: one call takes a raw
//!    transfer request all the way to a provider order id (or a structured failure). Backends implement the traits
//!    in [`mod@traits`] to plug in storage, geocoding and CRM integrations.
//! 3. The dispatch queue itself ([`mod@queue`]): a background worker drains durable jobs through a sliding-window
//!    rate limiter and the provider client.
//!
//! The engine also emits events when orders are dispatched or fail. A simple actor framework lets you hook into
//! these events for notifications or audit without coupling the pipeline to them.
#[cfg(feature = "sqlite")]
mod sqlite;

pub mod db_types;
pub mod dispatch_api;
pub mod events;
pub mod geocoder;
pub mod helpers;
pub mod queue;
pub mod traits;
pub mod validator;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use dispatch_api::{DispatchError, OrderFlowApi, TariffTable};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{DispatchQueueDatabase, GeocodeCache, StorageError};
