//! # Backend trait contracts
//!
//! This module defines the interfaces the dispatch engine requires from its collaborators:
//!
//! * [`DispatchQueueDatabase`] — durable storage for dispatch jobs and the geocode cache. The SQLite backend in
//!   [`crate::SqliteDatabase`] is the only production implementation; tests substitute their own.
//! * [`GeocodeCache`] — the cache half of address resolution, split out so [`crate::geocoder::CachedGeocoder`] can
//!   be tested without the job queue.
//! * [`TransferCrm`] — the hotel CRM: the source of booking transfers and the target of best-effort status updates.
mod crm;
mod dispatch_store;
mod geocode_cache;

pub use crm::{CrmError, CrmTransfer, TransferCrm, TransferStatusUpdate};
pub use dispatch_store::{DispatchQueueDatabase, StorageError};
pub use geocode_cache::GeocodeCache;
