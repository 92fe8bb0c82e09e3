use chrono::{DateTime, Utc};

use crate::{db_types::GeocacheEntry, traits::StorageError};

/// The storage half of address resolution. Keys are the raw address strings as typed by the guest or operator;
/// no normalization happens at this layer.
#[allow(async_fn_in_trait)]
pub trait GeocodeCache: Clone {
    /// Returns the cached entry for `address`, if one exists and has not expired.
    async fn lookup(&self, address: &str) -> Result<Option<GeocacheEntry>, StorageError>;

    /// Stores (or replaces) the resolution for `address` with the given expiry.
    async fn store(
        &self,
        address: &str,
        lat: f64,
        lon: f64,
        label: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;
}
