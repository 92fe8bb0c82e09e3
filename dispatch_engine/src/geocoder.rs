//! Address resolution with a durable cache in front of the upstream geocoder.
//!
//! Hotel guests type the same handful of addresses over and over (the hotel itself, the airport, the station), so
//! a 24-hour cache absorbs nearly all upstream traffic. The cache is storage, not correctness: any cache failure
//! is logged and resolution falls through to the upstream.
use chrono::{Duration, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::traits::GeocodeCache;

/// Cached resolutions live for 24 hours.
pub const GEOCODE_CACHE_TTL_SECONDS: i64 = 86_400;

/// A free-text address resolved to coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub lat: f64,
    pub lon: f64,
    /// The display label the upstream returned, not the raw query string.
    pub label: String,
}

impl From<ResolvedLocation> for gootax_tools::RidePoint {
    fn from(loc: ResolvedLocation) -> Self {
        gootax_tools::RidePoint { lat: loc.lat, lon: loc.lon, label: loc.label }
    }
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Geocoding upstream failed for '{address}': {message}")]
    Upstream { address: String, message: String },
    #[error("No location found for '{0}'")]
    NoMatch(String),
}

/// The upstream geocoding service. The production implementation (Yandex) lives in the server crate.
#[allow(async_fn_in_trait)]
pub trait GeocodeUpstream: Clone {
    async fn geocode(&self, address: &str) -> Result<ResolvedLocation, GeocodeError>;
}

/// Read-through cache over a [`GeocodeUpstream`].
///
/// Concurrent misses for the same address each hit the upstream; there is no in-flight request deduplication.
#[derive(Clone)]
pub struct CachedGeocoder<C, U> {
    cache: C,
    upstream: U,
}

impl<C, U> CachedGeocoder<C, U>
where
    C: GeocodeCache,
    U: GeocodeUpstream,
{
    pub fn new(cache: C, upstream: U) -> Self {
        Self { cache, upstream }
    }

    /// Resolves `address`, consulting the cache first. A fresh resolution is written back with a 24 h expiry.
    pub async fn resolve(&self, address: &str) -> Result<ResolvedLocation, GeocodeError> {
        let address = address.trim();
        match self.cache.lookup(address).await {
            Ok(Some(entry)) => {
                return Ok(ResolvedLocation { lat: entry.lat, lon: entry.lon, label: entry.label });
            },
            Ok(None) => {},
            Err(e) => warn!("🌍️ Geocode cache read failed for '{address}': {e}. Falling through to upstream."),
        }
        let location = self.upstream.geocode(address).await?;
        debug!("🌍️ Resolved '{address}' to ({:.6}, {:.6})", location.lat, location.lon);
        let expires_at = Utc::now() + Duration::seconds(GEOCODE_CACHE_TTL_SECONDS);
        if let Err(e) =
            self.cache.store(address, location.lat, location.lon, &location.label, expires_at).await
        {
            warn!("🌍️ Geocode cache write failed for '{address}': {e}. Resolution still succeeds.");
        }
        Ok(location)
    }
}
