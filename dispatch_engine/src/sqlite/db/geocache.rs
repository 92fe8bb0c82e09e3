use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::GeocacheEntry;

/// Returns the cached resolution for `address`, ignoring expired rows. Expired rows are left in place; the next
/// successful resolution overwrites them.
pub async fn lookup(address: &str, conn: &mut SqliteConnection) -> Result<Option<GeocacheEntry>, sqlx::Error> {
    let entry = sqlx::query_as(
        r#"
            SELECT address, lat, lon, label, expires_at
            FROM geocode_cache
            WHERE address = $1 AND expires_at > $2
        "#,
    )
    .bind(address)
    .bind(Utc::now())
    .fetch_optional(conn)
    .await?;
    if entry.is_some() {
        trace!("🌍️ Geocode cache hit for '{address}'");
    }
    Ok(entry)
}

/// Inserts or replaces the resolution for `address`.
pub async fn store(
    address: &str,
    lat: f64,
    lon: f64,
    label: &str,
    expires_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO geocode_cache (address, lat, lon, label, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (address) DO UPDATE
            SET lat = excluded.lat, lon = excluded.lon, label = excluded.label, expires_at = excluded.expires_at
        "#,
    )
    .bind(address)
    .bind(lat)
    .bind(lon)
    .bind(label)
    .bind(expires_at)
    .execute(conn)
    .await?;
    trace!("🌍️ Geocode cache updated for '{address}'");
    Ok(())
}
