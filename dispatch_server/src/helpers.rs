use std::fmt::Write as _;

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// HMAC-SHA256 of `data` under `secret`, hex-encoded. Used to verify PMS webhook signatures against the raw
/// request body.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(data);
    let digest = mac.finalize().into_bytes();
    digest.iter().fold(String::with_capacity(digest.len() * 2), |mut acc, b| {
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
