use std::fmt::Write as _;

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// HMAC-SHA256 of `data` under `secret`, hex-encoded the way Gootax expects signatures.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(data);
    let digest = mac.finalize().into_bytes();
    digest.iter().fold(String::with_capacity(digest.len() * 2), |mut acc, b| {
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

/// Renders a copy-pasteable cURL command equivalent to a form-encoded POST, for operator diagnosis of failed
/// provider calls. Secrets are whatever was on the wire; the signature is already part of the form fields.
pub fn curl_reproduction(url: &str, headers: &[(&str, String)], form: &[(&'static str, String)]) -> String {
    let mut cmd = format!("curl -X POST '{}'", shell_escape(url));
    for (name, value) in headers {
        let _ = write!(cmd, " -H '{}: {}'", name, shell_escape(value));
    }
    for (name, value) in form {
        let _ = write!(cmd, " --data-urlencode '{}={}'", name, shell_escape(value));
    }
    cmd
}

fn shell_escape(value: &str) -> String {
    value.replace('\'', r"'\''")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hmac_is_hex_encoded_sha256() {
        // RFC 4231 test case 2
        let mac = calculate_hmac("Jefe", b"what do ya want for nothing?");
        assert_eq!(mac, "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843");
    }

    #[test]
    fn curl_line_contains_headers_and_fields() {
        let cmd = curl_reproduction(
            "https://example.com/create_order",
            &[("appid", "a1".to_string())],
            &[("client_id", "c-1".to_string())],
        );
        assert!(cmd.starts_with("curl -X POST 'https://example.com/create_order'"));
        assert!(cmd.contains("-H 'appid: a1'"));
        assert!(cmd.contains("--data-urlencode 'client_id=c-1'"));
    }
}
