//! Request signing and webhook authenticity checks for both gateways.
//!
//! Midtrans notifications carry `signature_key = sha512(order_id +
//! status_code + gross_amount + server_key)`. iPaymu signs requests (and
//! its webhooks are verified with the same scheme): the JSON body is
//! SHA-256 hashed, the string `METHOD:VA:bodyhash:apikey` is built, and
//! that string is HMAC-SHA256'd with the api key.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Expected `signature_key` for a Midtrans notification.
pub fn midtrans_notification_signature(
    server_key: &str,
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
) -> String {
    let raw = format!("{}{}{}{}", order_id, status_code, gross_amount, server_key);
    hex::encode(Sha512::digest(raw.as_bytes()))
}

/// Byte-for-byte check of a supplied Midtrans `signature_key`.
/// Mismatch means the notification is treated as forged.
pub fn verify_midtrans_signature(
    server_key: &str,
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    signature_key: &str,
) -> bool {
    let expected = midtrans_notification_signature(server_key, order_id, status_code, gross_amount);
    constant_time_eq(&expected, &signature_key.to_ascii_lowercase())
}

/// iPaymu request signature over the exact body bytes that go on the
/// wire. Used for outbound calls and to verify inbound webhooks.
pub fn ipaymu_signature(method: &str, va: &str, api_key: &str, body: &[u8]) -> String {
    let body_hash = hex::encode(Sha256::digest(body));
    let string_to_sign = format!("{}:{}:{}:{}", method, va, body_hash, api_key);

    let mut mac =
        HmacSha256::new_from_slice(api_key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(string_to_sign.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify an inbound iPaymu webhook against its `signature` header.
pub fn verify_ipaymu_signature(va: &str, api_key: &str, raw_body: &[u8], supplied: &str) -> bool {
    let expected = ipaymu_signature("POST", va, api_key, raw_body);
    constant_time_eq(&expected, &supplied.to_ascii_lowercase())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVER_KEY: &str = "SB-Mid-server-testkey";

    #[test]
    fn midtrans_signature_accepts_genuine_notification() {
        let sig =
            midtrans_notification_signature(SERVER_KEY, "PRG-ABC-123", "200", "60000.00");
        assert!(verify_midtrans_signature(
            SERVER_KEY,
            "PRG-ABC-123",
            "200",
            "60000.00",
            &sig
        ));
        // Gateways are not consistent about hex casing.
        assert!(verify_midtrans_signature(
            SERVER_KEY,
            "PRG-ABC-123",
            "200",
            "60000.00",
            &sig.to_ascii_uppercase()
        ));
    }

    #[test]
    fn midtrans_signature_rejects_tampering() {
        let sig =
            midtrans_notification_signature(SERVER_KEY, "PRG-ABC-123", "200", "60000.00");
        // Amount changed after signing
        assert!(!verify_midtrans_signature(
            SERVER_KEY,
            "PRG-ABC-123",
            "200",
            "1.00",
            &sig
        ));
        // Signed with the wrong key
        let forged =
            midtrans_notification_signature("attacker-key", "PRG-ABC-123", "200", "60000.00");
        assert!(!verify_midtrans_signature(
            SERVER_KEY,
            "PRG-ABC-123",
            "200",
            "60000.00",
            &forged
        ));
    }

    #[test]
    fn ipaymu_signature_round_trips() {
        let body = br#"{"referenceId":"MEM-X-1","amount":"150000"}"#;
        let sig = ipaymu_signature("POST", "0000001234567890", "SANDBOX-KEY", body);
        assert!(verify_ipaymu_signature(
            "0000001234567890",
            "SANDBOX-KEY",
            body,
            &sig
        ));
    }

    #[test]
    fn ipaymu_signature_rejects_modified_body() {
        let body = br#"{"referenceId":"MEM-X-1","amount":"150000"}"#;
        let sig = ipaymu_signature("POST", "0000001234567890", "SANDBOX-KEY", body);
        let modified = br#"{"referenceId":"MEM-X-1","amount":"1"}"#;
        assert!(!verify_ipaymu_signature(
            "0000001234567890",
            "SANDBOX-KEY",
            modified,
            &sig
        ));
    }
}
