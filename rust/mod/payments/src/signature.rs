//! Webhook signature check.
//!
//! The `Stripe-Signature` header looks like `t=<unix>,v1=<hex>,v1=<hex>`.
//! The signed payload is `<t>.<body>`, MACed with HMAC-SHA256 under the
//! endpoint secret. Any `v1` entry may match.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed timestamp.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("malformed signature header")]
    Malformed,

    #[error("no signature matches the payload")]
    NoMatch,

    #[error("timestamp outside the tolerance window")]
    Expired,
}

fn mac(secret: &str, timestamp: i64, payload: &[u8]) -> HmacSha256 {
    // HMAC accepts keys of any length.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("hmac key length is unrestricted"));
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}

/// Build a header value for `payload`. Used by tests and local tooling.
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let digest = mac(secret, timestamp, payload).finalize().into_bytes();
    format!("t={},v1={}", timestamp, hex::encode(digest))
}

/// Check `header` against `payload` at time `now` (unix seconds).
pub fn verify(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse::<i64>().ok(),
            Some(("v1", v)) => candidates.push(v),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if candidates.is_empty() {
        return Err(SignatureError::Malformed);
    }

    let expected = mac(secret, timestamp, payload);
    let matched = candidates.iter().any(|c| {
        hex::decode(c)
            .map(|sig| expected.clone().verify_slice(&sig).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err(SignatureError::NoMatch);
    }
    if (now - timestamp).abs() > tolerance {
        return Err(SignatureError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"id":"evt_1"}"#;

    #[test]
    fn accepts_own_signature() {
        let header = sign(BODY, SECRET, 1_000);
        assert_eq!(verify(BODY, &header, SECRET, 1_100, DEFAULT_TOLERANCE_SECS), Ok(()));
    }

    #[test]
    fn any_v1_may_match() {
        let good = sign(BODY, SECRET, 1_000);
        let v1 = good.split_once(",v1=").unwrap().1;
        let header = format!("t=1000,v1=deadbeef,v0=zz,v1={v1}");
        assert_eq!(verify(BODY, &header, SECRET, 1_000, DEFAULT_TOLERANCE_SECS), Ok(()));
    }

    #[test]
    fn rejects_tampering_wrong_secret_and_stale() {
        let header = sign(BODY, SECRET, 1_000);
        assert_eq!(
            verify(b"{}", &header, SECRET, 1_000, DEFAULT_TOLERANCE_SECS),
            Err(SignatureError::NoMatch)
        );
        assert_eq!(
            verify(BODY, &header, "whsec_other", 1_000, DEFAULT_TOLERANCE_SECS),
            Err(SignatureError::NoMatch)
        );
        assert_eq!(
            verify(BODY, &header, SECRET, 1_301, DEFAULT_TOLERANCE_SECS),
            Err(SignatureError::Expired)
        );
        assert_eq!(
            verify(BODY, "v1=abc", SECRET, 1_000, DEFAULT_TOLERANCE_SECS),
            Err(SignatureError::Malformed)
        );
    }
}
