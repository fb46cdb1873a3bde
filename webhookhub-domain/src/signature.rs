use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("signature mismatch")]
    Mismatch,
}

/// Sign `raw_body` with HMAC-SHA256, using the 64-char hex secret string
/// itself (its ASCII bytes, not its decoded value) as the key. This
/// convention is load-bearing wire compatibility, not an oversight: it's
/// how sources and the ingest pipeline agree on the same digest (spec §4.1).
pub fn sign(secret_hex: &str, raw_body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret_hex.as_bytes()).expect("HMAC accepts any key length");
    mac.update(raw_body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a provided signature in constant time relative to its length.
/// Any length or byte mismatch yields the same `SignatureError::Mismatch`,
/// never a distinguishable error.
pub fn verify(
    secret_hex: &str,
    raw_body: &[u8],
    provided_signature_hex: &str,
) -> Result<(), SignatureError> {
    let expected = sign(secret_hex, raw_body);

    if expected.len() != provided_signature_hex.len() {
        return Err(SignatureError::Mismatch);
    }

    let matches: bool = expected
        .as_bytes()
        .ct_eq(provided_signature_hex.as_bytes())
        .into();

    if matches {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4e5f6a1b2";

    #[test]
    fn verify_accepts_the_signature_it_produces() {
        let body = br#"{"ref":"main"}"#;
        let sig = sign(SECRET, body);
        assert!(verify(SECRET, body, &sig).is_ok());
    }

    #[test]
    fn verify_rejects_tampered_body() {
        let sig = sign(SECRET, b"original");
        assert!(verify(SECRET, b"tampered", &sig).is_err());
    }

    #[test]
    fn verify_rejects_wrong_length_signature() {
        let body = b"payload";
        assert!(verify(SECRET, body, "deadbeef").is_err());
    }

    #[test]
    fn verify_rejects_same_length_wrong_signature() {
        let body = b"payload";
        let sig = sign(SECRET, body);
        let mut tampered = sig.clone();
        tampered.replace_range(0..1, if &sig[0..1] == "a" { "b" } else { "a" });
        assert!(verify(SECRET, body, &tampered).is_err());
    }
}
