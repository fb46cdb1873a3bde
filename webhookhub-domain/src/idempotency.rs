use sha2::{Digest, Sha256};

/// Safe default derivation noted in spec §9 as an open question: the
/// original source's exact formula wasn't recoverable, so callers that
/// don't receive an explicit idempotency key from the source fall back to
/// this one. Boundary contract, not a core invariant — kept here so both
/// the ingest route and tests agree on it.
pub fn derive(source_name: &str, event_type: &str, raw_body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(event_type.as_bytes());
    hasher.update([0u8]);
    hasher.update(raw_body);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_deterministic() {
        let a = derive("github", "push", b"{}");
        let b = derive("github", "push", b"{}");
        assert_eq!(a, b);
    }

    #[test]
    fn differs_on_body() {
        let a = derive("github", "push", b"{\"ref\":\"main\"}");
        let b = derive("github", "push", b"{\"ref\":\"dev\"}");
        assert_ne!(a, b);
    }
}
