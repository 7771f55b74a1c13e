use sha2::{Digest, Sha256};

/// Hex SHA-256 of the raw document text; equal input yields an equal fingerprint
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = fingerprint("XS1234567890 199'080");
        assert_eq!(a, fingerprint("XS1234567890 199'080"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, fingerprint("XS1234567890 199'081"));
        assert_eq!(
            fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
