//! SHA-256 hex digests

use sha2::{Digest, Sha256};

/// Lower-case hex SHA-256 of a string
pub fn compute_checksum(s: &str) -> String {
    hex_digest(s.as_bytes())
}

/// Lower-case hex SHA-256 of raw bytes
pub fn hex_digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            compute_checksum("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_changes_with_input() {
        assert_ne!(compute_checksum("SELECT 1"), compute_checksum("SELECT 2"));
    }
}
