use sha2::{Digest, Sha256};

/// Hex SHA-256 of a chunk's raw bytes, used to spot re-crawled duplicate files.
pub fn chunk_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_bytes_share_a_digest() {
        let a = chunk_digest(b"[]");
        assert_eq!(a, chunk_digest(b"[]"));
        assert_ne!(a, chunk_digest(b"[ ]"));
        assert_eq!(a.len(), 64);
    }
}
