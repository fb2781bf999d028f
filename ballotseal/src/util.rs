use sha2::{Digest, Sha256};

/// Length, in hex characters, of a public-key fingerprint
pub const FINGERPRINT_LEN: usize = 16;

/// SHA-256 of `data`, lowercase hex encoded
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Short digest identifying an election public key: the first 16 hex chars of SHA-256(pem)
pub fn fingerprint(public_key_pem: &str) -> String {
    let mut digest = sha256_hex(public_key_pem.as_bytes());
    digest.truncate(FINGERPRINT_LEN);
    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_answer() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn fingerprint_is_truncated_digest() {
        let fp = fingerprint("-----BEGIN PUBLIC KEY-----");
        assert_eq!(fp.len(), FINGERPRINT_LEN);
        assert!(sha256_hex(b"-----BEGIN PUBLIC KEY-----").starts_with(&fp));
    }
}
