use crate::*;

/// Check a ballot was encrypted under `public_key`, without decrypting anything.
///
/// Compares the ballot's stored fingerprint with the fingerprint of the given key. Used as a
/// cheap gate before RSA work and to spot ballots sealed under a stale or foreign election key.
pub fn verify_vote_integrity(encrypted_vote: &EncryptedVote, public_key: &ElectionPublicKey) -> bool {
    if encrypted_vote.validate_shape().is_err() {
        return false;
    }
    encrypted_vote.public_key_fingerprint == public_key.fingerprint()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{fixture, other_fixture, payload};

    #[test]
    fn binds_to_election_key() {
        let public_key = &fixture().key_pair.public_key;
        let other_key = &other_fixture().key_pair.public_key;
        let vote = encrypt_vote(&payload("V1", "C1"), public_key, SourceChannel::Web).unwrap();

        assert!(verify_vote_integrity(&vote, public_key));
        assert!(!verify_vote_integrity(&vote, other_key));
    }

    #[test]
    fn malformed_fingerprint_fails() {
        let public_key = &fixture().key_pair.public_key;
        let mut vote = encrypt_vote(&payload("V1", "C1"), public_key, SourceChannel::Web).unwrap();
        vote.public_key_fingerprint.push('0');

        assert!(!verify_vote_integrity(&vote, public_key));
    }

    #[test]
    fn fingerprint_compares_exactly() {
        let public_key = &fixture().key_pair.public_key;
        let mut vote = encrypt_vote(&payload("V1", "C1"), public_key, SourceChannel::Web).unwrap();
        let upper = vote.public_key_fingerprint.to_ascii_uppercase();
        if upper == vote.public_key_fingerprint {
            // All digits, nothing to flip
            return;
        }
        vote.public_key_fingerprint = upper;

        assert!(!verify_vote_integrity(&vote, public_key));
    }
}
