use crate::*;

/// Length of a receipt code in hex characters
pub const RECEIPT_LEN: usize = 16;

/// Derive the receipt code handed back to a voter.
///
/// `SHA-256(SHA-256(voterId) || voteHash[0..8] || timestampMillis)`, truncated to 16 uppercase
/// hex characters. The voter ID only enters through its own digest and the candidate only through
/// a prefix of the vote hash, so the code is an opaque lookup token that reveals neither.
pub fn create_vote_proof(payload: &VotePayload, encrypted_vote: &EncryptedVote) -> String {
    let voter_digest = sha256_hex(payload.voter_id.as_bytes());
    let hash_prefix: String = encrypted_vote.vote_hash.chars().take(8).collect();
    let timestamp = payload.timestamp.timestamp_millis();

    let material = format!("{}{}{}", voter_digest, hash_prefix, timestamp);
    let mut code = sha256_hex(material.as_bytes());
    code.truncate(RECEIPT_LEN);
    code.make_ascii_uppercase();
    code
}

/// True if `code` has the shape of a receipt code
pub fn is_receipt_code(code: &str) -> bool {
    code.len() == RECEIPT_LEN
        && code
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
}
