use crate::*;
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use rand::Rng;
use rsa::Oaep;
use sha2::Sha256;
use zeroize::Zeroizing;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const AES_KEY_LENGTH: usize = 32;
const AES_IV_LENGTH: usize = 16;

/// Hex length of an encoded IV
pub const IV_HEX_LEN: usize = AES_IV_LENGTH * 2;

/// Hex length of a vote hash
pub const VOTE_HASH_HEX_LEN: usize = 64;

/// A voter's plaintext choice. Never persisted unencrypted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VotePayload {
    pub voter_id: String,
    pub election_id: String,
    pub candidate_id: String,
    pub polling_unit_id: String,
    pub timestamp: DateTime<Utc>,
}

impl VotePayload {
    /// Canonical JSON encoding: field order is fixed by the struct definition
    pub fn to_canonical_json(&self) -> Result<Zeroizing<Vec<u8>>, Error> {
        serde_json::to_vec(self)
            .map(Zeroizing::new)
            .map_err(|e| Error::Encryption(e.to_string()))
    }
}

/// How a ballot reached the engine
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceChannel {
    Web,
    Offline,
    Ussd,
}

impl Default for SourceChannel {
    fn default() -> Self {
        SourceChannel::Web
    }
}

/// An encrypted ballot, in the exact shape the storage layer persists
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedVote {
    /// Storage identifier, if the ballot has been persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_id: Option<String>,

    /// AES-256-CBC ciphertext of the canonical payload JSON
    #[serde(with = "base64_bytes")]
    pub encrypted_vote_data: Vec<u8>,

    /// RSA-OAEP(SHA-256) wrapped AES key, base64
    pub encrypted_aes_key: String,

    /// Per-ballot random IV, hex
    pub iv: String,

    /// SHA-256 of the plaintext JSON, hex
    pub vote_hash: String,

    pub public_key_fingerprint: String,

    #[serde(default)]
    pub source_channel: SourceChannel,
}

impl EncryptedVote {
    /// Check the hex fields are lowercase and have their wire lengths
    pub fn validate_shape(&self) -> Result<(), IntegrityError> {
        if !is_hex_of_len(&self.iv, IV_HEX_LEN) {
            return Err(IntegrityError::MalformedField("iv"));
        }
        if !is_hex_of_len(&self.vote_hash, VOTE_HASH_HEX_LEN) {
            return Err(IntegrityError::MalformedField("voteHash"));
        }
        if !is_hex_of_len(&self.public_key_fingerprint, FINGERPRINT_LEN) {
            return Err(IntegrityError::MalformedField("publicKeyFingerprint"));
        }
        Ok(())
    }
}

/// A freshly cast ballot: the record to persist and the receipt to hand back to the voter
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CastVote {
    pub encrypted_vote: EncryptedVote,
    pub receipt_code: String,
}

/// Encrypt a vote under an election public key.
///
/// Every call draws a fresh AES key and a fresh random IV; no two ballots share either.
pub fn encrypt_vote(
    payload: &VotePayload,
    public_key: &ElectionPublicKey,
    source_channel: SourceChannel,
) -> Result<EncryptedVote, Error> {
    let mut rng = rand::rngs::OsRng;
    let plaintext = payload.to_canonical_json()?;

    let mut aes_key = Zeroizing::new([0u8; AES_KEY_LENGTH]);
    rng.fill(&mut aes_key[..]);
    let mut iv = [0u8; AES_IV_LENGTH];
    rng.fill(&mut iv);

    let encrypted_vote_data = Aes256CbcEnc::new(
        GenericArray::from_slice(&aes_key[..]),
        GenericArray::from_slice(&iv),
    )
    .encrypt_padded_vec_mut::<Pkcs7>(&plaintext);

    let wrapped_key = public_key
        .rsa()
        .encrypt(&mut rng, Oaep::new::<Sha256>(), &aes_key[..])
        .map_err(|e| Error::Encryption(e.to_string()))?;

    Ok(EncryptedVote {
        vote_id: None,
        encrypted_vote_data,
        encrypted_aes_key: STANDARD.encode(wrapped_key),
        iv: hex::encode(iv),
        vote_hash: sha256_hex(&plaintext),
        public_key_fingerprint: public_key.fingerprint().to_owned(),
        source_channel,
    })
}

/// Decrypt a ballot and check it against its vote hash.
///
/// The key fingerprint is compared before any RSA operation is attempted.
pub fn decrypt_vote(
    encrypted_vote: &EncryptedVote,
    private_key: &ElectionPrivateKey,
) -> Result<VotePayload, Error> {
    encrypted_vote.validate_shape()?;
    if encrypted_vote.public_key_fingerprint != private_key.fingerprint() {
        return Err(IntegrityError::FingerprintMismatch {
            expected: private_key.fingerprint().to_owned(),
            found: encrypted_vote.public_key_fingerprint.clone(),
        }
        .into());
    }

    let wrapped_key = STANDARD
        .decode(encrypted_vote.encrypted_aes_key.as_bytes())
        .map_err(|_| IntegrityError::MalformedField("encryptedAesKey"))?;
    let iv = hex::decode(&encrypted_vote.iv).map_err(|_| IntegrityError::MalformedField("iv"))?;

    let aes_key = private_key
        .rsa()
        .decrypt_blinded(&mut rand::rngs::OsRng, Oaep::new::<Sha256>(), &wrapped_key)
        .map(Zeroizing::new)
        .map_err(|_| Error::Decryption("unable to unwrap ballot key".into()))?;
    if aes_key.len() != AES_KEY_LENGTH {
        return Err(Error::Decryption("unwrapped ballot key has wrong length".into()));
    }

    let plaintext = Aes256CbcDec::new(
        GenericArray::from_slice(&aes_key[..]),
        GenericArray::from_slice(&iv),
    )
    .decrypt_padded_vec_mut::<Pkcs7>(&encrypted_vote.encrypted_vote_data)
    .map(Zeroizing::new)
    .map_err(|_| Error::Decryption("bad ciphertext padding".into()))?;

    if sha256_hex(&plaintext) != encrypted_vote.vote_hash {
        return Err(IntegrityError::HashMismatch.into());
    }

    serde_json::from_slice(&plaintext)
        .map_err(|e| Error::Decryption(format!("decrypted ballot is not a vote: {}", e)))
}

/// Encrypt a ballot and derive its receipt. Any failure aborts the whole cast.
pub fn cast_vote(
    payload: &VotePayload,
    public_key: &ElectionPublicKey,
    source_channel: SourceChannel,
) -> Result<CastVote, Error> {
    let encrypted_vote = encrypt_vote(payload, public_key, source_channel)?;
    let receipt_code = create_vote_proof(payload, &encrypted_vote);

    log::debug!(
        "cast {:?} ballot under key {}",
        source_channel,
        encrypted_vote.public_key_fingerprint
    );

    Ok(CastVote {
        encrypted_vote,
        receipt_code,
    })
}
