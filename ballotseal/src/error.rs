use thiserror::Error;

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("ballotseal: key generation failed: {0}")]
    KeyGeneration(String),

    #[error("ballotseal: not enough key shares: need {0}, found {1}")]
    InsufficientShares(usize, usize),

    #[error("ballotseal: private key reconstruction failed: {0}")]
    Reconstruction(String),

    #[error("ballotseal: key release requires a non-empty {0}")]
    MissingJustification(&'static str),

    #[error("ballotseal: audit hook refused key release: {0}")]
    AuditFailed(String),

    #[error("ballotseal: vote encryption failed: {0}")]
    Encryption(String),

    #[error("ballotseal: vote decryption failed: {0}")]
    Decryption(String),

    #[error("ballotseal: vote integrity check failed: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("ballotseal: invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("ballotseal: invalid configuration: {0}")]
    Config(String),

    #[error("ballotseal: election id {0:?} may not contain ':'")]
    InvalidElectionId(String),

    #[error("ballotseal: unknown election {0}")]
    UnknownElection(String),

    #[error("ballotseal: no polling unit registered for voter in election {0}")]
    UnknownVoter(String),

    #[error("ballotseal: offline package {0} is unknown or expired")]
    PackageExpired(String),

    #[error("ballotseal: JSON error: {0}")]
    JSON(#[from] serde_json::Error),
}

impl Error {
    /// True if the failure concerns a single ballot and must not abort a batch.
    pub fn is_per_ballot(&self) -> bool {
        matches!(self, Error::Integrity(_) | Error::Decryption(_))
    }
}

/// Ways a ballot can fail its integrity checks
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("ballot was encrypted under key {found}, expected {expected}")]
    FingerprintMismatch { expected: String, found: String },

    #[error("decrypted vote does not match its vote hash")]
    HashMismatch,

    #[error("malformed {0}")]
    MalformedField(&'static str),
}
