use crate::*;
use chrono::{DateTime, Utc};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

/// The public half of an election keypair.
///
/// Holds the canonical SPKI PEM encoding (LF line endings) alongside the parsed key, so the
/// fingerprint of a key never depends on how its PEM was formatted in transit.
#[derive(Clone, PartialEq, Eq)]
pub struct ElectionPublicKey {
    key: RsaPublicKey,
    pem: String,
    fingerprint: String,
}

impl ElectionPublicKey {
    pub fn from_rsa(key: RsaPublicKey) -> Result<Self, Error> {
        let bits = key.size() * 8;
        if bits < MIN_RSA_BITS {
            return Err(Error::InvalidPublicKey(format!(
                "{}-bit modulus is below the {}-bit minimum",
                bits, MIN_RSA_BITS
            )));
        }

        let pem = key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| Error::InvalidPublicKey(e.to_string()))?;
        let fingerprint = fingerprint(&pem);

        Ok(ElectionPublicKey {
            key,
            pem,
            fingerprint,
        })
    }

    /// Parse a PEM encoded (SPKI) RSA public key
    pub fn from_pem(pem: &str) -> Result<Self, Error> {
        let key = RsaPublicKey::from_public_key_pem(pem.trim())
            .map_err(|e| Error::InvalidPublicKey(e.to_string()))?;
        ElectionPublicKey::from_rsa(key)
    }

    /// Canonical PEM encoding
    pub fn as_pem(&self) -> &str {
        &self.pem
    }

    /// First 16 hex chars of SHA-256 over the canonical PEM
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Modulus size in bits
    pub fn bits(&self) -> usize {
        self.key.size() * 8
    }

    pub(crate) fn rsa(&self) -> &RsaPublicKey {
        &self.key
    }
}

impl fmt::Debug for ElectionPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ElectionPublicKey")
            .field("bits", &self.bits())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl Serialize for ElectionPublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.pem)
    }
}

impl<'de> Deserialize<'de> for ElectionPublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let pem = String::deserialize(deserializer)?;
        ElectionPublicKey::from_pem(&pem).map_err(de::Error::custom)
    }
}

/// A reconstructed election private key.
///
/// Only ever produced by key generation or by threshold reconstruction. It cannot be
/// serialized, is redacted in `Debug` output, and its limbs are zeroed when dropped.
pub struct ElectionPrivateKey {
    key: RsaPrivateKey,
    public: ElectionPublicKey,
}

impl ElectionPrivateKey {
    pub(crate) fn generate(bits: usize) -> Result<Self, Error> {
        let mut rng = rand::rngs::OsRng;
        let key = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| Error::KeyGeneration(e.to_string()))?;
        let public = ElectionPublicKey::from_rsa(key.to_public_key())
            .map_err(|e| Error::KeyGeneration(e.to_string()))?;

        Ok(ElectionPrivateKey { key, public })
    }

    /// Rebuild a key from its PKCS#8 DER encoding
    pub(crate) fn from_secret_der(der: &[u8]) -> Result<Self, Error> {
        let key = RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|e| Error::Reconstruction(format!("recovered key is malformed: {}", e)))?;
        key.validate()
            .map_err(|e| Error::Reconstruction(format!("recovered key is invalid: {}", e)))?;
        let public = ElectionPublicKey::from_rsa(key.to_public_key())
            .map_err(|e| Error::Reconstruction(e.to_string()))?;

        Ok(ElectionPrivateKey { key, public })
    }

    /// PKCS#8 DER encoding, wiped from memory when the returned buffer is dropped
    pub(crate) fn to_secret_der(&self) -> Result<Zeroizing<Vec<u8>>, Error> {
        let document = self
            .key
            .to_pkcs8_der()
            .map_err(|e| Error::KeyGeneration(e.to_string()))?;
        Ok(Zeroizing::new(document.as_bytes().to_vec()))
    }

    pub fn public_key(&self) -> &ElectionPublicKey {
        &self.public
    }

    pub fn fingerprint(&self) -> &str {
        self.public.fingerprint()
    }

    pub(crate) fn rsa(&self) -> &RsaPrivateKey {
        &self.key
    }
}

impl fmt::Debug for ElectionPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ElectionPrivateKey")
            .field("fingerprint", &self.public.fingerprint)
            .finish_non_exhaustive()
    }
}

/// The public record of an election keypair.
///
/// The private half is never an attribute of this record: it is split into custodian shares
/// at generation time and only exists again, transiently, after reconstruction.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ElectionKeyPair {
    pub election_id: String,
    pub public_key: ElectionPublicKey,
    pub public_key_fingerprint: String,
    pub created_at: DateTime<Utc>,
}

impl ElectionKeyPair {
    pub fn new(election_id: &str, public_key: ElectionPublicKey) -> Self {
        ElectionKeyPair {
            election_id: election_id.to_owned(),
            public_key_fingerprint: public_key.fingerprint().to_owned(),
            public_key,
            created_at: Utc::now(),
        }
    }
}
