use crate::*;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PollingUnit {
    pub id: String,
    pub name: String,
}

/// Public information about an election needed to vote offline
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ElectionContext {
    pub election_id: String,
    pub public_key: ElectionPublicKey,
    pub candidates: Vec<Candidate>,
}

/// Source of election and voter context, owned by the surrounding voting service
pub trait ElectionDirectory {
    fn election_context(&self, election_id: &str) -> Option<ElectionContext>;
    fn polling_unit(&self, election_id: &str, voter_id: &str) -> Option<PollingUnit>;
}

/// A simple directory backed by in-memory BTreeMaps
#[derive(Serialize, Deserialize, Default, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MemDirectory {
    elections: BTreeMap<String, ElectionContext>,
    // election id -> voter id -> polling unit
    polling_units: BTreeMap<String, BTreeMap<String, PollingUnit>>,
}

impl MemDirectory {
    pub fn add_election(&mut self, context: ElectionContext) {
        self.elections.insert(context.election_id.clone(), context);
    }

    pub fn assign_voter(&mut self, election_id: &str, voter_id: &str, polling_unit: PollingUnit) {
        self.polling_units
            .entry(election_id.to_owned())
            .or_default()
            .insert(voter_id.to_owned(), polling_unit);
    }
}

impl ElectionDirectory for MemDirectory {
    fn election_context(&self, election_id: &str) -> Option<ElectionContext> {
        self.elections.get(election_id).cloned()
    }

    fn polling_unit(&self, election_id: &str, voter_id: &str) -> Option<PollingUnit> {
        self.polling_units.get(election_id)?.get(voter_id).cloned()
    }
}

/// Everything a voter's device needs to seal a ballot without connectivity.
///
/// Carries the election public key only; the private key never leaves custody.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OfflinePackage {
    pub election_id: String,
    pub public_key: ElectionPublicKey,
    pub public_key_fingerprint: String,
    pub key_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub candidate_list: Vec<Candidate>,
    pub polling_unit: PollingUnit,
}

/// The traceability fields encoded in a package key ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyId {
    pub voter_id: String,
    pub election_id: String,
    pub issued_at: DateTime<Utc>,
}

impl KeyId {
    pub fn encode(&self) -> String {
        let raw = format!(
            "{}:{}:{}",
            self.voter_id,
            self.election_id,
            self.issued_at.timestamp_millis()
        );
        URL_SAFE_NO_PAD.encode(raw)
    }

    pub fn decode(key_id: &str) -> Option<Self> {
        let raw = URL_SAFE_NO_PAD.decode(key_id).ok()?;
        let raw = String::from_utf8(raw).ok()?;

        // Voter IDs may contain ':', so split from the right
        let mut parts = raw.rsplitn(3, ':');
        let millis: i64 = parts.next()?.parse().ok()?;
        let election_id = parts.next()?.to_owned();
        let voter_id = parts.next()?.to_owned();
        let issued_at = Utc.timestamp_millis_opt(millis).single()?;

        Some(KeyId {
            voter_id,
            election_id,
            issued_at,
        })
    }
}

#[derive(Debug, Clone)]
struct IssuedPackage {
    election_id: String,
    public_key_fingerprint: String,
}

/// Issues offline packages and remembers them until they expire
pub struct OfflinePackageIssuer<D: ElectionDirectory> {
    directory: D,
    issued: ExpiringStore<String, IssuedPackage>,
}

impl<D: ElectionDirectory> OfflinePackageIssuer<D> {
    pub fn new(directory: D, config: &EngineConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(OfflinePackageIssuer {
            directory,
            issued: ExpiringStore::new(config.offline_package_ttl()),
        })
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn generate_offline_package(
        &mut self,
        election_id: &str,
        voter_id: &str,
    ) -> Result<OfflinePackage, Error> {
        self.generate_offline_package_at(election_id, voter_id, Utc::now())
    }

    /// Issue a package as of `now`
    pub fn generate_offline_package_at(
        &mut self,
        election_id: &str,
        voter_id: &str,
        now: DateTime<Utc>,
    ) -> Result<OfflinePackage, Error> {
        // The key ID is split on ':' from the right, so only the voter ID may contain one
        if election_id.contains(':') {
            return Err(Error::InvalidElectionId(election_id.to_owned()));
        }

        let context = self
            .directory
            .election_context(election_id)
            .ok_or_else(|| Error::UnknownElection(election_id.to_owned()))?;
        let polling_unit = self
            .directory
            .polling_unit(election_id, voter_id)
            .ok_or_else(|| Error::UnknownVoter(election_id.to_owned()))?;

        let key_id = KeyId {
            voter_id: voter_id.to_owned(),
            election_id: election_id.to_owned(),
            issued_at: now,
        }
        .encode();

        let public_key_fingerprint = context.public_key.fingerprint().to_owned();
        let expires_at = self.issued.set(
            key_id.clone(),
            IssuedPackage {
                election_id: election_id.to_owned(),
                public_key_fingerprint: public_key_fingerprint.clone(),
            },
            now,
        );

        log::debug!(
            "issued offline package for election {} under key {}",
            election_id,
            public_key_fingerprint
        );

        Ok(OfflinePackage {
            election_id: context.election_id,
            public_key: context.public_key,
            public_key_fingerprint,
            key_id,
            issued_at: now,
            expires_at,
            candidate_list: context.candidates,
            polling_unit,
        })
    }

    /// Check a ballot submitted from a device against the package it was sealed with
    pub fn check_submission(
        &self,
        key_id: &str,
        encrypted_vote: &EncryptedVote,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        let issued = self
            .issued
            .get(&key_id.to_owned(), now)
            .ok_or_else(|| Error::PackageExpired(key_id.to_owned()))?;

        encrypted_vote.validate_shape()?;
        if encrypted_vote.public_key_fingerprint != issued.public_key_fingerprint {
            return Err(IntegrityError::FingerprintMismatch {
                expected: issued.public_key_fingerprint.clone(),
                found: encrypted_vote.public_key_fingerprint.clone(),
            }
            .into());
        }

        // The election may have re-keyed since the package was issued
        if let Some(context) = self.directory.election_context(&issued.election_id) {
            if !verify_vote_integrity(encrypted_vote, &context.public_key) {
                return Err(IntegrityError::FingerprintMismatch {
                    expected: context.public_key.fingerprint().to_owned(),
                    found: encrypted_vote.public_key_fingerprint.clone(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Forget expired packages
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        self.issued.evict_expired(now)
    }
}
