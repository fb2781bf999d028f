use crate::*;
use chrono::Utc;

/// Output of election setup: the public record plus one share per custodian.
///
/// The shares must be handed out and then dropped; the engine keeps no copy.
#[derive(Debug)]
pub struct DealtKeys {
    pub key_pair: ElectionKeyPair,
    pub shares: Vec<KeyShare>,
}

/// Generates election keys and holds the private half in a (t, n) threshold custody scheme.
///
/// Every custodian owns an `Auditor`; reconstruction cannot hand out a key without first
/// recording who asked for it and why.
pub struct KeyCustodian<A: Auditor> {
    config: EngineConfig,
    auditor: A,
}

impl<A: Auditor> KeyCustodian<A> {
    pub fn new(config: EngineConfig, auditor: A) -> Result<Self, Error> {
        config.validate()?;
        Ok(KeyCustodian { config, auditor })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Generate an election keypair and split its private key into custodian shares.
    ///
    /// The private key is dropped (and zeroed) before this returns.
    pub fn generate_election_keypair(&self, election_id: &str) -> Result<DealtKeys, Error> {
        if election_id.trim().is_empty() {
            return Err(Error::KeyGeneration("election id is empty".into()));
        }

        let private_key = ElectionPrivateKey::generate(self.config.rsa_bits)?;
        let shares = split_private_key(
            election_id,
            &private_key,
            self.config.threshold,
            self.config.shares,
        )
        .map_err(|e| Error::KeyGeneration(e.to_string()))?;
        let key_pair = ElectionKeyPair::new(election_id, private_key.public_key().clone());
        drop(private_key);

        log::info!(
            "generated {}-bit key {} for election {}, dealt {} shares with threshold {}",
            self.config.rsa_bits,
            key_pair.public_key_fingerprint,
            election_id,
            shares.len(),
            self.config.threshold
        );

        Ok(DealtKeys { key_pair, shares })
    }

    /// Reconstruct an election private key from a quorum of custodian shares.
    ///
    /// The auditor is called, and must succeed, before the key is returned.
    pub fn reconstruct_private_key(
        &self,
        election_id: &str,
        shares: &[KeyShare],
        justification: &Justification,
    ) -> Result<ElectionPrivateKey, Error> {
        justification.validate()?;

        let private_key = combine_private_key(election_id, shares).map_err(|e| {
            log::warn!(
                "key reconstruction for election {} requested by {} failed: {}",
                election_id,
                justification.admin_id,
                e
            );
            e
        })?;

        let mut share_indices: Vec<u8> = shares.iter().map(|s| s.index).collect();
        share_indices.sort_unstable();
        share_indices.dedup();

        let request = KeyReleaseRequest {
            election_id: election_id.to_owned(),
            admin_id: justification.admin_id.clone(),
            reason: justification.reason.clone(),
            share_indices,
            public_key_fingerprint: private_key.fingerprint().to_owned(),
            requested_at: Utc::now(),
        };
        self.auditor.record_key_release(&request)?;

        Ok(private_key)
    }

    /// Reconstruct the key and open a counting session around it
    pub fn open_tally_session(
        &self,
        election_id: &str,
        shares: &[KeyShare],
        justification: &Justification,
    ) -> Result<TallySession, Error> {
        let private_key = self.reconstruct_private_key(election_id, shares, justification)?;
        Ok(TallySession::new(election_id, private_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixture;

    struct RefusingAuditor;

    impl Auditor for RefusingAuditor {
        fn record_key_release(&self, _request: &KeyReleaseRequest) -> Result<(), Error> {
            Err(Error::AuditFailed("audit store offline".into()))
        }
    }

    #[test]
    fn rejects_unsafe_config() {
        let mut config = EngineConfig::default();
        config.threshold = 2;
        assert!(KeyCustodian::new(config, LogAuditor).is_err());
    }

    #[test]
    fn two_shares_are_not_enough() {
        let custodian = KeyCustodian::new(EngineConfig::default(), MemoryAuditor::default()).unwrap();
        let shares = &fixture().shares[..2];

        let result = custodian.reconstruct_private_key("E1", shares, &Justification::new("a", "b"));
        assert!(matches!(result, Err(Error::InsufficientShares(3, 2))));
        assert!(custodian.auditor.records().is_empty());
    }

    #[test]
    fn release_is_audited_first() {
        let custodian = KeyCustodian::new(EngineConfig::default(), MemoryAuditor::default()).unwrap();
        let fixture = fixture();
        let shares = vec![
            fixture.shares[4].clone(),
            fixture.shares[0].clone(),
            fixture.shares[2].clone(),
        ];

        let key = custodian
            .reconstruct_private_key("E1", &shares, &Justification::new("admin-7", "count"))
            .unwrap();
        assert_eq!(key.fingerprint(), fixture.key_pair.public_key_fingerprint);

        let records = custodian.auditor.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].admin_id, "admin-7");
        assert_eq!(records[0].reason, "count");
        assert_eq!(records[0].share_indices, vec![1, 3, 5]);
    }

    #[test]
    fn refused_audit_withholds_key() {
        let custodian = KeyCustodian::new(EngineConfig::default(), RefusingAuditor).unwrap();
        let shares = &fixture().shares[..3];

        let result = custodian.reconstruct_private_key("E1", shares, &Justification::new("a", "b"));
        assert!(matches!(result, Err(Error::AuditFailed(_))));
    }

    #[test]
    fn missing_justification_is_refused() {
        let custodian = KeyCustodian::new(EngineConfig::default(), MemoryAuditor::default()).unwrap();
        let shares = &fixture().shares[..3];

        let result = custodian.reconstruct_private_key("E1", shares, &Justification::new("a", ""));
        assert!(matches!(result, Err(Error::MissingJustification(_))));
        assert!(custodian.auditor.records().is_empty());
    }
}
